pub const FACE_CASCADE_NAME: &str = "haarcascade_frontalcatface.xml";
pub const EYE_CASCADE_NAME: &str = "haarcascade_eye.xml";

/// Registry of enrolled subjects and their recorded eye colour.
pub const GALLERY_REGISTRY_NAME: &str = "gallery_eyes_color.txt";

/// Application directory name under the per-user data directory.
pub const APP_DIR_NAME: &str = "CatFace";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "pgm"];

/// Side length the recognizer resizes probe and gallery faces to.
pub const DEFAULT_RECOGNIZER_INPUT_SIZE: u32 = 100;
