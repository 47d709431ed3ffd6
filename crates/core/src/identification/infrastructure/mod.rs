pub mod gallery_images;
pub mod lbph_recognizer;
pub mod registry_file;
