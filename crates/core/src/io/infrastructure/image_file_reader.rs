use std::path::Path;

use crate::io::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Reads any format the `image` crate decodes; grayscale and alpha
/// inputs are converted to RGB.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        log::debug!(
            "Read {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(Frame::from_rgb_image(img))
    }
}
