use std::path::Path;

use crate::alignment::domain::face_aligner::FaceAligner;
use crate::detection::domain::face_locator::FaceLocator;
use crate::io::domain::image_reader::ImageReader;
use crate::io::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Single-image normalisation: read → locate face and eyes → align → write.
pub struct AlignFaceUseCase {
    locator: FaceLocator,
    aligner: FaceAligner,
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
}

impl AlignFaceUseCase {
    pub fn new(
        locator: FaceLocator,
        aligner: FaceAligner,
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
    ) -> Self {
        Self {
            locator,
            aligner,
            reader,
            writer,
        }
    }

    /// The aligned face, or `None` unless exactly two eyes were found.
    pub fn align(&self, frame: &Frame) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let located = self.locator.locate(frame)?;
        let [left, right] = located.eyes.as_slice() else {
            log::info!("Found {} eyes; need two to align", located.eyes.len());
            return Ok(None);
        };
        Ok(Some(self.aligner.align(&located.face, left.center, right.center)?))
    }

    /// Returns whether an aligned face was written.
    pub fn execute(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let frame = self.reader.read(input_path)?;
        match self.align(&frame)? {
            Some(aligned) => {
                self.writer.write(output_path, &aligned)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
