use crate::identification::domain::ranked_result::RankedResult;
use crate::shared::frame::Frame;

/// Scores a normalised face against a fixed, pre-loaded gallery.
pub trait FaceRecognizer: Send + Sync {
    fn score(&self, face: &Frame) -> Result<RankedResult, Box<dyn std::error::Error>>;
}
