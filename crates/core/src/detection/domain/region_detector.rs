use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// Tuning knobs passed straight through to a sliding-window detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Window growth factor between scan passes (> 1.0).
    pub scale_factor: f64,
    /// A candidate needs more than this many overlapping hits to survive.
    pub min_neighbors: u32,
    /// Smallest window considered, `(width, height)`.
    pub min_size: (u32, u32),
}

impl DetectorParams {
    pub fn face() -> Self {
        Self {
            scale_factor: 1.05,
            min_neighbors: 2,
            min_size: (0, 0),
        }
    }

    pub fn eyes() -> Self {
        Self {
            scale_factor: 1.08,
            min_neighbors: 3,
            min_size: (40, 40),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.scale_factor.is_nan() || self.scale_factor <= 1.0 {
            return Err(format!(
                "Scale factor must be greater than 1.0, got {}",
                self.scale_factor
            ));
        }
        Ok(())
    }
}

/// Domain interface for "find regions of interest in an image".
///
/// Detectors are stateless and shared read-only across queries.
pub trait RegionDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Rect>, Box<dyn std::error::Error>>;
}
