use std::path::Path;

use crate::detection::domain::region_detector::{DetectorParams, RegionDetector};
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

use super::haar_cascade::{CascadeError, HaarCascade};
use super::integral_image::IntegralImage;
use super::math::{group_rectangles, GROUP_EPS};

/// Multi-scale sliding-window detector driven by a Haar cascade.
pub struct CascadeDetector {
    cascade: HaarCascade,
    params: DetectorParams,
}

impl CascadeDetector {
    pub fn new(cascade: HaarCascade, params: DetectorParams) -> Result<Self, CascadeError> {
        cascade.validate()?;
        params.validate().map_err(CascadeError::InvalidParams)?;
        Ok(Self { cascade, params })
    }

    pub fn from_file(path: &Path, params: DetectorParams) -> Result<Self, CascadeError> {
        Self::new(HaarCascade::load(path)?, params)
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Raw accepted windows before neighbour grouping.
    fn scan(&self, integral: &IntegralImage) -> Vec<Rect> {
        let (img_w, img_h) = (integral.width(), integral.height());
        let (base_w, base_h) = self.cascade.window;
        let (min_w, min_h) = self.params.min_size;

        let mut hits = Vec::new();
        let mut last_window = (0, 0);
        let mut scale = 1.0f64;
        loop {
            let win_w = (base_w as f64 * scale) as u32;
            let win_h = (base_h as f64 * scale) as u32;
            if win_w > img_w || win_h > img_h {
                break;
            }
            let window = (win_w, win_h);
            if window != last_window && win_w >= min_w && win_h >= min_h {
                let stride = if scale > 2.0 { 1.0 } else { 2.0 };
                let step = (stride * scale).round().max(1.0) as usize;
                for y in (0..=img_h - win_h).step_by(step) {
                    for x in (0..=img_w - win_w).step_by(step) {
                        if self.cascade.accepts(integral, x, y, scale) {
                            hits.push(Rect::new(x as i32, y as i32, win_w as i32, win_h as i32));
                        }
                    }
                }
            }
            last_window = window;
            scale *= self.params.scale_factor;
        }
        hits
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let integral = IntegralImage::new(&frame.to_gray());
        let hits = self.scan(&integral);
        let grouped = group_rectangles(&hits, self.params.min_neighbors, GROUP_EPS);
        log::debug!(
            "Cascade scan on {}x{}: {} raw hits, {} grouped",
            frame.width(),
            frame.height(),
            hits.len(),
            grouped.len()
        );
        Ok(grouped)
    }
}
