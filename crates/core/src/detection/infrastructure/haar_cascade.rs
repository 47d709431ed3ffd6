//! Boosted Haar-feature cascade model.
//!
//! A base window, a feature table of weighted rectangles, and stages of
//! decision stumps that index into the feature table. Models load from
//! OpenCV `.xml` cascades or from this struct serialised as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::integral_image::IntegralImage;
use super::opencv_xml::{self, OpenCvXmlError};

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse cascade {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read OpenCV cascade {path}: {source}")]
    OpenCvXml {
        path: PathBuf,
        #[source]
        source: OpenCvXmlError,
    },
    #[error("cascade has no stages")]
    Empty,
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
    #[error("cascade window must be non-zero, got {0}x{1}")]
    EmptyWindow(u32, u32),
    #[error("stage {stage} references unknown feature {feature}")]
    UnknownFeature { stage: usize, feature: usize },
    #[error("feature {feature} has a rectangle outside the {width}x{height} window")]
    FeatureOutOfWindow {
        feature: usize,
        width: u32,
        height: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

/// Decision stump: `left` when the normalised feature value is below
/// `threshold`, `right` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CascadeStage {
    pub threshold: f32,
    pub stumps: Vec<Stump>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HaarCascade {
    /// Base detection window `(width, height)`.
    pub window: (u32, u32),
    pub features: Vec<HaarFeature>,
    pub stages: Vec<CascadeStage>,
}

impl HaarCascade {
    /// Loads and validates a cascade. Any failure is a configuration error:
    /// a detector without a usable model must not run.
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        let text = fs::read_to_string(path).map_err(|e| CascadeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
        let cascade = if is_xml {
            opencv_xml::parse(&text).map_err(|e| CascadeError::OpenCvXml {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            serde_json::from_str::<HaarCascade>(&text).map_err(|e| CascadeError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?
        };
        cascade.validate()?;
        log::info!(
            "Loaded cascade {} ({} stages, {} features, window {}x{})",
            path.display(),
            cascade.stages.len(),
            cascade.features.len(),
            cascade.window.0,
            cascade.window.1
        );
        Ok(cascade)
    }

    pub fn validate(&self) -> Result<(), CascadeError> {
        let (ww, wh) = self.window;
        if ww == 0 || wh == 0 {
            return Err(CascadeError::EmptyWindow(ww, wh));
        }
        if self.stages.is_empty() {
            return Err(CascadeError::Empty);
        }
        for (stage_idx, stage) in self.stages.iter().enumerate() {
            if let Some(stump) = stage.stumps.iter().find(|s| s.feature >= self.features.len()) {
                return Err(CascadeError::UnknownFeature {
                    stage: stage_idx,
                    feature: stump.feature,
                });
            }
        }
        for (idx, feature) in self.features.iter().enumerate() {
            if feature
                .rects
                .iter()
                .any(|r| r.x + r.width > ww || r.y + r.height > wh)
            {
                return Err(CascadeError::FeatureOutOfWindow {
                    feature: idx,
                    width: ww,
                    height: wh,
                });
            }
        }
        Ok(())
    }

    /// Runs every stage on the window at `(x, y)` scaled by `scale`.
    ///
    /// The window must fit inside the integral image.
    pub fn accepts(&self, integral: &IntegralImage, x: u32, y: u32, scale: f64) -> bool {
        let win_w = (self.window.0 as f64 * scale) as u32;
        let win_h = (self.window.1 as f64 * scale) as u32;
        let area = win_w as f64 * win_h as f64;
        let sum = integral.rect_sum(x, y, win_w, win_h) as f64;
        let sq_sum = integral.rect_sq_sum(x, y, win_w, win_h) as f64;
        let nf = area * sq_sum - sum * sum;
        let norm = if nf > 0.0 { nf.sqrt() } else { 1.0 };

        self.stages.iter().all(|stage| {
            let total: f32 = stage
                .stumps
                .iter()
                .map(|stump| {
                    let value = self.features[stump.feature].value(integral, x, y, scale) / norm;
                    if value < stump.threshold as f64 {
                        stump.left
                    } else {
                        stump.right
                    }
                })
                .sum();
            total >= stage.threshold
        })
    }
}

impl HaarFeature {
    fn value(&self, integral: &IntegralImage, ox: u32, oy: u32, scale: f64) -> f64 {
        self.rects
            .iter()
            .map(|r| {
                let rx = ox + (r.x as f64 * scale) as u32;
                let ry = oy + (r.y as f64 * scale) as u32;
                let rw = (r.width as f64 * scale) as u32;
                let rh = (r.height as f64 * scale) as u32;
                integral.rect_sum(rx, ry, rw, rh) as f64 * r.weight as f64
            })
            .sum()
    }
}
