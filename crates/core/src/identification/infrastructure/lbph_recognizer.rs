//! Local binary pattern histogram recognizer.
//!
//! Each enrolled face is described by circular LBP codes collected into
//! per-cell histograms over a regular grid. A probe is compared against
//! every enrolled sample with the chi-square distance and each subject
//! is scored by its closest sample.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identification::domain::face_recognizer::FaceRecognizer;
use crate::identification::domain::ranked_result::RankedResult;
use crate::shared::frame::Frame;

const MAX_NEIGHBORS: u32 = 16;
const EPS: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecognizerError {
    #[error("invalid LBPH parameters: {0}")]
    InvalidParams(String),
    #[error("cannot build a recognizer from an empty gallery")]
    EmptyGallery,
    #[error("input size {size} too small for radius {radius} and a {grid_x}x{grid_y} grid")]
    ImageTooSmall {
        size: u32,
        radius: u32,
        grid_x: u32,
        grid_y: u32,
    },
    #[error("cannot describe an empty image")]
    EmptyImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbphParams {
    pub radius: u32,
    pub neighbors: u32,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl Default for LbphParams {
    fn default() -> Self {
        Self {
            radius: 1,
            neighbors: 8,
            grid_x: 8,
            grid_y: 8,
        }
    }
}

impl LbphParams {
    pub fn validate(&self) -> Result<(), RecognizerError> {
        if self.radius == 0 {
            return Err(RecognizerError::InvalidParams("radius must be at least 1".into()));
        }
        if !(1..=MAX_NEIGHBORS).contains(&self.neighbors) {
            return Err(RecognizerError::InvalidParams(format!(
                "neighbors must be in 1..={MAX_NEIGHBORS}, got {}",
                self.neighbors
            )));
        }
        if self.grid_x == 0 || self.grid_y == 0 {
            return Err(RecognizerError::InvalidParams("grid must be at least 1x1".into()));
        }
        Ok(())
    }

    fn bins(&self) -> usize {
        1usize << self.neighbors
    }
}

struct Sample {
    subject_id: u32,
    histogram: Vec<f64>,
}

pub struct LbphRecognizer {
    params: LbphParams,
    input_size: u32,
    samples: Vec<Sample>,
}

impl LbphRecognizer {
    /// Describes every labelled gallery face. No model is trained.
    pub fn enroll(
        params: LbphParams,
        input_size: u32,
        gallery: impl IntoIterator<Item = (u32, Frame)>,
    ) -> Result<Self, RecognizerError> {
        params.validate()?;
        let usable = input_size.saturating_sub(2 * params.radius);
        if usable < params.grid_x || usable < params.grid_y {
            return Err(RecognizerError::ImageTooSmall {
                size: input_size,
                radius: params.radius,
                grid_x: params.grid_x,
                grid_y: params.grid_y,
            });
        }

        let mut recognizer = Self {
            params,
            input_size,
            samples: Vec::new(),
        };
        for (subject_id, face) in gallery {
            let histogram = recognizer.describe(&face)?;
            recognizer.samples.push(Sample {
                subject_id,
                histogram,
            });
        }
        if recognizer.samples.is_empty() {
            return Err(RecognizerError::EmptyGallery);
        }
        log::info!(
            "Enrolled {} samples of {} subjects (radius {}, neighbors {}, grid {}x{})",
            recognizer.samples.len(),
            recognizer.subject_count(),
            params.radius,
            params.neighbors,
            params.grid_x,
            params.grid_y
        );
        Ok(recognizer)
    }

    pub fn params(&self) -> &LbphParams {
        &self.params
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn subject_count(&self) -> usize {
        let mut ids: Vec<u32> = self.samples.iter().map(|s| s.subject_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    fn describe(&self, face: &Frame) -> Result<Vec<f64>, RecognizerError> {
        if face.is_empty() {
            return Err(RecognizerError::EmptyImage);
        }
        let gray = normalize(face.to_gray(), self.input_size);
        let codes = lbp_codes(&gray, self.params.radius, self.params.neighbors);
        Ok(spatial_histogram(
            &codes,
            self.params.bins(),
            self.params.grid_x as usize,
            self.params.grid_y as usize,
        ))
    }
}

impl FaceRecognizer for LbphRecognizer {
    fn score(&self, face: &Frame) -> Result<RankedResult, Box<dyn std::error::Error>> {
        let query = self.describe(face)?;
        let mut best: BTreeMap<u32, f64> = BTreeMap::new();
        for sample in &self.samples {
            let d = chi_square(&sample.histogram, &query);
            best.entry(sample.subject_id)
                .and_modify(|v| *v = v.min(d))
                .or_insert(d);
        }
        Ok(RankedResult::from_scores(best))
    }
}

fn normalize(gray: GrayImage, size: u32) -> Array2<f64> {
    let gray = if gray.dimensions() == (size, size) {
        gray
    } else {
        image::imageops::resize(&gray, size, size, FilterType::Triangle)
    };
    Array2::from_shape_fn((size as usize, size as usize), |(y, x)| {
        gray.get_pixel(x as u32, y as u32).0[0] as f64
    })
}

/// Circular LBP with bilinear neighbour interpolation.
///
/// Output is `(rows - 2r) x (cols - 2r)`; a neighbour sets its bit when it
/// is not darker than the centre.
fn lbp_codes(src: &Array2<f64>, radius: u32, neighbors: u32) -> Array2<u32> {
    let r = radius as usize;
    let (rows, cols) = src.dim();
    let out_rows = rows.saturating_sub(2 * r);
    let out_cols = cols.saturating_sub(2 * r);
    let mut dst = Array2::<u32>::zeros((out_rows, out_cols));

    for n in 0..neighbors {
        let angle = 2.0 * PI * n as f64 / neighbors as f64;
        let x = radius as f64 * angle.cos();
        let y = -(radius as f64) * angle.sin();
        let (fx, fy) = (x.floor(), y.floor());
        let (cx, cy) = (x.ceil(), y.ceil());
        let (tx, ty) = (x - fx, y - fy);
        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;
        let (fx, fy, cx, cy) = (fx as isize, fy as isize, cx as isize, cy as isize);

        for i in 0..out_rows {
            for j in 0..out_cols {
                let ci = (i + r) as isize;
                let cj = (j + r) as isize;
                let at = |di: isize, dj: isize| src[[(ci + di) as usize, (cj + dj) as usize]];
                let t = w1 * at(fy, fx) + w2 * at(fy, cx) + w3 * at(cy, fx) + w4 * at(cy, cx);
                let center = src[[ci as usize, cj as usize]];
                if t > center || (t - center).abs() < EPS {
                    dst[[i, j]] |= 1 << n;
                }
            }
        }
    }
    dst
}

/// Concatenated per-cell histograms, each divided by its cell's pixel count.
fn spatial_histogram(codes: &Array2<u32>, bins: usize, grid_x: usize, grid_y: usize) -> Vec<f64> {
    let (rows, cols) = codes.dim();
    let cell_w = cols / grid_x;
    let cell_h = rows / grid_y;
    let area = (cell_w * cell_h) as f64;
    let mut hist = vec![0.0; bins * grid_x * grid_y];

    for gy in 0..grid_y {
        for gx in 0..grid_x {
            let base = (gy * grid_x + gx) * bins;
            let cell = codes.slice(ndarray::s![
                gy * cell_h..(gy + 1) * cell_h,
                gx * cell_w..(gx + 1) * cell_w
            ]);
            for &code in cell.iter() {
                hist[base + code as usize] += 1.0;
            }
            if area > 0.0 {
                for v in &mut hist[base..base + bins] {
                    *v /= area;
                }
            }
        }
    }
    hist
}

/// Symmetric chi-square: `Σ 2(a−b)²/(a+b)` over bins where `a+b > 0`.
fn chi_square(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| *x + *y > EPS)
        .map(|(x, y)| 2.0 * (x - y).powi(2) / (x + y))
        .sum()
}
