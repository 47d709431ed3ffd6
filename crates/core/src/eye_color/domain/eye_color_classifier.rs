use std::collections::BTreeSet;
use std::sync::Arc;

use crate::eye_color::domain::palette::{EyeColor, EyePalette};
use crate::shared::frame::Frame;

/// Count gap within which a band is considered tied with the leader.
pub const DEFAULT_TIE_TOLERANCE: usize = 50;

/// Colours judged plausible for one eye.
pub type CandidateColorSet = BTreeSet<EyeColor>;

/// Per-band pixel counts for one eye crop, in palette order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelCount {
    counts: Vec<(EyeColor, usize)>,
}

impl PixelCount {
    pub fn new(counts: Vec<(EyeColor, usize)>) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[(EyeColor, usize)] {
        &self.counts
    }

    pub fn get(&self, color: EyeColor) -> usize {
        self.counts
            .iter()
            .find(|(c, _)| *c == color)
            .map_or(0, |(_, n)| *n)
    }

    pub fn max(&self) -> usize {
        self.counts.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }

    /// First band holding the maximum count.
    pub fn argmax(&self) -> Option<usize> {
        let max = self.max();
        self.counts.iter().position(|(_, n)| *n == max)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| *n).sum()
    }
}

/// Pixel-level eye colour heuristic over a fixed palette.
pub struct EyeColorClassifier {
    palette: Arc<EyePalette>,
    tolerance: usize,
}

impl EyeColorClassifier {
    pub fn new(palette: Arc<EyePalette>, tolerance: usize) -> Self {
        Self { palette, tolerance }
    }

    pub fn palette(&self) -> &EyePalette {
        &self.palette
    }

    /// Counts the crop's pixels per palette band.
    ///
    /// The last row and column are skipped. Shadow pixels count toward
    /// nothing; every other pixel increments each band whose range holds it.
    pub fn classify(&self, eye: &Frame) -> PixelCount {
        let bands = self.palette.bands();
        let mut counts = vec![0usize; bands.len()];

        if !eye.is_empty() {
            let view = eye.as_ndarray();
            let rows = eye.height() as usize - 1;
            let cols = eye.width() as usize - 1;
            for y in 0..rows {
                for x in 0..cols {
                    let rgb = [view[[y, x, 0]], view[[y, x, 1]], view[[y, x, 2]]];
                    if self.palette.is_shadow(rgb) {
                        continue;
                    }
                    for (count, band) in counts.iter_mut().zip(bands) {
                        if band.range.contains(rgb) {
                            *count += 1;
                        }
                    }
                }
            }
        }

        PixelCount::new(bands.iter().map(|b| b.color).zip(counts).collect())
    }

    /// Plausible colours for one eye.
    ///
    /// The leading band is always included. Other bands within the
    /// tolerance of the leader join it, except the first palette band,
    /// which only ever appears as the leader. When no pixel matched any
    /// band the leader stands alone: empty counts are not a tie. Never
    /// empty for a non-empty palette.
    pub fn labels_from(&self, count: &PixelCount) -> CandidateColorSet {
        let mut labels = CandidateColorSet::new();
        let Some(lead) = count.argmax() else {
            return labels;
        };
        let max = count.max();
        labels.insert(count.counts()[lead].0);
        if max == 0 {
            return labels;
        }

        for (i, (color, n)) in count.counts().iter().enumerate() {
            if i == 0 || i == lead {
                continue;
            }
            if max - n <= self.tolerance {
                labels.insert(*color);
            }
        }
        labels
    }

    pub fn candidates(&self, eye: &Frame) -> CandidateColorSet {
        let count = self.classify(eye);
        let labels = self.labels_from(&count);
        log::debug!("Eye pixel counts {:?} -> {:?}", count.counts(), labels);
        labels
    }
}
