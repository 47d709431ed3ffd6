//! Turns raw eye detections into at most two ordered eye anchors.

use crate::shared::geometry::{Point, Rect, DEFAULT_IOU_THRESHOLD};

/// Pixels trimmed from the top/left of an eye box before colour analysis.
const IRIS_LEAD_INSET: i32 = 2;
/// Pixels trimmed from the bottom/right of an eye box before colour analysis.
const IRIS_TRAIL_INSET: i32 = 1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyePoint {
    pub center: Point,
    pub bounds: Rect,
}

impl EyePoint {
    pub fn from_bounds(bounds: Rect) -> Self {
        Self {
            center: bounds.center(),
            bounds,
        }
    }

    /// Region analysed for eye colour: the box without its outline margin.
    pub fn iris_region(&self) -> Rect {
        self.bounds.inset(IRIS_LEAD_INSET, IRIS_TRAIL_INSET)
    }
}

/// Zero, one or two eyes, ordered left to right in image space.
///
/// Overlapping detections collapse to one; with more than two survivors
/// the two largest are kept.
pub fn locate_eyes(detections: &[Rect]) -> Vec<EyePoint> {
    let mut eyes = Rect::deduplicate(detections, DEFAULT_IOU_THRESHOLD);
    eyes.sort_by_key(|r| std::cmp::Reverse(r.area()));
    eyes.truncate(2);
    eyes.sort_by_key(|r| (r.x, r.y));
    eyes.into_iter().map(EyePoint::from_bounds).collect()
}
