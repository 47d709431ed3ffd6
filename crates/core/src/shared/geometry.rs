pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// A 2D coordinate in pixel space (sub-pixel precision).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle in pixel coordinates, as produced by detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Shrinks the rectangle by `lead` pixels on the top/left edges and
    /// `trail` pixels on the bottom/right edges.
    pub fn inset(&self, lead: i32, trail: i32) -> Rect {
        Rect::new(
            self.x + lead,
            self.y + lead,
            (self.width - lead - trail).max(0),
            (self.height - lead - trail).max(0),
        )
    }

    /// Intersection with a `width` × `height` image, or `None` when empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(width as i32);
        let y2 = (self.y + self.height).min(height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn iou(&self, other: &Rect) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.area() as f64;
        let area_b = other.area() as f64;
        inter / (area_a + area_b - inter)
    }

    /// Greedy deduplication: keeps a rectangle only if its IoU with every
    /// previously-kept rectangle is at or below the threshold.
    pub fn deduplicate(rects: &[Rect], iou_threshold: f64) -> Vec<Rect> {
        if rects.len() <= 1 {
            return rects.to_vec();
        }
        let mut kept: Vec<Rect> = Vec::with_capacity(rects.len());
        for r in rects {
            if !kept.iter().any(|k| r.iou(k) > iou_threshold) {
                kept.push(*r);
            }
        }
        kept
    }
}
