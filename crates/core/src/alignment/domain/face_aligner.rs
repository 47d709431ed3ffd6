//! Eye-anchored face normalisation.
//!
//! Rotates the face about the left eye so the eye line is horizontal,
//! crops a window scaled by the inter-eye distance so the eyes land at a
//! fixed offset, and resamples the crop to a fixed output size.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

pub const DEFAULT_OFFSET_PCT: (f64, f64) = (0.3, 0.3);
pub const DEFAULT_DEST_SIZE: (u32, u32) = (200, 200);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    #[error("degenerate eye coordinates: both eyes at ({x}, {y})")]
    DegenerateEyes { x: f64, y: f64 },
    #[error("destination size must be non-zero, got {0}x{1}")]
    EmptyDestination(u32, u32),
    #[error("eye offset ({h}, {v}) leaves no room for the eyes; horizontal must be in [0, 0.5), vertical in [0, 1)")]
    InvalidOffset { h: f64, v: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignParams {
    /// Horizontal/vertical eye offset as a fraction of the output size.
    pub offset_pct: (f64, f64),
    /// Output `(width, height)`.
    pub dest_size: (u32, u32),
}

impl AlignParams {
    /// Checks that the eyes land inside the output with a positive
    /// distance between them.
    pub fn validate(&self) -> Result<(), AlignError> {
        let (dest_w, dest_h) = self.dest_size;
        if dest_w == 0 || dest_h == 0 {
            return Err(AlignError::EmptyDestination(dest_w, dest_h));
        }
        let (h, v) = self.offset_pct;
        let in_range = h.is_finite() && v.is_finite() && h >= 0.0 && (0.0..1.0).contains(&v);
        if !in_range || self.reference() <= 0.0 {
            return Err(AlignError::InvalidOffset { h, v });
        }
        Ok(())
    }

    /// Eye offset inside the output, in whole output pixels.
    fn offset(&self) -> (f64, f64) {
        (
            (self.offset_pct.0 * self.dest_size.0 as f64).floor(),
            (self.offset_pct.1 * self.dest_size.1 as f64).floor(),
        )
    }

    /// Inter-eye distance in the output.
    fn reference(&self) -> f64 {
        self.dest_size.0 as f64 - 2.0 * self.offset().0
    }
}

impl Default for AlignParams {
    fn default() -> Self {
        Self {
            offset_pct: DEFAULT_OFFSET_PCT,
            dest_size: DEFAULT_DEST_SIZE,
        }
    }
}

/// Geometry of one alignment, computed from the two eye anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignmentTransform {
    /// Radians; rotating by this makes the eye line horizontal.
    pub rotation: f64,
    /// Measured inter-eye distance in source pixels.
    pub distance: f64,
    /// Inter-eye distance the output is normalised to.
    pub reference: f64,
    /// `distance / reference`.
    pub scale: f64,
    /// Eye offset inside the output, in output pixels.
    pub offset: (f64, f64),
}

impl AlignmentTransform {
    pub fn compute(
        eye_left: Point,
        eye_right: Point,
        params: &AlignParams,
    ) -> Result<Self, AlignError> {
        params.validate()?;
        if eye_left == eye_right {
            return Err(AlignError::DegenerateEyes {
                x: eye_left.x,
                y: eye_left.y,
            });
        }

        let rotation = -(eye_right.y - eye_left.y).atan2(eye_right.x - eye_left.x);
        let distance = eye_left.distance(&eye_right);
        let reference = params.reference();

        Ok(Self {
            rotation,
            distance,
            reference,
            scale: distance / reference,
            offset: params.offset(),
        })
    }
}

pub struct FaceAligner {
    params: AlignParams,
}

impl FaceAligner {
    pub fn new(params: AlignParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AlignParams {
        &self.params
    }

    /// Produces a `dest_size` face with the eyes at the canonical position.
    ///
    /// The source frame is not modified. Identical eye points are a caller
    /// error and are rejected rather than producing a zero-scale image.
    pub fn align(
        &self,
        frame: &Frame,
        eye_left: Point,
        eye_right: Point,
    ) -> Result<Frame, AlignError> {
        let t = AlignmentTransform::compute(eye_left, eye_right, &self.params)?;
        let (dest_w, dest_h) = self.params.dest_size;

        let crop_w = ((dest_w as f64 * t.scale).round() as u32).max(1);
        let crop_h = ((dest_h as f64 * t.scale).round() as u32).max(1);
        // Crop origin relative to the left eye, in the rotated frame.
        let origin_x = -t.scale * t.offset.0;
        let origin_y = -t.scale * t.offset.1;
        let (sin, cos) = t.rotation.sin_cos();

        let src = frame.to_rgb_image();
        let crop = image::RgbImage::from_fn(crop_w, crop_h, |i, j| {
            let qx = origin_x + i as f64;
            let qy = origin_y + j as f64;
            let sx = eye_left.x + cos * qx + sin * qy;
            let sy = eye_left.y - sin * qx + cos * qy;
            image::Rgb(sample_bilinear(&src, sx, sy))
        });

        let resized = image::imageops::resize(&crop, dest_w, dest_h, FilterType::CatmullRom);
        log::debug!(
            "Aligned face: rotation {:.3} rad, scale {:.3}, crop {crop_w}x{crop_h} -> {dest_w}x{dest_h}",
            t.rotation,
            t.scale
        );
        Ok(Frame::from_rgb_image(resized))
    }
}

/// Bilinear sample; black outside the image.
fn sample_bilinear(img: &image::RgbImage, x: f64, y: f64) -> [u8; 3] {
    let (w, h) = img.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let fetch = |px: f64, py: f64| -> [f64; 3] {
        if px < 0.0 || py < 0.0 || px >= w as f64 || py >= h as f64 {
            return [0.0; 3];
        }
        let p = img.get_pixel(px as u32, py as u32).0;
        [p[0] as f64, p[1] as f64, p[2] as f64]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1.0, y0);
    let p01 = fetch(x0, y0 + 1.0);
    let p11 = fetch(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::f64::consts::FRAC_PI_2;

    fn smooth_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x / 2) as u8, (y / 2) as u8, 90]);
            }
        }
        Frame::new(data, width, height)
    }

    // ── Transform ───────────────────────────────────────────────────

    #[test]
    fn test_identity_transform() {
        let t = AlignmentTransform::compute(
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
            &AlignParams::default(),
        )
        .unwrap();
        assert_relative_eq!(t.rotation, 0.0);
        assert_relative_eq!(t.reference, 80.0);
        assert_relative_eq!(t.distance, 80.0);
        assert_relative_eq!(t.scale, 1.0);
        assert_eq!(t.offset, (60.0, 60.0));
    }

    #[test]
    fn test_rotation_for_vertical_eye_line() {
        let t = AlignmentTransform::compute(
            Point::new(0.0, 0.0),
            Point::new(0.0, 40.0),
            &AlignParams::default(),
        )
        .unwrap();
        assert_relative_eq!(t.rotation, -FRAC_PI_2);
        assert_relative_eq!(t.scale, 0.5);
    }

    #[test]
    fn test_rotation_sign_follows_image_y_axis() {
        // Right eye lower than left eye in image space → negative rotation.
        let t = AlignmentTransform::compute(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            &AlignParams::default(),
        )
        .unwrap();
        assert_relative_eq!(t.rotation, -std::f64::consts::FRAC_PI_4);
    }

    #[test]
    fn test_degenerate_eyes_rejected() {
        let p = Point::new(30.0, 30.0);
        assert_eq!(
            AlignmentTransform::compute(p, p, &AlignParams::default()),
            Err(AlignError::DegenerateEyes { x: 30.0, y: 30.0 })
        );
    }

    #[test]
    fn test_empty_destination_rejected() {
        let params = AlignParams {
            dest_size: (0, 200),
            ..AlignParams::default()
        };
        assert!(matches!(
            AlignmentTransform::compute(Point::new(0.0, 0.0), Point::new(5.0, 0.0), &params),
            Err(AlignError::EmptyDestination(0, 200))
        ));
    }

    #[rstest]
    #[case::half_width((0.5, 0.3))]
    #[case::past_half_width((0.6, 0.3))]
    #[case::negative((-0.1, 0.3))]
    #[case::below_output((0.3, 1.0))]
    #[case::not_finite((f64::INFINITY, 0.3))]
    fn test_offset_without_room_for_eyes_rejected(#[case] offset_pct: (f64, f64)) {
        let params = AlignParams {
            offset_pct,
            ..AlignParams::default()
        };
        assert!(matches!(params.validate(), Err(AlignError::InvalidOffset { .. })));
        assert!(matches!(
            AlignmentTransform::compute(Point::new(10.0, 50.0), Point::new(90.0, 50.0), &params),
            Err(AlignError::InvalidOffset { .. })
        ));
    }

    #[test]
    fn test_narrow_output_rounds_offset_down() {
        // floor(0.49 * 3) = 1 leaves a one-pixel reference.
        let params = AlignParams {
            offset_pct: (0.49, 0.0),
            dest_size: (3, 3),
        };
        assert!(params.validate().is_ok());
        let t = AlignmentTransform::compute(Point::new(0.0, 0.0), Point::new(2.0, 0.0), &params)
            .unwrap();
        assert_relative_eq!(t.reference, 1.0);
        assert_relative_eq!(t.scale, 2.0);
    }

    // ── Alignment ───────────────────────────────────────────────────

    #[rstest]
    #[case::identity((60.0, 60.0), (140.0, 60.0), (200, 200))]
    #[case::tilted((40.0, 70.0), (120.0, 95.0), (200, 200))]
    #[case::far_apart((10.0, 20.0), (190.0, 30.0), (100, 120))]
    #[case::close_together((90.0, 90.0), (96.0, 91.0), (64, 64))]
    fn test_output_size_is_destination(
        #[case] left: (f64, f64),
        #[case] right: (f64, f64),
        #[case] dest_size: (u32, u32),
    ) {
        let aligner = FaceAligner::new(AlignParams {
            dest_size,
            ..AlignParams::default()
        });
        let out = aligner
            .align(
                &smooth_frame(200, 200),
                Point::new(left.0, left.1),
                Point::new(right.0, right.1),
            )
            .unwrap();
        assert_eq!((out.width(), out.height()), dest_size);
    }

    #[test]
    fn test_identity_alignment_preserves_pixels() {
        // Eyes already horizontal, at the canonical offset and distance.
        let frame = smooth_frame(200, 200);
        let aligner = FaceAligner::new(AlignParams::default());
        let out = aligner
            .align(&frame, Point::new(60.0, 60.0), Point::new(140.0, 60.0))
            .unwrap();
        for (x, y) in [(10, 10), (100, 50), (150, 180)] {
            let a = out.pixel(x, y);
            let b = frame.pixel(x, y);
            for c in 0..3 {
                assert!(
                    (a[c] as i32 - b[c] as i32).abs() <= 2,
                    "pixel ({x},{y}) channel {c}: {} vs {}",
                    a[c],
                    b[c]
                );
            }
        }
    }

    #[test]
    fn test_source_outside_is_black() {
        // Eyes near the top-left corner: the crop origin lies outside.
        let frame = Frame::filled(200, 200, [255, 255, 255]);
        let aligner = FaceAligner::new(AlignParams::default());
        let out = aligner
            .align(&frame, Point::new(0.0, 0.0), Point::new(80.0, 0.0))
            .unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 0]);
        assert!(out.pixel(150, 150)[0] > 200);
    }

    #[test]
    fn test_source_frame_untouched() {
        let frame = smooth_frame(50, 50);
        let before = frame.clone();
        let aligner = FaceAligner::new(AlignParams::default());
        aligner
            .align(&frame, Point::new(10.0, 20.0), Point::new(40.0, 25.0))
            .unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_align_half_width_offset_is_error() {
        let aligner = FaceAligner::new(AlignParams {
            offset_pct: (0.5, 0.5),
            ..AlignParams::default()
        });
        let frame = Frame::filled(200, 200, [200, 200, 200]);
        assert_eq!(
            aligner.align(&frame, Point::new(60.0, 60.0), Point::new(140.0, 60.0)),
            Err(AlignError::InvalidOffset { h: 0.5, v: 0.5 })
        );
    }

    #[test]
    fn test_align_degenerate_is_error() {
        let aligner = FaceAligner::new(AlignParams::default());
        let p = Point::new(5.0, 5.0);
        assert!(aligner.align(&smooth_frame(20, 20), p, p).is_err());
    }
}
