use image::{GrayImage, RgbImage};
use ndarray::ArrayView3;

use crate::shared::geometry::Rect;

/// An owned RGB image: contiguous bytes in row-major order.
///
/// Channel-order conversion happens at I/O boundaries only; every stage
/// receives RGB and owns its own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * Self::CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// A frame filled with a single colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * Self::CHANNELS)
            .collect();
        Self::new(data, width, height)
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }

    pub fn to_gray(&self) -> GrayImage {
        image::DynamicImage::ImageRgb8(self.to_rgb_image()).to_luma8()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }

    /// Copies the part of `rect` that lies inside the frame.
    ///
    /// Returns an empty (0×0) frame when `rect` misses the frame entirely.
    pub fn crop(&self, rect: &Rect) -> Frame {
        let Some(r) = rect.clamp_to(self.width, self.height) else {
            return Frame::new(Vec::new(), 0, 0);
        };
        let (x0, y0) = (r.x as usize, r.y as usize);
        let (w, h) = (r.width as usize, r.height as usize);
        let stride = self.width as usize * Self::CHANNELS;

        let mut data = Vec::with_capacity(w * h * Self::CHANNELS);
        for row in y0..y0 + h {
            let start = row * stride + x0 * Self::CHANNELS;
            data.extend_from_slice(&self.data[start..start + w * Self::CHANNELS]);
        }
        Frame::new(data, r.width as u32, r.height as u32)
    }

    /// `[height, width, channel]` view over the pixel buffer.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                Self::CHANNELS,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}
