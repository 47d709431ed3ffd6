use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables are `(width + 1) × (height + 1)` with a zero first row and
/// column, so any rectangle sum costs four lookups.
pub struct IntegralImage {
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
    width: u32,
    height: u32,
}

impl IntegralImage {
    pub fn new(src: &GrayImage) -> Self {
        let (w, h) = src.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0u64; stride * (h as usize + 1)];
        let mut sq_sum = vec![0u64; stride * (h as usize + 1)];
        let raw = src.as_raw();

        for y in 0..h as usize {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w as usize {
                let v = raw[y * w as usize + x] as u64;
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            sum,
            sq_sum,
            width: w,
            height: h,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixels in `[x, x + w) × [y, y + h)`. The rectangle must lie
    /// inside the image.
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sum, self.width, x, y, w, h)
    }

    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sq_sum, self.width, x, y, w, h)
    }

    fn lookup(table: &[u64], width: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let stride = width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = ((x + w) as usize, (y + h) as usize);
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y1 * stride + x0]
            - table[y0 * stride + x1]
    }
}
