use crate::types::{PixelFrame, Size};

/// CPU-side RGBA image, tightly packed, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    size: Size,
    data: Vec<u8>,
}

impl RgbaImage {
    /// Zero-filled image of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            data: vec![0; size.area() * PixelFrame::BYTES_PER_PIXEL],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes of row `y`. Panics if `y` is out of range.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.size.width as usize * PixelFrame::BYTES_PER_PIXEL;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = (y as usize * self.size.width as usize + x as usize) * PixelFrame::BYTES_PER_PIXEL;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Overwrite the contents with `frame`. Sizes must match.
    pub(crate) fn copy_from(&mut self, frame: &PixelFrame<'_>) {
        debug_assert_eq!(frame.size(), self.size);
        self.data.copy_from_slice(frame.pixels());
    }
}
