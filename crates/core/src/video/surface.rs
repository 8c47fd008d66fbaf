use super::{RgbaImage, VideoError};
use crate::types::{PixelFrame, Point, Size};

/// A 2D surface the presenter can draw on.
///
/// Implementations own their pixels between frames: anything not overwritten
/// by `clear`, `put_image` or `draw_scaled` keeps its previous contents.
/// Drawing is clipped to the viewport.
pub trait DisplaySurface {
    /// Drawable area in pixels. The host resizes it, the presenter queries it.
    fn viewport_size(&self) -> Size;

    /// Fill the whole viewport with one RGBA color.
    fn clear(&mut self, color: [u8; 4]);

    /// Copy `image` 1:1 with its top-left corner at `origin`.
    fn put_image(&mut self, image: &RgbaImage, origin: Point);

    /// Draw `image` magnified by `scale` using nearest-neighbor sampling.
    fn draw_scaled(&mut self, image: &RgbaImage, scale: u32, origin: Point);

    /// Hand the finished surface to the host for display.
    fn flush(&mut self) -> Result<(), VideoError>;

    fn name(&self) -> &str;
}

/// In-memory RGBA canvas.
#[derive(Debug, Clone)]
pub struct SoftwareSurface {
    size: Size,
    pixels: Vec<u8>,
    // One scaled source row, replicated `scale` times vertically.
    row: Vec<u8>,
    flushes: u64,
}

impl SoftwareSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![0; size.area() * PixelFrame::BYTES_PER_PIXEL],
            row: Vec::new(),
            flushes: 0,
        }
    }

    /// Change the canvas size. Contents are discarded.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.pixels.clear();
        self.pixels
            .resize(size.area() * PixelFrame::BYTES_PER_PIXEL, 0);
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Whole canvas, RGBA, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Copy out a rectangle as tightly packed RGBA. `None` if the rectangle
    /// does not lie entirely inside the canvas.
    pub fn read_region(&self, origin: Point, size: Size) -> Option<Vec<u8>> {
        let right = origin.x.checked_add(size.width)?;
        let bottom = origin.y.checked_add(size.height)?;
        if right > self.size.width || bottom > self.size.height {
            return None;
        }
        let stride = size.width as usize * PixelFrame::BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(size.area() * PixelFrame::BYTES_PER_PIXEL);
        for y in origin.y..bottom {
            let start = self.offset(origin.x, y);
            out.extend_from_slice(&self.pixels[start..start + stride]);
        }
        Some(out)
    }

    /// Number of completed `flush` calls.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.size.width as usize + x as usize) * PixelFrame::BYTES_PER_PIXEL
    }

    fn blit(&mut self, image: &RgbaImage, scale: u32, origin: Point) {
        const BPP: usize = PixelFrame::BYTES_PER_PIXEL;

        let scale = scale.max(1) as usize;
        let canvas_w = self.size.width as usize;
        let canvas_h = self.size.height as usize;
        let (ox, oy) = (origin.x as usize, origin.y as usize);
        if ox >= canvas_w || oy >= canvas_h {
            return;
        }

        let src_w = image.width() as usize;
        let dst_w = (src_w * scale).min(canvas_w - ox);
        if dst_w == 0 {
            return;
        }
        let dst_bytes = dst_w * BPP;

        for sy in 0..image.height() {
            let top = oy + sy as usize * scale;
            if top >= canvas_h {
                break;
            }
            let src = image.row(sy);

            let row: &[u8] = if scale == 1 {
                &src[..dst_bytes]
            } else {
                self.row.resize(dst_bytes, 0);
                for (dx, out) in self.row.chunks_exact_mut(BPP).enumerate() {
                    let sx = dx / scale;
                    out.copy_from_slice(&src[sx * BPP..sx * BPP + BPP]);
                }
                &self.row
            };

            for y in top..(top + scale).min(canvas_h) {
                let start = (y * canvas_w + ox) * BPP;
                self.pixels[start..start + dst_bytes].copy_from_slice(row);
            }
        }
    }
}

impl DisplaySurface for SoftwareSurface {
    fn viewport_size(&self) -> Size {
        self.size
    }

    fn clear(&mut self, color: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(PixelFrame::BYTES_PER_PIXEL) {
            px.copy_from_slice(&color);
        }
    }

    fn put_image(&mut self, image: &RgbaImage, origin: Point) {
        self.blit(image, 1, origin);
    }

    fn draw_scaled(&mut self, image: &RgbaImage, scale: u32, origin: Point) {
        self.blit(image, scale, origin);
    }

    fn flush(&mut self) -> Result<(), VideoError> {
        self.flushes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "Software Surface"
    }
}
