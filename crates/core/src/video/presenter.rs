use super::{centered_origin, DisplaySurface, RgbaImage, VideoError};
use crate::config::VideoConfig;
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::{PixelFrame, Point, Size};

/// Presents engine frames on a [`DisplaySurface`], integer-scaled and centered.
///
/// The scale factor and placement are cached and only recomputed when the
/// frame size or the viewport changes. Frames are copied into a retained
/// [`RgbaImage`] so the caller's buffer is never held past `present`.
pub struct FramePresenter<S: DisplaySurface> {
    surface: S,
    config: VideoConfig,
    image: Option<RgbaImage>,
    viewport: Size,
    scale: u32,
    origin: Point,
    frames_presented: u64,
    layout_changes: u64,
}

impl<S: DisplaySurface> FramePresenter<S> {
    pub fn new(surface: S, config: VideoConfig) -> Self {
        let viewport = surface.viewport_size();
        if config.max_scale == Some(0) {
            log(LogCategory::Config, LogLevel::Warn, || {
                "max_scale of 0 is treated as 1".to_string()
            });
        }
        log(LogCategory::Video, LogLevel::Info, || {
            format!("presenting on {} ({})", surface.name(), viewport)
        });
        Self {
            surface,
            config,
            image: None,
            viewport,
            scale: 1,
            origin: Point::ORIGIN,
            frames_presented: 0,
            layout_changes: 0,
        }
    }

    /// Validate and present one frame of tightly packed RGBA bytes.
    pub fn present(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<(), VideoError> {
        let frame = PixelFrame::new(pixels, width, height)?;
        self.present_frame(frame)
    }

    pub fn present_frame(&mut self, frame: PixelFrame<'_>) -> Result<(), VideoError> {
        if self.image.as_ref().map(RgbaImage::size) != Some(frame.size()) {
            self.on_resolution_change(frame.size());
        } else if self.surface.viewport_size() != self.viewport {
            self.on_viewport_resized();
        }

        let Some(image) = self.image.as_mut() else {
            return Ok(());
        };
        image.copy_from(&frame);

        if self.scale == 1 {
            self.surface.put_image(image, self.origin);
        } else {
            self.surface.draw_scaled(image, self.scale, self.origin);
        }
        self.surface.flush()?;
        self.frames_presented += 1;
        Ok(())
    }

    /// Reallocate the retained image for a new source size and redo the layout.
    ///
    /// The new image starts zeroed. Nothing from the previous resolution is
    /// carried over. An empty size drops the image entirely.
    pub fn on_resolution_change(&mut self, size: Size) {
        let previous = self.source_size();
        self.image = (!size.is_empty()).then(|| RgbaImage::new(size));
        self.viewport = self.surface.viewport_size();
        self.relayout();
        log(LogCategory::Video, LogLevel::Info, || match previous {
            Some(prev) => format!(
                "resolution {} -> {}, scale {}x at ({}, {})",
                prev, size, self.scale, self.origin.x, self.origin.y
            ),
            None => format!(
                "resolution {}, scale {}x at ({}, {})",
                size, self.scale, self.origin.x, self.origin.y
            ),
        });
    }

    /// Re-query the viewport and redo the layout for the current source size.
    pub fn on_viewport_resized(&mut self) {
        let previous = self.viewport;
        self.viewport = self.surface.viewport_size();
        self.relayout();
        log(LogCategory::Video, LogLevel::Debug, || {
            format!(
                "viewport {} -> {}, scale {}x",
                previous, self.viewport, self.scale
            )
        });
    }

    fn relayout(&mut self) {
        let source = self.source_size().unwrap_or_default();
        self.scale = self.config.scale_for(source, self.viewport);
        self.origin = centered_origin(source.scaled(self.scale), self.viewport);
        self.surface.clear(self.config.border_color);
        self.layout_changes += 1;
    }

    /// Size of the frames currently being presented, if any were.
    pub fn source_size(&self) -> Option<Size> {
        self.image.as_ref().map(RgbaImage::size)
    }

    pub fn scale_factor(&self) -> u32 {
        self.scale
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Top-left corner of the scaled image on the surface.
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// The retained copy of the last presented frame.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// How many times scale and placement were recomputed.
    pub fn layout_changes(&self) -> u64 {
        self.layout_changes
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::SoftwareSurface;

    fn solid(size: Size, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat(size.area())
    }

    fn gradient(size: Size) -> Vec<u8> {
        (0..size.area())
            .flat_map(|i| {
                let x = (i % size.width as usize) as u8;
                let y = (i / size.width as usize) as u8;
                [x, y, x ^ y, 255]
            })
            .collect()
    }

    fn presenter(viewport: Size) -> FramePresenter<SoftwareSurface> {
        FramePresenter::new(SoftwareSurface::new(viewport), VideoConfig::default())
    }

    #[test]
    fn scale_one_round_trip_is_byte_identical() {
        let size = Size::new(256, 224);
        let pixels = gradient(size);
        let mut p = presenter(Size::new(300, 300));

        p.present(&pixels, 256, 224).unwrap();
        assert_eq!(p.scale_factor(), 1);
        assert_eq!(p.origin(), Point::new(22, 38));

        let back = p.surface().read_region(p.origin(), size).unwrap();
        assert_eq!(back, pixels);
        assert_eq!(p.image().unwrap().as_bytes(), &pixels[..]);
    }

    #[test]
    fn scales_up_to_fit() {
        let size = Size::new(256, 224);
        let pixels = gradient(size);
        let mut p = presenter(Size::new(1024, 900));

        p.present(&pixels, 256, 224).unwrap();
        assert_eq!(p.scale_factor(), 4);
        assert_eq!(p.origin(), Point::new(0, 2));

        let surface = p.surface();
        let image = p.image().unwrap();
        for (x, y) in [(0, 0), (255, 223), (17, 100), (128, 5)] {
            let expected = image.pixel(x, y);
            for (dx, dy) in [(0, 0), (3, 3), (1, 2)] {
                assert_eq!(surface.pixel(x * 4 + dx, 2 + y * 4 + dy), expected);
            }
        }
    }

    #[test]
    fn borders_use_configured_color() {
        let config = VideoConfig {
            border_color: [10, 20, 30, 255],
            ..VideoConfig::default()
        };
        let mut p = FramePresenter::new(SoftwareSurface::new(Size::new(10, 10)), config);
        p.present(&solid(Size::new(4, 4), [255; 4]), 4, 4).unwrap();

        assert_eq!(p.scale_factor(), 2);
        assert_eq!(p.origin(), Point::new(1, 1));
        assert_eq!(p.surface().pixel(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(p.surface().pixel(9, 9), Some([10, 20, 30, 255]));
        assert_eq!(p.surface().pixel(1, 1), Some([255; 4]));
    }

    #[test]
    fn resolution_change_discards_stale_pixels() {
        let mut p = presenter(Size::new(512, 512));
        p.present(&solid(Size::new(256, 224), [200, 0, 0, 255]), 256, 224)
            .unwrap();
        assert_eq!(p.scale_factor(), 2);

        let small = Size::new(160, 144);
        let pixels = gradient(small);
        p.present(&pixels, 160, 144).unwrap();

        assert_eq!(p.source_size(), Some(small));
        assert_eq!(p.scale_factor(), 3);
        assert_eq!(p.image().unwrap().as_bytes(), &pixels[..]);
        assert_eq!(p.layout_changes(), 2);

        // Red from the old, larger layout must not survive in the border.
        assert_eq!(p.surface().pixel(0, 0), Some([0, 0, 0, 255]));
        assert_eq!(p.surface().pixel(511, 511), Some([0, 0, 0, 255]));
    }

    #[test]
    fn explicit_resolution_change_zeroes_image() {
        let mut p = presenter(Size::new(64, 64));
        p.present(&solid(Size::new(8, 8), [9; 4]), 8, 8).unwrap();

        p.on_resolution_change(Size::new(16, 16));
        let image = p.image().unwrap();
        assert_eq!(image.size(), Size::new(16, 16));
        assert!(image.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(p.scale_factor(), 4);
    }

    #[test]
    fn same_size_frames_keep_layout() {
        let mut p = presenter(Size::new(100, 100));
        let pixels = gradient(Size::new(10, 10));
        for _ in 0..5 {
            p.present(&pixels, 10, 10).unwrap();
        }
        assert_eq!(p.layout_changes(), 1);
        assert_eq!(p.frames_presented(), 5);
        assert_eq!(p.surface().flush_count(), 5);
    }

    #[test]
    fn viewport_resize_is_picked_up() {
        let mut p = presenter(Size::new(256, 224));
        let pixels = gradient(Size::new(256, 224));
        p.present(&pixels, 256, 224).unwrap();
        assert_eq!(p.scale_factor(), 1);

        p.surface_mut().resize(Size::new(800, 700));
        p.present(&pixels, 256, 224).unwrap();
        assert_eq!(p.viewport(), Size::new(800, 700));
        assert_eq!(p.scale_factor(), 3);
        assert_eq!(p.origin(), Point::new(16, 14));

        p.surface_mut().resize(Size::new(600, 600));
        p.on_viewport_resized();
        assert_eq!(p.scale_factor(), 2);
    }

    #[test]
    fn max_scale_caps_magnification() {
        let config = VideoConfig {
            max_scale: Some(2),
            ..VideoConfig::default()
        };
        let mut p = FramePresenter::new(SoftwareSurface::new(Size::new(1024, 900)), config);
        p.present(&gradient(Size::new(256, 224)), 256, 224).unwrap();
        assert_eq!(p.scale_factor(), 2);
        assert_eq!(p.origin(), Point::new(256, 226));
    }

    #[test]
    fn malformed_frames_are_rejected() {
        let mut p = presenter(Size::new(64, 64));
        assert!(matches!(
            p.present(&[0; 15], 2, 2),
            Err(VideoError::BufferSizeMismatch { expected: 16, actual: 15, .. })
        ));
        assert!(matches!(
            p.present(&[], 0, 4),
            Err(VideoError::EmptyFrame { width: 0, height: 4 })
        ));
        assert_eq!(p.frames_presented(), 0);
        assert!(p.image().is_none());
    }
}
