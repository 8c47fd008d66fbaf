//! Presenting engine frames onto an in-memory surface.

use emu_av::config::VideoConfig;
use emu_av::signal::{TestSignal, TimingMode};
use emu_av::types::{Point, Size};
use emu_av::video::{integer_scale, DisplaySurface, FramePresenter, SoftwareSurface, VideoError};

#[test]
fn scale_factor_examples() {
    assert_eq!(integer_scale(Size::new(256, 224), Size::new(1024, 900)), 4);
    assert_eq!(integer_scale(Size::new(256, 224), Size::new(300, 300)), 1);
}

#[test]
fn unscaled_readback_matches_frame() {
    let mut signal = TestSignal::new(44_100, TimingMode::Ntsc);
    let mut presenter = FramePresenter::new(
        SoftwareSurface::new(Size::new(300, 300)),
        VideoConfig::default(),
    );

    for _ in 0..3 {
        let frame = signal.next_frame();
        let expected = frame.pixels().to_vec();
        presenter.present_frame(frame).unwrap();

        assert_eq!(presenter.scale_factor(), 1);
        let back = presenter
            .surface()
            .read_region(presenter.origin(), Size::new(256, 224))
            .unwrap();
        assert_eq!(back, expected);
    }
}

#[test]
fn resolution_switches_mid_stream() {
    let sizes = vec![Size::new(256, 224), Size::new(512, 448), Size::new(160, 144)];
    let mut signal =
        TestSignal::new(44_100, TimingMode::Ntsc).with_resolutions(sizes.clone(), 1);
    let mut presenter = FramePresenter::new(
        SoftwareSurface::new(Size::new(1024, 900)),
        VideoConfig::default(),
    );

    let expected_scales = [4, 2, 6];
    for (size, scale) in sizes.iter().zip(expected_scales) {
        let frame = signal.next_frame();
        let pixels = frame.pixels().to_vec();
        presenter.present_frame(frame).unwrap();

        assert_eq!(presenter.source_size(), Some(*size));
        assert_eq!(presenter.scale_factor(), scale);
        let image = presenter.image().unwrap();
        assert_eq!(image.as_bytes().len(), size.area() * 4);
        assert_eq!(image.as_bytes(), &pixels[..]);
    }
    assert_eq!(presenter.layout_changes(), 3);

    // 160x144 at 6x is 960x864, centered in 1024x900.
    assert_eq!(presenter.origin(), Point::new(32, 18));
    let surface = presenter.surface();
    assert_eq!(surface.pixel(31, 18), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(32, 17), Some([0, 0, 0, 255]));
    assert_eq!(surface.pixel(32, 18), presenter.image().unwrap().pixel(0, 0));
}

#[test]
fn window_resize_between_frames() {
    let mut signal = TestSignal::new(44_100, TimingMode::Pal);
    let mut presenter = FramePresenter::new(
        SoftwareSurface::new(Size::new(256, 224)),
        VideoConfig::default(),
    );

    presenter.present_frame(signal.next_frame()).unwrap();
    assert_eq!(presenter.scale_factor(), 1);
    assert_eq!(presenter.origin(), Point::ORIGIN);

    presenter.surface_mut().resize(Size::new(768, 720));
    presenter.present_frame(signal.next_frame()).unwrap();
    assert_eq!(presenter.viewport(), Size::new(768, 720));
    assert_eq!(presenter.scale_factor(), 3);
    assert_eq!(presenter.origin(), Point::new(0, 24));
}

/// Surface that fails to flush, like a window the user just closed.
struct ClosedWindow(SoftwareSurface);

impl DisplaySurface for ClosedWindow {
    fn viewport_size(&self) -> Size {
        self.0.viewport_size()
    }

    fn clear(&mut self, color: [u8; 4]) {
        self.0.clear(color);
    }

    fn put_image(&mut self, image: &emu_av::video::RgbaImage, origin: Point) {
        self.0.put_image(image, origin);
    }

    fn draw_scaled(&mut self, image: &emu_av::video::RgbaImage, scale: u32, origin: Point) {
        self.0.draw_scaled(image, scale, origin);
    }

    fn flush(&mut self) -> Result<(), VideoError> {
        Err(VideoError::Present("window closed".to_string()))
    }

    fn name(&self) -> &str {
        "Closed Window"
    }
}

#[test]
fn present_failures_propagate() {
    let mut presenter = FramePresenter::new(
        ClosedWindow(SoftwareSurface::new(Size::new(64, 64))),
        VideoConfig::default(),
    );
    let result = presenter.present(&[0; 16], 2, 2);
    assert!(matches!(result, Err(VideoError::Present(_))));
    assert_eq!(presenter.frames_presented(), 0);
}
