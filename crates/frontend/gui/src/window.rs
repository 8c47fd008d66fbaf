//! minifb window as a [`DisplaySurface`].

use emu_av::types::{Point, Size};
use emu_av::video::color::rgba_to_0rgb;
use emu_av::video::{DisplaySurface, RgbaImage, SoftwareSurface, VideoError};
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};

/// A resizable window whose contents are composed on a [`SoftwareSurface`]
/// and pushed to minifb on `flush`.
///
/// The canvas follows the window size, but only when
/// [`sync_size`](WindowSurface::sync_size) is called, so a frame never sees
/// the viewport change halfway through.
pub struct WindowSurface {
    window: Window,
    canvas: SoftwareSurface,
    packed: Vec<u32>,
    title: String,
}

impl WindowSurface {
    pub fn open(title: &str, size: Size) -> Result<Self, VideoError> {
        let window = Window::new(
            title,
            size.width as usize,
            size.height as usize,
            WindowOptions {
                resize: true,
                // Scaling happens on the canvas, minifb just blits.
                scale_mode: ScaleMode::UpperLeft,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| VideoError::SurfaceUnavailable(e.to_string()))?;

        let (width, height) = window.get_size();
        log::info!("opened {}x{} window", width, height);
        Ok(Self {
            window,
            canvas: SoftwareSurface::new(Size::new(width as u32, height as u32)),
            packed: Vec::new(),
            title: title.to_string(),
        })
    }

    /// Resize the canvas to the current window size. Returns true if it changed.
    pub fn sync_size(&mut self) -> bool {
        let (width, height) = self.window.get_size();
        let size = Size::new(width as u32, height as u32);
        if size == self.canvas.size() || size.is_empty() {
            return false;
        }
        self.canvas.resize(size);
        true
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.window.is_key_down(key)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// Window size as last reported by the OS.
    pub fn window_size(&self) -> Size {
        let (width, height) = self.window.get_size();
        Size::new(width as u32, height as u32)
    }

    /// Show `status` after the base title.
    pub fn set_status(&mut self, status: &str) {
        let title = format!("{} - {}", self.title, status);
        self.window.set_title(&title);
    }

    /// Keep the window responsive without presenting a new frame.
    pub fn pump(&mut self) {
        self.window.update();
    }
}

impl DisplaySurface for WindowSurface {
    fn viewport_size(&self) -> Size {
        self.canvas.size()
    }

    fn clear(&mut self, color: [u8; 4]) {
        self.canvas.clear(color);
    }

    fn put_image(&mut self, image: &RgbaImage, origin: Point) {
        self.canvas.put_image(image, origin);
    }

    fn draw_scaled(&mut self, image: &RgbaImage, scale: u32, origin: Point) {
        self.canvas.draw_scaled(image, scale, origin);
    }

    fn flush(&mut self) -> Result<(), VideoError> {
        let size = self.canvas.size();
        rgba_to_0rgb(self.canvas.pixels(), &mut self.packed);
        self.window
            .update_with_buffer(&self.packed, size.width as usize, size.height as usize)
            .map_err(|e| VideoError::Present(e.to_string()))
    }

    fn name(&self) -> &str {
        "minifb window"
    }
}
