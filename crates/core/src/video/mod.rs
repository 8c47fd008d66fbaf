//! Frame presentation: retained RGBA image, integer scaling, centered placement.
//!
//! ```text
//! engine ── PixelFrame ──> FramePresenter ──(copy)──> RgbaImage
//!                                │                      │
//!                                │  scale == 1: put_image, else draw_scaled
//!                                └──────────────────────┴──> DisplaySurface
//! ```

pub mod color;
mod image;
mod presenter;
mod surface;

pub use image::RgbaImage;
pub use presenter::FramePresenter;
pub use surface::{DisplaySurface, SoftwareSurface};

use crate::types::{Point, Size};

/// Errors surfaced by the presentation pipeline.
#[derive(thiserror::Error, Debug)]
pub enum VideoError {
    /// The display surface could not be created. Fatal for the session.
    #[error("display surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("frame dimensions must be non-zero (got {width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// The host failed to show the surface (window closed, lost context, ...).
    #[error("failed to present surface: {0}")]
    Present(String),
}

/// Largest whole-number factor by which `source` fits inside `viewport`,
/// never less than 1.
pub fn integer_scale(source: Size, viewport: Size) -> u32 {
    if source.is_empty() {
        return 1;
    }
    let by_width = viewport.width / source.width;
    let by_height = viewport.height / source.height;
    by_width.min(by_height).max(1)
}

/// Top-left corner that centers `content` in `viewport`. Content larger than
/// the viewport is pinned to the origin and clipped on the right/bottom.
pub fn centered_origin(content: Size, viewport: Size) -> Point {
    Point::new(
        viewport.width.saturating_sub(content.width) / 2,
        viewport.height.saturating_sub(content.height) / 2,
    )
}
