//! Audio scheduling and frame presentation for emulator front-ends.
//!
//! The emulation engine is an opaque producer: once per chunk of emulated time it
//! hands over a stereo [`types::SampleBlock`], once per emulated frame it hands
//! over an RGBA [`types::PixelFrame`]. This crate turns those into continuous
//! playback on an output device and crisp, integer-scaled output on a display
//! surface.
//!
//! - [`audio::AudioStreamScheduler`] batches sample blocks into fixed-size
//!   playback buffers and schedules them on an [`audio::AudioSink`], keeping the
//!   schedule glued to the device clock.
//! - [`video::FramePresenter`] copies frames into a retained image and draws
//!   them onto a [`video::DisplaySurface`] with nearest-neighbor scaling.
//!
//! Both are single-threaded and driven synchronously by the host loop.

pub mod audio;
pub mod config;
pub mod logging;
pub mod signal;
pub mod video;

pub mod types {
    use serde::{Deserialize, Serialize};

    use crate::audio::AudioError;
    use crate::video::VideoError;

    /// Width/height pair in pixels.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Size {
        pub width: u32,
        pub height: u32,
    }

    impl Size {
        pub const fn new(width: u32, height: u32) -> Self {
            Self { width, height }
        }

        pub fn is_empty(&self) -> bool {
            self.width == 0 || self.height == 0
        }

        /// Number of pixels covered by this size.
        pub fn area(&self) -> usize {
            self.width as usize * self.height as usize
        }

        pub fn scaled(&self, factor: u32) -> Self {
            Self::new(
                self.width.saturating_mul(factor),
                self.height.saturating_mul(factor),
            )
        }
    }

    impl From<(u32, u32)> for Size {
        fn from((width, height): (u32, u32)) -> Self {
            Self::new(width, height)
        }
    }

    impl std::fmt::Display for Size {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}x{}", self.width, self.height)
        }
    }

    /// Top-left position on a surface, in pixels.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Point {
        pub x: u32,
        pub y: u32,
    }

    impl Point {
        pub const ORIGIN: Point = Point { x: 0, y: 0 };

        pub const fn new(x: u32, y: u32) -> Self {
            Self { x, y }
        }
    }

    /// One burst of planar stereo audio from the engine.
    ///
    /// Samples are normalized `f32` in `-1.0..=1.0`. Both channels always have
    /// the same length; [`SampleBlock::new`] rejects anything else.
    #[derive(Debug, Clone, Copy)]
    pub struct SampleBlock<'a> {
        left: &'a [f32],
        right: &'a [f32],
    }

    impl<'a> SampleBlock<'a> {
        pub fn new(left: &'a [f32], right: &'a [f32]) -> Result<Self, AudioError> {
            if left.len() != right.len() {
                return Err(AudioError::ChannelMismatch {
                    left: left.len(),
                    right: right.len(),
                });
            }
            Ok(Self { left, right })
        }

        /// For producers that fill both channels in lockstep.
        pub(crate) fn from_lockstep(left: &'a [f32], right: &'a [f32]) -> Self {
            debug_assert_eq!(left.len(), right.len());
            Self { left, right }
        }

        pub fn left(&self) -> &'a [f32] {
            self.left
        }

        pub fn right(&self) -> &'a [f32] {
            self.right
        }

        /// Number of stereo frames in the block.
        pub fn len(&self) -> usize {
            self.left.len()
        }

        pub fn is_empty(&self) -> bool {
            self.left.is_empty()
        }
    }

    /// One rendered frame from the engine: tightly packed RGBA bytes.
    #[derive(Debug, Clone, Copy)]
    pub struct PixelFrame<'a> {
        size: Size,
        pixels: &'a [u8],
    }

    impl<'a> PixelFrame<'a> {
        pub const BYTES_PER_PIXEL: usize = 4;

        /// Wrap a pixel buffer, checking that it holds exactly
        /// `width * height * 4` bytes.
        pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self, VideoError> {
            let size = Size::new(width, height);
            if size.is_empty() {
                return Err(VideoError::EmptyFrame { width, height });
            }
            let expected = size.area() * Self::BYTES_PER_PIXEL;
            if pixels.len() != expected {
                return Err(VideoError::BufferSizeMismatch {
                    width,
                    height,
                    expected,
                    actual: pixels.len(),
                });
            }
            Ok(Self { size, pixels })
        }

        /// For producers that size the buffer from the dimensions themselves.
        pub(crate) fn from_sized(pixels: &'a [u8], size: Size) -> Self {
            debug_assert_eq!(pixels.len(), size.area() * Self::BYTES_PER_PIXEL);
            Self { size, pixels }
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

        pub fn pixels(&self) -> &'a [u8] {
            self.pixels
        }
    }
}
