//! Audio delivery: fixed-size playback buffers scheduled against a device clock.
//!
//! ```text
//! engine ── SampleBlock ──> AudioStreamScheduler ── PlaybackBuffer @ t ──> AudioSink
//!                                  │                                          │
//!                                  └──────── current_time() <─────────────────┘
//! ```
//!
//! The scheduler never waits on the sink. It compares the time it intends to
//! start the next buffer with the sink's clock and snaps the schedule back to
//! "now" when the two drift apart (see [`check_drift`]).

mod buffer;
mod scheduler;
mod sink;

pub use buffer::PlaybackBuffer;
pub use scheduler::{check_drift, AudioStats, AudioStreamScheduler, Drift};
pub use sink::{AudioSink, MemorySink, Submission};

/// Errors surfaced by the audio pipeline.
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    /// The output device could not be opened or started. Fatal for the session.
    #[error("audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("sink runs at {sink} Hz but the scheduler was configured for {configured} Hz")]
    SampleRateMismatch { configured: u32, sink: u32 },

    #[error("sample block channels differ in length (left {left}, right {right})")]
    ChannelMismatch { left: usize, right: usize },

    #[error("interleaved stereo block has an odd sample count ({0})")]
    OddInterleavedLength(usize),

    #[error("invalid audio configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("audio output is closed")]
    Closed,

    /// The device refused a buffer. Treated like a lost device.
    #[error("audio device rejected a buffer: {0}")]
    Submit(String),
}
