use std::mem;
use std::ops::Range;

use serde::Serialize;

use super::{AudioError, AudioSink, PlaybackBuffer};
use crate::config::AudioConfig;
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::SampleBlock;

/// How a pending start time relates to the device clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// `0 <= scheduled - now < tolerance`: keep the schedule.
    InSync,
    /// The start time has already passed.
    Late,
    /// The start time is at least `tolerance` seconds in the future.
    TooFarAhead,
}

impl Drift {
    pub fn needs_resync(self) -> bool {
        self != Drift::InSync
    }
}

/// Classify `scheduled` against the device clock `now`.
pub fn check_drift(scheduled: f64, now: f64, tolerance: f64) -> Drift {
    let delta = scheduled - now;
    if delta < 0.0 {
        Drift::Late
    } else if delta >= tolerance {
        Drift::TooFarAhead
    } else {
        Drift::InSync
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AudioStats {
    pub frames_pushed: u64,
    pub buffers_submitted: u64,
    /// Rotations whose start time had already passed.
    pub late_resyncs: u64,
    /// Rotations scheduled too far ahead (e.g. the device kept running while
    /// the producer was stalled, or the producer ran fast).
    pub ahead_resyncs: u64,
}

/// Packs engine sample blocks into fixed-size buffers and schedules them
/// back-to-back on an [`AudioSink`].
///
/// Each full buffer is scheduled one buffer-duration after the previous one,
/// so playback stays gapless as long as the producer keeps up. When the
/// schedule and the device clock disagree by more than the configured
/// tolerance (or the buffer is already late) the next buffer starts "now".
pub struct AudioStreamScheduler<S: AudioSink> {
    sink: S,
    config: AudioConfig,
    buffer: PlaybackBuffer,
    /// Device time the most recently submitted buffer starts at (or the
    /// session start before the first submission).
    buffer_start_time: f64,
    /// Device time at which submitted audio runs out.
    queued_until: Option<f64>,
    stats: AudioStats,
    closed: bool,
}

impl<S: AudioSink> AudioStreamScheduler<S> {
    /// Take ownership of an opened (suspended) sink and start it.
    pub fn initialize(mut sink: S, config: AudioConfig) -> Result<Self, AudioError> {
        if let Err(e) = config.validate() {
            log(LogCategory::Config, LogLevel::Error, || e.to_string());
            return Err(e);
        }
        if sink.sample_rate() != config.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                configured: config.sample_rate,
                sink: sink.sample_rate(),
            });
        }

        let buffer = PlaybackBuffer::new(config.buffer_frames);
        let buffer_start_time = sink.current_time();
        sink.resume()?;

        log(LogCategory::Device, LogLevel::Info, || {
            format!(
                "{} started: {} Hz, {} frame buffers ({:.1} ms), tolerance {:.3}s",
                sink.name(),
                config.sample_rate,
                config.buffer_frames,
                config.buffer_duration() * 1000.0,
                config.desync_tolerance
            )
        });

        Ok(Self {
            sink,
            config,
            buffer,
            buffer_start_time,
            queued_until: None,
            stats: AudioStats::default(),
            closed: false,
        })
    }

    /// Append a planar stereo block. Full buffers are submitted as they fill;
    /// samples past the end of a buffer carry over into the next one.
    pub fn push(&mut self, block: SampleBlock<'_>) -> Result<(), AudioError> {
        let (left, right) = (block.left(), block.right());
        self.write(block.len(), |src, dst_l, dst_r| {
            dst_l.copy_from_slice(&left[src.clone()]);
            dst_r.copy_from_slice(&right[src]);
        })
    }

    /// Same as [`push`](Self::push) for `L R L R ...` input.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if samples.len() % 2 != 0 {
            return Err(AudioError::OddInterleavedLength(samples.len()));
        }
        self.write(samples.len() / 2, |src, dst_l, dst_r| {
            let pairs = samples[src.start * 2..src.end * 2].chunks_exact(2);
            for ((l, r), pair) in dst_l.iter_mut().zip(dst_r.iter_mut()).zip(pairs) {
                *l = pair[0];
                *r = pair[1];
            }
        })
    }

    fn write<F>(&mut self, frames: usize, mut copy: F) -> Result<(), AudioError>
    where
        F: FnMut(Range<usize>, &mut [f32], &mut [f32]),
    {
        if self.closed {
            return Err(AudioError::Closed);
        }

        let mut written = 0;
        while written < frames {
            let n = (frames - written).min(self.buffer.remaining());
            let (dst_l, dst_r) = self.buffer.claim(n);
            copy(written..written + n, dst_l, dst_r);
            written += n;
            self.stats.frames_pushed += n as u64;

            if self.buffer.is_full() {
                self.rotate()?;
            }
        }
        Ok(())
    }

    /// Submit the full open buffer and open an empty one.
    fn rotate(&mut self) -> Result<(), AudioError> {
        let now = self.sink.current_time();
        let mut start = self.buffer_start_time + self.config.buffer_duration();

        match check_drift(start, now, self.config.desync_tolerance) {
            Drift::InSync => {}
            Drift::Late => {
                self.stats.late_resyncs += 1;
                log(LogCategory::Audio, LogLevel::Debug, || {
                    format!("buffer late by {:.4}s, starting now ({:.4}s)", now - start, now)
                });
                start = now;
            }
            Drift::TooFarAhead => {
                self.stats.ahead_resyncs += 1;
                log(LogCategory::Audio, LogLevel::Warn, || {
                    format!(
                        "schedule {:.4}s ahead of device clock, resyncing to {:.4}s",
                        start - now,
                        now
                    )
                });
                start = now;
            }
        }

        let full = mem::replace(
            &mut self.buffer,
            PlaybackBuffer::new(self.config.buffer_frames),
        );
        if let Err(e) = self.sink.schedule(full, start) {
            log(LogCategory::Device, LogLevel::Error, || {
                format!("{} rejected a buffer: {}", self.sink.name(), e)
            });
            // The buffer is gone, so later pushes cannot stay gapless.
            if let Err(close_err) = self.close() {
                log(LogCategory::Device, LogLevel::Warn, || {
                    format!("failed to release audio device: {}", close_err)
                });
            }
            return Err(e);
        }
        self.buffer_start_time = start;
        self.stats.buffers_submitted += 1;
        self.queued_until = Some(start + self.config.buffer_duration());

        log(LogCategory::Audio, LogLevel::Trace, || {
            format!(
                "buffer #{} scheduled at {:.4}s (device {:.4}s)",
                self.stats.buffers_submitted, start, now
            )
        });
        Ok(())
    }

    /// Drop the partially filled buffer and restart the schedule from the
    /// device's current time. Use after the producer was paused.
    pub fn resync(&mut self) {
        if self.closed {
            return;
        }
        let discarded = self.buffer.position();
        self.buffer = PlaybackBuffer::new(self.config.buffer_frames);
        self.buffer_start_time = self.sink.current_time();
        if self
            .queued_until
            .is_some_and(|end| end <= self.buffer_start_time)
        {
            self.queued_until = None;
        }
        log(LogCategory::Audio, LogLevel::Info, || {
            format!(
                "resync at {:.4}s, discarded {} pending frame(s)",
                self.buffer_start_time, discarded
            )
        });
    }

    /// Device time at which the producer should run its next frame.
    ///
    /// Hosts that pace emulation from the audio clock wait until
    /// `sink().current_time()` reaches this value before producing more
    /// samples. At that point one and a half buffers of pushed audio are
    /// still ahead of the device, so rotations land inside the tolerance
    /// window.
    pub fn sync_time(&self) -> f64 {
        let written = self.buffer.position() as f64 / self.config.sample_rate as f64;
        self.buffer_start_time + written - self.config.buffer_duration() / 2.0
    }

    /// Seconds left until [`sync_time`](Self::sync_time), zero when it has passed.
    pub fn until_sync(&self) -> f64 {
        (self.sync_time() - self.sink.current_time()).max(0.0)
    }

    /// Seconds of already submitted audio the device has not reached yet.
    pub fn queued_duration(&self) -> f64 {
        self.queued_until
            .map_or(0.0, |end| (end - self.sink.current_time()).max(0.0))
    }

    /// Stop and release the output device. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), AudioError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        log(LogCategory::Device, LogLevel::Info, || {
            format!(
                "{} closed after {} buffer(s)",
                self.sink.name(),
                self.stats.buffers_submitted
            )
        });
        self.sink.close()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn buffer_duration(&self) -> f64 {
        self.config.buffer_duration()
    }

    /// Write cursor of the open buffer.
    pub fn buffer_position(&self) -> usize {
        self.buffer.position()
    }

    /// The open (not yet submitted) buffer.
    pub fn open_buffer(&self) -> &PlaybackBuffer {
        &self.buffer
    }

    pub fn scheduled_start_time(&self) -> f64 {
        self.buffer_start_time
    }

    pub fn stats(&self) -> AudioStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: AudioSink> Drop for AudioStreamScheduler<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log(LogCategory::Device, LogLevel::Warn, || {
                format!("failed to release audio device: {}", e)
            });
        }
    }
}
