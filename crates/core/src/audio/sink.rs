use super::{AudioError, PlaybackBuffer};

/// An output device that plays buffers at requested times on its own clock.
///
/// Submission is fire-and-forget: once [`schedule`](AudioSink::schedule)
/// returns, the device owns the buffer and plays it autonomously. Nothing is
/// reported back to the caller other than the device clock.
pub trait AudioSink {
    /// Rate the device was opened at, in Hz.
    fn sample_rate(&self) -> u32;

    /// Device clock in seconds. Stays at its starting value while suspended.
    fn current_time(&self) -> f64;

    /// Start (or restart) the device clock and playback.
    fn resume(&mut self) -> Result<(), AudioError>;

    /// Play `buffer` starting at `start_time` on the device clock. A start time
    /// in the past plays immediately.
    fn schedule(&mut self, buffer: PlaybackBuffer, start_time: f64) -> Result<(), AudioError>;

    /// Stop and release the device. Buffers already submitted may finish.
    fn close(&mut self) -> Result<(), AudioError>;

    /// Name for logs and diagnostics.
    fn name(&self) -> &str;
}

/// Record of one buffer handed to a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// Requested start on the device clock.
    pub start_time: f64,
    /// Device clock when the buffer was submitted.
    pub submitted_at: f64,
    /// Buffer contents, unless the sink was built with [`MemorySink::discarding`].
    pub buffer: Option<PlaybackBuffer>,
}

/// In-memory sink with a manually driven clock.
///
/// Used by the headless host and the tests: the caller advances the clock with
/// [`advance`](MemorySink::advance) and inspects what was scheduled.
#[derive(Debug)]
pub struct MemorySink {
    sample_rate: u32,
    now: f64,
    running: bool,
    closed: bool,
    retain_buffers: bool,
    fail_resume: bool,
    submissions: Vec<Submission>,
}

impl MemorySink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            now: 0.0,
            running: false,
            closed: false,
            retain_buffers: true,
            fail_resume: false,
            submissions: Vec::new(),
        }
    }

    /// Keep only start times, drop sample data. For long headless runs.
    pub fn discarding(sample_rate: u32) -> Self {
        Self {
            retain_buffers: false,
            ..Self::new(sample_rate)
        }
    }

    /// A sink whose `resume` fails, standing in for a missing device.
    pub fn unavailable(sample_rate: u32) -> Self {
        Self {
            fail_resume: true,
            ..Self::new(sample_rate)
        }
    }

    /// Advance the device clock. Has no effect while suspended or closed.
    pub fn advance(&mut self, seconds: f64) {
        if self.running && !self.closed {
            self.now += seconds;
        }
    }

    /// Jump the device clock to an absolute time, regardless of state.
    pub fn set_time(&mut self, seconds: f64) {
        self.now = seconds;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// All retained buffers joined in submission order, per channel.
    pub fn concatenated(&self) -> (Vec<f32>, Vec<f32>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for buffer in self.submissions.iter().filter_map(|s| s.buffer.as_ref()) {
            left.extend_from_slice(buffer.left());
            right.extend_from_slice(buffer.right());
        }
        (left, right)
    }
}

impl AudioSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.fail_resume || self.closed {
            return Err(AudioError::DeviceUnavailable(
                "memory sink cannot be started".to_string(),
            ));
        }
        self.running = true;
        Ok(())
    }

    fn schedule(&mut self, buffer: PlaybackBuffer, start_time: f64) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::Submit("memory sink is closed".to_string()));
        }
        self.submissions.push(Submission {
            start_time,
            submitted_at: self.now,
            buffer: self.retain_buffers.then_some(buffer),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.running = false;
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "Memory Sink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_frozen_until_resumed() {
        let mut sink = MemorySink::new(48_000);
        sink.advance(1.0);
        assert_eq!(sink.current_time(), 0.0);

        sink.resume().unwrap();
        sink.advance(0.25);
        assert_eq!(sink.current_time(), 0.25);
        assert!(sink.is_running());
    }

    #[test]
    fn records_submissions() {
        let mut sink = MemorySink::new(48_000);
        sink.resume().unwrap();
        sink.advance(0.5);
        sink.schedule(PlaybackBuffer::new(4), 0.75).unwrap();

        let subs = sink.submissions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].start_time, 0.75);
        assert_eq!(subs[0].submitted_at, 0.5);
        assert!(subs[0].buffer.is_some());
    }

    #[test]
    fn discarding_sink_drops_samples() {
        let mut sink = MemorySink::discarding(48_000);
        sink.schedule(PlaybackBuffer::new(4), 0.0).unwrap();
        assert!(sink.submissions()[0].buffer.is_none());
        assert_eq!(sink.concatenated().0.len(), 0);
    }

    #[test]
    fn closed_sink_rejects_work() {
        let mut sink = MemorySink::new(48_000);
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(matches!(
            sink.schedule(PlaybackBuffer::new(1), 0.0),
            Err(AudioError::Submit(_))
        ));
        assert!(matches!(sink.resume(), Err(AudioError::DeviceUnavailable(_))));
    }

    #[test]
    fn unavailable_sink_fails_resume() {
        let mut sink = MemorySink::unavailable(44_100);
        assert!(matches!(sink.resume(), Err(AudioError::DeviceUnavailable(_))));
    }
}
