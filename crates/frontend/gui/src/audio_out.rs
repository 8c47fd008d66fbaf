//! rodio-backed [`AudioSink`].
//!
//! Buffers travel to the audio thread over a channel together with the frame
//! they should start on. The audio thread mixes whatever is due and counts the
//! frames it renders; that count is the device clock the scheduler reads.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use emu_av::audio::{AudioError, AudioSink, PlaybackBuffer};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

struct Scheduled {
    start_frame: u64,
    buffer: PlaybackBuffer,
}

impl Scheduled {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.buffer.capacity() as u64
    }
}

/// Interleaved stereo source that plays scheduled buffers at their start
/// frames and silence in between.
struct ScheduledSource {
    rx: Receiver<Scheduled>,
    pending: VecDeque<Scheduled>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    frame: u64,
    right: f32,
    on_right: bool,
}

impl ScheduledSource {
    fn receive(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(mut item) => {
                    // Anything due before the current frame plays from its first sample now.
                    item.start_frame = item.start_frame.max(self.frame);
                    let at = self
                        .pending
                        .iter()
                        .position(|p| p.start_frame > item.start_frame)
                        .unwrap_or(self.pending.len());
                    self.pending.insert(at, item);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn mix_frame(&mut self) -> (f32, f32) {
        let frame = self.frame;
        while self.pending.front().is_some_and(|p| p.end_frame() <= frame) {
            self.pending.pop_front();
        }

        let (mut left, mut right) = (0.0, 0.0);
        for item in &self.pending {
            if item.start_frame > frame {
                break;
            }
            if frame < item.end_frame() {
                let i = (frame - item.start_frame) as usize;
                left += item.buffer.left()[i];
                right += item.buffer.right()[i];
            }
        }
        (left.clamp(-1.0, 1.0), right.clamp(-1.0, 1.0))
    }
}

impl Iterator for ScheduledSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.on_right {
            self.on_right = false;
            self.frame += 1;
            self.clock.store(self.frame, Ordering::Release);
            return Some(self.right);
        }

        self.receive();
        let (left, right) = self.mix_frame();
        self.right = right;
        self.on_right = true;
        Some(left)
    }
}

impl Source for ScheduledSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// The default output device, opened through rodio.
pub struct RodioSink {
    // Dropping the stream stops all output, so it lives as long as the sink.
    _stream: OutputStream,
    _handle: OutputStreamHandle,
    player: Sink,
    tx: Sender<Scheduled>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    closed: bool,
}

impl RodioSink {
    /// Open the default output device, suspended.
    pub fn open(sample_rate: u32) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        let player =
            Sink::try_new(&handle).map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        player.pause();

        let (tx, rx) = channel();
        let clock = Arc::new(AtomicU64::new(0));
        player.append(ScheduledSource {
            rx,
            pending: VecDeque::new(),
            clock: Arc::clone(&clock),
            sample_rate,
            frame: 0,
            right: 0.0,
            on_right: false,
        });

        log::info!("opened default audio output at {} Hz", sample_rate);
        Ok(Self {
            _stream: stream,
            _handle: handle,
            player,
            tx,
            clock,
            sample_rate,
            closed: false,
        })
    }

    /// Frames rendered by the audio thread so far.
    pub fn frames_played(&self) -> u64 {
        self.clock.load(Ordering::Acquire)
    }
}

impl AudioSink for RodioSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.frames_played() as f64 / self.sample_rate as f64
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::DeviceUnavailable(
                "audio output already closed".to_string(),
            ));
        }
        self.player.play();
        Ok(())
    }

    fn schedule(&mut self, buffer: PlaybackBuffer, start_time: f64) -> Result<(), AudioError> {
        let start_frame = (start_time.max(0.0) * self.sample_rate as f64).round() as u64;
        self.tx
            .send(Scheduled {
                start_frame,
                buffer,
            })
            .map_err(|_| AudioError::Submit("audio thread has stopped".to_string()))
    }

    fn close(&mut self) -> Result<(), AudioError> {
        if !self.closed {
            self.closed = true;
            self.player.stop();
            log::info!("closed audio output after {} frames", self.frames_played());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rodio output"
    }
}
