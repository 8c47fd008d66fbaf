//! Smallest useful host: one second of test signal through both pipelines.
//!
//! Run with: cargo run --example headless -p emu_av_cli

use emu_av::audio::{AudioStreamScheduler, MemorySink};
use emu_av::config::{AudioConfig, VideoConfig};
use emu_av::signal::{TestSignal, TimingMode};
use emu_av::types::Size;
use emu_av::video::{FramePresenter, SoftwareSurface};

fn main() -> anyhow::Result<()> {
    let timing = TimingMode::Ntsc;
    let mut signal = TestSignal::new(44_100, timing);

    let mut audio =
        AudioStreamScheduler::initialize(MemorySink::new(44_100), AudioConfig::default())?;
    let mut video = FramePresenter::new(
        SoftwareSurface::new(Size::new(640, 480)),
        VideoConfig::default(),
    );

    for _ in 0..timing.frame_rate_hz().round() as u32 {
        audio.push(signal.next_audio())?;
        video.present_frame(signal.next_frame())?;
        audio.sink_mut().advance(timing.frame_duration());
    }

    println!(
        "Headless run: {} buffers scheduled, {} frames at {}x",
        audio.stats().buffers_submitted,
        video.frames_presented(),
        video.scale_factor()
    );
    audio.close()?;
    Ok(())
}
