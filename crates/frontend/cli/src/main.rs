use anyhow::{Context, Result};
use clap::Parser;
use emu_av::audio::{AudioSink, AudioStats, AudioStreamScheduler, MemorySink};
use emu_av::config::{AudioConfig, VideoConfig};
use emu_av::logging::{LogConfig, LogLevel};
use emu_av::signal::{TestSignal, TimingMode};
use emu_av::types::{Point, Size};
use emu_av::video::{FramePresenter, SoftwareSurface};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Run the audio/video pipeline headless against a simulated device clock.
#[derive(Parser, Debug)]
struct Args {
    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Frame timing: "ntsc" or "pal"
    #[arg(long, default_value = "ntsc", value_parser = parse_timing)]
    timing: TimingMode,

    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// Playback buffer capacity in stereo frames
    #[arg(long, default_value_t = 8192)]
    buffer_frames: usize,

    /// Desync tolerance in seconds
    #[arg(long, default_value_t = 0.5)]
    tolerance: f64,

    /// Display viewport, WIDTHxHEIGHT
    #[arg(long, default_value = "1024x900", value_parser = parse_size)]
    viewport: Size,

    /// Upper bound for the integer scale factor
    #[arg(long)]
    max_scale: Option<u32>,

    /// Device clock speed relative to emulated time (1.0 = in step).
    /// Ignored with --audio-sync
    #[arg(long, default_value_t = 1.0)]
    clock_ratio: f64,

    /// Wait for the device clock before each frame instead of stepping it
    /// by one frame duration
    #[arg(long, default_value_t = false)]
    audio_sync: bool,

    /// Stall the producer before this frame while the device keeps playing
    #[arg(long)]
    stall_at: Option<u64>,

    /// Length of the stall in milliseconds
    #[arg(long, default_value_t = 1000)]
    stall_ms: u64,

    /// Switch test signal resolution every N frames
    #[arg(long)]
    cycle_resolutions: Option<u64>,

    /// Seed for the irregular audio block sizes
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Write the final display surface to this PNG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Core log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Core log messages allowed per category per second
    #[arg(long, default_value_t = 60)]
    log_rate_limit: usize,

    /// Append core log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print nothing; only write --snapshot
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn parse_timing(s: &str) -> Result<TimingMode, String> {
    TimingMode::from_name(s).ok_or_else(|| format!("expected \"ntsc\" or \"pal\", got {:?}", s))
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
    let width = w.trim().parse().map_err(|e| format!("bad width {:?}: {}", w, e))?;
    let height = h.trim().parse().map_err(|e| format!("bad height {:?}: {}", h, e))?;
    Ok(Size::new(width, height))
}

const CYCLE: [Size; 3] = [
    Size::new(256, 224),
    Size::new(256, 240),
    Size::new(160, 144),
];

#[derive(Debug, Serialize)]
struct AudioReport {
    sample_rate: u32,
    buffer_frames: usize,
    samples_generated: u64,
    pending_frames: usize,
    device_time: f64,
    emulated_time: f64,
    queued_duration: f64,
    stats: AudioStats,
}

#[derive(Debug, Serialize)]
struct VideoReport {
    viewport: Size,
    source: Option<Size>,
    scale: u32,
    origin: Point,
    frames_presented: u64,
    layout_changes: u64,
}

#[derive(Debug, Serialize)]
struct Report {
    frames: u64,
    timing: TimingMode,
    audio: AudioReport,
    video: VideoReport,
}

struct Session {
    audio: AudioStreamScheduler<MemorySink>,
    presenter: FramePresenter<SoftwareSurface>,
}

fn run(args: &Args) -> Result<(Report, Session)> {
    let audio_config = AudioConfig {
        sample_rate: args.sample_rate,
        buffer_frames: args.buffer_frames,
        desync_tolerance: args.tolerance,
    };
    let video_config = VideoConfig {
        max_scale: args.max_scale,
        ..VideoConfig::default()
    };

    let sink = MemorySink::discarding(args.sample_rate);
    let mut audio = AudioStreamScheduler::initialize(sink, audio_config)
        .context("Failed to start audio output")?;
    let mut presenter = FramePresenter::new(SoftwareSurface::new(args.viewport), video_config);

    let mut signal = TestSignal::new(args.sample_rate, args.timing).with_seed(args.seed);
    if let Some(every) = args.cycle_resolutions {
        signal = signal.with_resolutions(CYCLE.to_vec(), every);
    }

    let frame = args.timing.frame_duration();
    for fnum in 0..args.frames {
        if args.stall_at == Some(fnum) {
            audio.sink_mut().advance(args.stall_ms as f64 / 1000.0);
        }
        if args.audio_sync {
            let wait = audio.until_sync();
            audio.sink_mut().advance(wait);
        }

        audio
            .push(signal.next_audio())
            .with_context(|| format!("Audio push failed at frame {}", fnum))?;
        presenter
            .present_frame(signal.next_frame())
            .with_context(|| format!("Present failed at frame {}", fnum))?;

        if !args.audio_sync {
            audio.sink_mut().advance(frame * args.clock_ratio);
        }
    }

    let report = Report {
        frames: args.frames,
        timing: args.timing,
        audio: AudioReport {
            sample_rate: audio.sample_rate(),
            buffer_frames: audio.config().buffer_frames,
            samples_generated: signal.samples_generated(),
            pending_frames: audio.buffer_position(),
            device_time: audio.sink().current_time(),
            emulated_time: args.frames as f64 * frame,
            queued_duration: audio.queued_duration(),
            stats: audio.stats(),
        },
        video: VideoReport {
            viewport: presenter.viewport(),
            source: presenter.source_size(),
            scale: presenter.scale_factor(),
            origin: presenter.origin(),
            frames_presented: presenter.frames_presented(),
            layout_changes: presenter.layout_changes(),
        },
    };
    Ok((
        report,
        Session { audio, presenter },
    ))
}

fn write_snapshot(surface: &SoftwareSurface, path: &Path) -> Result<()> {
    let size = surface.size();
    let file = File::create(path).context("Failed to create snapshot file")?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), size.width, size.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    writer
        .write_image_data(surface.pixels())
        .context("Failed to write PNG data")?;
    Ok(())
}

fn configure_logging(args: &Args) -> Result<()> {
    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("Unknown log level {:?}", args.log_level))?;
    let config = LogConfig::global();
    config.set_global_level(level);
    config.set_rate_limit(args.log_rate_limit);
    if let Some(path) = &args.log_file {
        config
            .set_log_file(path.clone())
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    configure_logging(&args)?;

    let (report, mut session) = run(&args)?;
    session.audio.close()?;

    if let Some(path) = &args.snapshot {
        write_snapshot(session.presenter.surface(), path)?;
        log::info!("snapshot written to {}", path.display());
    }

    if !args.quiet {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
