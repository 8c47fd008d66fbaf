use emu_av::audio::AudioStreamScheduler;
use emu_av::logging::{LogConfig, LogLevel};
use emu_av::signal::{TestSignal, TimingMode};
use emu_av::types::Size;
use emu_av::video::FramePresenter;
use emu_av_gui::audio_out::RodioSink;
use emu_av_gui::settings::Settings;
use emu_av_gui::window::WindowSurface;
use minifb::Key;
use std::env;
use std::process::ExitCode;
use std::time::{Duration, Instant};

/// Resolutions the test signal cycles through with `--cycle-resolutions`.
const CYCLE: [Size; 3] = [
    Size::new(256, 224),
    Size::new(256, 240),
    Size::new(512, 448),
];

fn main() -> ExitCode {
    env_logger::init();

    let mut settings = Settings::load();
    let mut cycle_resolutions = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--cycle-resolutions" => cycle_resolutions = true,
            other => match TimingMode::from_name(other.trim_start_matches("--")) {
                Some(mode) => settings.timing = mode,
                None => log::warn!("ignoring unknown argument {}", other),
            },
        }
    }

    match LogLevel::from_str(&settings.core_log_level) {
        Some(level) => LogConfig::global().set_global_level(level),
        None => log::warn!("unknown core log level {:?}", settings.core_log_level),
    }

    let window = match WindowSurface::open(
        "emu-av",
        Size::new(settings.window_width as u32, settings.window_height as u32),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut presenter = FramePresenter::new(window, settings.video);

    let sink = match RodioSink::open(settings.audio.sample_rate) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut audio = match AudioStreamScheduler::initialize(sink, settings.audio) {
        Ok(a) => a,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut signal = TestSignal::new(settings.audio.sample_rate, settings.timing);
    if cycle_resolutions {
        let every = (settings.timing.frame_rate_hz() * 5.0) as u64;
        signal = signal.with_resolutions(CYCLE.to_vec(), every);
    }

    let frame_budget = Duration::from_secs_f64(settings.timing.frame_duration());
    let mut last_frame = Instant::now();
    let mut frame_times: Vec<Duration> = Vec::with_capacity(60);
    let mut paused = false;

    while presenter.surface().is_open() && !presenter.surface().is_key_down(Key::Escape) {
        if presenter.surface().is_key_pressed(Key::P) {
            paused = !paused;
            if paused {
                log::info!("paused");
                presenter.surface_mut().set_status("paused");
            } else {
                // The device kept playing silence; start over from its clock.
                audio.resync();
                log::info!("resumed");
            }
        }

        if paused {
            presenter.surface_mut().pump();
            std::thread::sleep(frame_budget);
            last_frame = Instant::now();
            continue;
        }

        // Frames are paced by the audio device clock, not the wall clock.
        let wait = audio.until_sync();
        if wait > 0.0 {
            presenter.surface_mut().pump();
            std::thread::sleep(Duration::from_secs_f64(wait).min(frame_budget));
            continue;
        }

        presenter.surface_mut().sync_size();

        if let Err(e) = audio.push(signal.next_audio()) {
            log::error!("audio output failed: {}", e);
            break;
        }
        if let Err(e) = presenter.present_frame(signal.next_frame()) {
            log::error!("presentation failed: {}", e);
            break;
        }

        frame_times.push(last_frame.elapsed());
        last_frame = Instant::now();

        if frame_times.len() == 60 {
            let total: Duration = frame_times.iter().sum();
            let fps = frame_times.len() as f64 / total.as_secs_f64();
            let stats = audio.stats();
            let status = format!(
                "{:.1} fps, {}x, {} resyncs",
                fps,
                presenter.scale_factor(),
                stats.late_resyncs + stats.ahead_resyncs
            );
            presenter.surface_mut().set_status(&status);
            frame_times.clear();
        }
    }

    let size = presenter.surface().window_size();
    if size.width as usize != settings.window_width || size.height as usize != settings.window_height
    {
        settings.window_width = size.width as usize;
        settings.window_height = size.height as usize;
        if let Err(e) = settings.save() {
            log::warn!("failed to save window size: {}", e);
        }
    }

    if let Err(e) = audio.close() {
        log::warn!("failed to close audio output: {}", e);
    }
    log::info!(
        "presented {} frames, audio {:?}",
        presenter.frames_presented(),
        audio.stats()
    );
    ExitCode::SUCCESS
}
