//! Category-based logging for the playback and presentation pipeline.
//!
//! The audio scheduler and frame presenter run inside tight per-frame loops, so
//! logging here is built around three rules:
//!
//! - **Lazy**: messages are closures, formatted only when the category/level is
//!   enabled.
//! - **Bounded**: each category has a sliding one-second window; messages above
//!   the limit are dropped and summarized once per second.
//! - **Non-blocking file output**: when a log file is configured, lines go to a
//!   background writer thread through a channel.
//!
//! Everything is off by default. Hosts switch categories on with
//! [`LogConfig::set_level`] or [`LogConfig::set_global_level`].
//!
//! ```rust
//! use emu_av::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Audio, LogLevel::Debug, || {
//!     format!("resync: scheduled {:.3}s, device {:.3}s", 1.25, 1.75)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Verbosity, ordered from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Off,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Parse a level name or digit, case-insensitively.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(LogLevel::Off)
    }
}

/// Pipeline area a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Sample intake, buffer rotation, drift correction
    Audio,
    /// Frame intake, scale/layout changes
    Video,
    /// Output device and display surface lifecycle
    Device,
    /// Settings loading and validation
    Config,
}

impl LogCategory {
    pub const COUNT: usize = 4;

    pub const ALL: [LogCategory; Self::COUNT] = [
        LogCategory::Audio,
        LogCategory::Video,
        LogCategory::Device,
        LogCategory::Config,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Audio => 0,
            LogCategory::Video => 1,
            LogCategory::Device => 2,
            LogCategory::Config => 3,
        }
    }
}

/// Per-category bookkeeping for the rate limiter.
#[derive(Default)]
struct Window {
    stamps: VecDeque<Instant>,
    dropped: usize,
    last_report: Option<Instant>,
}

/// Sliding-window limiter: at most `max_per_second` messages per category.
struct RateLimiter {
    max_per_second: AtomicUsize,
    span: Duration,
    windows: Mutex<[Window; LogCategory::COUNT]>,
}

/// Outcome of a rate limit check.
#[derive(Debug, PartialEq, Eq)]
struct Admission {
    allowed: bool,
    /// Number of suppressed messages to report now, if any.
    report_dropped: Option<usize>,
}

impl RateLimiter {
    fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second: AtomicUsize::new(max_per_second),
            span: Duration::from_secs(1),
            windows: Mutex::new(Default::default()),
        }
    }

    fn set_max_per_second(&self, max: usize) {
        self.max_per_second.store(max, Ordering::Relaxed);
    }

    fn max_per_second(&self) -> usize {
        self.max_per_second.load(Ordering::Relaxed)
    }

    fn admit(&self, category: LogCategory) -> Admission {
        self.admit_at(category, Instant::now())
    }

    fn admit_at(&self, category: LogCategory, now: Instant) -> Admission {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let w = &mut windows[category.index()];

        while let Some(&front) = w.stamps.front() {
            if now.duration_since(front) > self.span {
                w.stamps.pop_front();
            } else {
                break;
            }
        }

        if w.stamps.len() < self.max_per_second() {
            w.stamps.push_back(now);
            let report_dropped = if w.dropped > 0 {
                let n = std::mem::take(&mut w.dropped);
                w.last_report = Some(now);
                Some(n)
            } else {
                None
            };
            return Admission {
                allowed: true,
                report_dropped,
            };
        }

        w.dropped += 1;
        let due = w
            .last_report
            .map_or(true, |last| now.duration_since(last) >= self.span);
        let report_dropped = if due {
            w.last_report = Some(now);
            Some(std::mem::take(&mut w.dropped))
        } else {
            None
        };
        Admission {
            allowed: false,
            report_dropped,
        }
    }
}

/// Process-wide logging switches.
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; LogCategory::COUNT],
    file_sender: Mutex<Option<Sender<String>>>,
    file_enabled: AtomicBool,
    limiter: RateLimiter,
}

impl LogConfig {
    /// Everything off, 60 messages per second per category.
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            file_sender: Mutex::new(None),
            file_enabled: AtomicBool::new(false),
            limiter: RateLimiter::new(60),
        }
    }

    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn get_global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    /// Override the level for one category. `Off` means "use the global level".
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn get_level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        let effective = match self.get_level(category) {
            LogLevel::Off => self.get_global_level(),
            specific => specific,
        };
        level <= effective
    }

    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_per_second: usize) {
        self.limiter.set_max_per_second(max_per_second);
    }

    pub fn get_rate_limit(&self) -> usize {
        self.limiter.max_per_second()
    }

    /// Append log lines to `path` from a background writer thread.
    ///
    /// Replaces any previously configured file; the old writer exits once its
    /// channel is dropped.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("emu-av-log".to_string())
            .spawn(move || {
                for line in receiver {
                    let _ = writeln!(file, "{}", line);
                    let _ = file.flush();
                }
            })?;

        *lock_or_recover(&self.file_sender) = Some(sender);
        self.file_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn clear_log_file(&self) {
        *lock_or_recover(&self.file_sender) = None;
        self.file_enabled.store(false, Ordering::Relaxed);
    }

    fn write_line(&self, line: String) {
        if self.file_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = lock_or_recover(&self.file_sender).as_ref() {
                if let Err(failed) = sender.send(line) {
                    eprintln!("{}", failed.0);
                }
                return;
            }
        }
        eprintln!("{}", line);
    }
}

fn lock_or_recover<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Emit a message if `category` is enabled at `level` and under its rate limit.
///
/// `message_fn` only runs when the message will actually be written.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let admission = config.limiter.admit(category);
    if let Some(dropped) = admission.report_dropped.filter(|&n| n > 0) {
        config.write_line(format!(
            "[{:?}] rate limit exceeded, {} message(s) dropped",
            category, dropped
        ));
    }
    if admission.allowed {
        config.write_line(format!("[{:?}] {}", category, message_fn()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(LogLevel::from_str("OFF"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("none"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("err"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_str("Warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str(" info "), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("4"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_str("loud"), None);
    }

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn category_level_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Audio, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Audio, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Audio, LogLevel::Trace));
        assert!(config.should_log(LogCategory::Video, LogLevel::Error));
        assert!(!config.should_log(LogCategory::Video, LogLevel::Warn));
    }

    #[test]
    fn off_is_never_logged() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::Device, LogLevel::Off));
    }

    #[test]
    fn reset_turns_everything_off() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        config.set_level(LogCategory::Video, LogLevel::Info);
        config.reset();

        assert_eq!(config.get_global_level(), LogLevel::Off);
        for category in LogCategory::ALL {
            assert_eq!(config.get_level(category), LogLevel::Off);
        }
    }

    #[test]
    fn limiter_blocks_over_limit_per_category() {
        let limiter = RateLimiter::new(5);
        let t0 = Instant::now();
        for _ in 0..5 {
            assert!(limiter.admit_at(LogCategory::Audio, t0).allowed);
        }
        assert!(!limiter.admit_at(LogCategory::Audio, t0).allowed);
        assert!(limiter.admit_at(LogCategory::Video, t0).allowed);
    }

    #[test]
    fn limiter_window_slides_and_reports_drops() {
        let limiter = RateLimiter::new(2);
        let t0 = Instant::now();
        limiter.admit_at(LogCategory::Audio, t0);
        limiter.admit_at(LogCategory::Audio, t0);

        // First drop is reported immediately, later ones are accumulated.
        let first = limiter.admit_at(LogCategory::Audio, t0);
        assert_eq!(
            first,
            Admission {
                allowed: false,
                report_dropped: Some(1)
            }
        );
        for _ in 0..3 {
            let a = limiter.admit_at(LogCategory::Audio, t0);
            assert!(!a.allowed);
            assert_eq!(a.report_dropped, None);
        }

        let later = t0 + Duration::from_millis(1100);
        let a = limiter.admit_at(LogCategory::Audio, later);
        assert!(a.allowed);
        assert_eq!(a.report_dropped, Some(3));
    }

    #[test]
    fn rate_limit_is_adjustable() {
        let config = LogConfig::new();
        assert_eq!(config.get_rate_limit(), 60);
        config.set_rate_limit(10);
        assert_eq!(config.get_rate_limit(), 10);
    }
}
