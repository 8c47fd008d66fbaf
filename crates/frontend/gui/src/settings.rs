use emu_av::config::{AudioConfig, VideoConfig};
use emu_av::signal::TimingMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub window_width: usize,
    pub window_height: usize,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub timing: TimingMode,
    /// Level for the core's category logger ("off", "warn", "debug", ...).
    #[serde(default = "default_core_log_level")]
    pub core_log_level: String,
}

fn default_core_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_width: 512,  // 256 * 2
            window_height: 448, // 224 * 2
            audio: AudioConfig::default(),
            video: VideoConfig::default(),
            timing: TimingMode::default(),
            core_log_level: default_core_log_level(),
        }
    }
}

impl Settings {
    /// Get the config file path relative to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load settings from config.json, falling back to defaults on error
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            // Missing file is the normal first-run case.
            Err(_) => Self::default(),
        }
    }

    /// Save settings to config.json immediately
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
