//! Tunables for the audio scheduler and the frame presenter.
//!
//! Both structs deserialize with `#[serde(default)]`, so a settings file only
//! needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::audio::AudioError;
use crate::types::Size;

/// Frames per channel in one playback buffer.
pub const DEFAULT_BUFFER_FRAMES: usize = 8192;

/// Maximum distance, in seconds, between the scheduled start of the next
/// buffer and the device clock before the schedule snaps back to "now".
pub const DEFAULT_DESYNC_TOLERANCE: f64 = 0.5;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz; the sink must be opened at this rate.
    pub sample_rate: u32,
    /// Capacity of each playback buffer, in stereo frames.
    pub buffer_frames: usize,
    /// Resynchronization threshold in seconds.
    pub desync_tolerance: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            desync_tolerance: DEFAULT_DESYNC_TOLERANCE,
        }
    }
}

impl AudioConfig {
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Duration of one full playback buffer in seconds.
    pub fn buffer_duration(&self) -> f64 {
        self.buffer_frames as f64 / self.sample_rate as f64
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidConfig("sample rate must be non-zero"));
        }
        if self.buffer_frames == 0 {
            return Err(AudioError::InvalidConfig("buffer must hold at least one frame"));
        }
        if !self.desync_tolerance.is_finite() || self.desync_tolerance <= 0.0 {
            return Err(AudioError::InvalidConfig(
                "desync tolerance must be a positive number of seconds",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Upper bound for the integer scale factor (`None` = fit the viewport).
    pub max_scale: Option<u32>,
    /// RGBA color used for the area around the scaled image.
    pub border_color: [u8; 4],
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_scale: None,
            border_color: [0, 0, 0, 0xFF],
        }
    }
}

impl VideoConfig {
    /// Scale factor for `source` inside `viewport`, honoring `max_scale`.
    pub fn scale_for(&self, source: Size, viewport: Size) -> u32 {
        let fit = crate::video::integer_scale(source, viewport);
        match self.max_scale {
            Some(cap) => fit.min(cap.max(1)),
            None => fit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_defaults_match_reference_constants() {
        let cfg = AudioConfig::default();
        assert_eq!(cfg.buffer_frames, 8192);
        assert_eq!(cfg.desync_tolerance, 0.5);
        assert!(cfg.validate().is_ok());
        assert!((cfg.buffer_duration() - 8192.0 / 44_100.0).abs() < 1e-12);
    }

    #[test]
    fn audio_validation_rejects_nonsense() {
        let zero_rate = AudioConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(zero_rate.validate().is_err());

        let zero_buf = AudioConfig {
            buffer_frames: 0,
            ..Default::default()
        };
        assert!(zero_buf.validate().is_err());

        let nan = AudioConfig {
            desync_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: AudioConfig = serde_json::from_str(r#"{ "buffer_frames": 4096 }"#).unwrap();
        assert_eq!(cfg.buffer_frames, 4096);
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);

        let video: VideoConfig = serde_json::from_str(r#"{ "max_scale": 3 }"#).unwrap();
        assert_eq!(video.max_scale, Some(3));
        assert_eq!(video.border_color, [0, 0, 0, 0xFF]);
    }

    #[test]
    fn max_scale_caps_fit() {
        let cfg = VideoConfig {
            max_scale: Some(2),
            ..Default::default()
        };
        assert_eq!(cfg.scale_for(Size::new(256, 224), Size::new(1024, 900)), 2);

        let zero_cap = VideoConfig {
            max_scale: Some(0),
            ..Default::default()
        };
        assert_eq!(zero_cap.scale_for(Size::new(256, 224), Size::new(1024, 900)), 1);
    }
}
