//! Synthetic engine output: a stereo tone and SMPTE-style color bars.
//!
//! Stands in for an emulation core when driving the hosts, benches and tests.
//! Audio comes out in irregular chunks whose total still tracks the nominal
//! sample rate, the way a real core's APU output does.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::types::{PixelFrame, SampleBlock, Size};

/// Video region timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    /// NTSC (North America, Japan)
    #[default]
    Ntsc,
    /// PAL (Europe, Australia)
    Pal,
}

impl TimingMode {
    /// Frame rate in Hz.
    pub fn frame_rate_hz(&self) -> f64 {
        match self {
            TimingMode::Ntsc => 60.0988,
            TimingMode::Pal => 50.0070,
        }
    }

    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate_hz()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ntsc" => Some(TimingMode::Ntsc),
            "pal" => Some(TimingMode::Pal),
            _ => None,
        }
    }
}

const BARS: [[u8; 4]; 8] = [
    [235, 235, 235, 255],
    [235, 235, 16, 255],
    [16, 235, 235, 255],
    [16, 235, 16, 255],
    [235, 16, 235, 255],
    [235, 16, 16, 255],
    [16, 16, 235, 255],
    [16, 16, 16, 255],
];

const MARKER: [u8; 4] = [255, 255, 255, 255];

/// Deterministic tone + color bar generator.
pub struct TestSignal {
    sample_rate: u32,
    timing: TimingMode,
    tone_hz: f64,
    amplitude: f32,
    phase: f64,
    /// Fractional samples owed to (positive) or borrowed from (negative)
    /// the next block.
    sample_debt: f64,
    /// Maximum relative deviation of a block from its nominal length.
    jitter: f64,
    rng: StdRng,
    resolutions: Vec<Size>,
    switch_every: Option<u64>,
    frame_index: u64,
    samples_generated: u64,
    left: Vec<f32>,
    right: Vec<f32>,
    pixels: Vec<u8>,
}

impl TestSignal {
    /// 440 Hz tone, 256x224 bars, 25% block-size jitter.
    pub fn new(sample_rate: u32, timing: TimingMode) -> Self {
        Self {
            sample_rate,
            timing,
            tone_hz: 440.0,
            amplitude: 0.25,
            phase: 0.0,
            sample_debt: 0.0,
            jitter: 0.25,
            rng: StdRng::seed_from_u64(0x5EED),
            resolutions: vec![Size::new(256, 224)],
            switch_every: None,
            frame_index: 0,
            samples_generated: 0,
            left: Vec::new(),
            right: Vec::new(),
            pixels: Vec::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_tone(mut self, hz: f64, amplitude: f32) -> Self {
        self.tone_hz = hz;
        self.amplitude = amplitude;
        self
    }

    /// Block sizes vary by up to `fraction` of the nominal per-frame count.
    /// Zero gives perfectly regular blocks.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction.clamp(0.0, 1.0);
        self
    }

    /// Cycle through `resolutions`, switching every `frames` frames.
    /// Empty sizes are skipped.
    pub fn with_resolutions(mut self, mut resolutions: Vec<Size>, frames: u64) -> Self {
        resolutions.retain(|size| !size.is_empty());
        if !resolutions.is_empty() {
            self.resolutions = resolutions;
        }
        self.switch_every = (frames > 0).then_some(frames);
        self
    }

    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    /// Resolution the next call to [`next_frame`](Self::next_frame) will use.
    pub fn resolution(&self) -> Size {
        let slot = match self.switch_every {
            Some(every) => (self.frame_index / every) as usize % self.resolutions.len(),
            None => 0,
        };
        self.resolutions[slot]
    }

    /// Audio for one frame of emulated time.
    pub fn next_audio(&mut self) -> SampleBlock<'_> {
        let nominal = self.sample_rate as f64 / self.timing.frame_rate_hz();
        let wobble = if self.jitter > 0.0 {
            self.rng.gen_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        let owed = nominal + self.sample_debt;
        let count = (nominal * (1.0 + wobble) + self.sample_debt).round().max(0.0);
        self.sample_debt = owed - count;
        let count = count as usize;

        self.left.clear();
        self.right.clear();
        let step = std::f64::consts::TAU * self.tone_hz / self.sample_rate as f64;
        for _ in 0..count {
            let s = self.phase.sin() as f32 * self.amplitude;
            self.left.push(s);
            self.right.push(s * 0.5);
            self.phase = (self.phase + step) % std::f64::consts::TAU;
        }
        self.samples_generated += count as u64;

        SampleBlock::from_lockstep(&self.left, &self.right)
    }

    /// The next video frame: eight vertical bars with a marker column that
    /// walks one pixel to the right per frame.
    pub fn next_frame(&mut self) -> PixelFrame<'_> {
        let size = self.resolution();
        let width = size.width as usize;
        let marker = (self.frame_index % size.width as u64) as usize;

        self.pixels.clear();
        self.pixels.reserve(size.area() * PixelFrame::BYTES_PER_PIXEL);
        for _ in 0..size.height {
            for x in 0..width {
                let color = if x == marker {
                    MARKER
                } else {
                    BARS[x * BARS.len() / width]
                };
                self.pixels.extend_from_slice(&color);
            }
        }
        self.frame_index += 1;

        PixelFrame::from_sized(&self.pixels, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rates() {
        assert!((TimingMode::Ntsc.frame_rate_hz() - 60.0988).abs() < 1e-9);
        assert!((TimingMode::Pal.frame_rate_hz() - 50.007).abs() < 1e-9);
        assert_eq!(TimingMode::from_name("PAL"), Some(TimingMode::Pal));
        assert_eq!(TimingMode::from_name("secam"), None);
    }

    #[test]
    fn irregular_blocks_track_nominal_rate() {
        let mut signal = TestSignal::new(48_000, TimingMode::Ntsc);
        let mut sizes = Vec::new();
        for _ in 0..600 {
            sizes.push(signal.next_audio().len());
        }
        sizes.sort_unstable();
        sizes.dedup();
        assert!(sizes.len() > 10, "block sizes should vary: {:?}", sizes);

        // The running total never strays further than one jittered block.
        let nominal = 48_000.0 / 60.0988;
        let drift = signal.samples_generated() as f64 - 600.0 * nominal;
        assert!(drift.abs() <= nominal * 0.25 + 1.0, "drifted by {drift} samples");
    }

    #[test]
    fn regular_blocks_without_jitter() {
        let mut signal = TestSignal::new(50_007, TimingMode::Pal).with_jitter(0.0);
        for _ in 0..10 {
            assert_eq!(signal.next_audio().len(), 1000);
        }
    }

    #[test]
    fn same_seed_same_output() {
        let mut a = TestSignal::new(44_100, TimingMode::Ntsc).with_seed(7);
        let mut b = TestSignal::new(44_100, TimingMode::Ntsc).with_seed(7);
        for _ in 0..20 {
            assert_eq!(a.next_audio().left(), b.next_audio().left());
        }
    }

    #[test]
    fn frames_have_bars_and_marker() {
        let mut signal = TestSignal::new(44_100, TimingMode::Ntsc);
        let frame = signal.next_frame();
        assert_eq!(frame.size(), Size::new(256, 224));
        let px = |x: usize| &frame.pixels()[x * 4..x * 4 + 4];
        assert_eq!(px(0), MARKER);
        assert_eq!(px(1), BARS[0]);
        assert_eq!(px(255), BARS[7]);

        let frame = signal.next_frame();
        assert_eq!(&frame.pixels()[4..8], MARKER);
    }

    #[test]
    fn empty_resolutions_are_skipped() {
        let sizes = vec![Size::new(0, 8), Size::new(4, 2), Size::new(8, 0)];
        let mut signal = TestSignal::new(44_100, TimingMode::Ntsc).with_resolutions(sizes, 1);
        for _ in 0..4 {
            let frame = signal.next_frame();
            assert_eq!(frame.size(), Size::new(4, 2));
            assert_eq!(frame.pixels().len(), 4 * 2 * 4);
        }

        let mut signal =
            TestSignal::new(44_100, TimingMode::Ntsc).with_resolutions(vec![Size::new(0, 0)], 1);
        assert_eq!(signal.next_frame().size(), Size::new(256, 224));
    }

    #[test]
    fn resolution_cycles() {
        let sizes = vec![Size::new(8, 8), Size::new(16, 4)];
        let mut signal = TestSignal::new(44_100, TimingMode::Ntsc).with_resolutions(sizes, 2);
        let seen: Vec<Size> = (0..6).map(|_| signal.next_frame().size()).collect();
        assert_eq!(
            seen,
            vec![
                Size::new(8, 8),
                Size::new(8, 8),
                Size::new(16, 4),
                Size::new(16, 4),
                Size::new(8, 8),
                Size::new(8, 8),
            ]
        );
    }
}
