use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::pmd::frame::{encode_ecg_frame, sample_period_ns, DEFAULT_SAMPLE_RATE_HZ};
use crate::pmd::RawFrame;

/// Samples per data notification the sensor sends at 130 Hz.
pub const DEFAULT_SAMPLES_PER_FRAME: usize = 73;

const R_WAVE_AMPLITUDE: f64 = 1000.0;

/// Endless source of synthetic ECG data frames at a steady heart rate.
pub struct MockSensor {
    sample_rate_hz: f64,
    heart_rate_bpm: f64,
    samples_per_frame: usize,
    start_ns: u64,
    next_sample: u64,
    noise: Option<(i16, StdRng)>,
}

impl MockSensor {
    pub fn new(sample_rate_hz: f64, heart_rate_bpm: f64) -> Self {
        Self {
            sample_rate_hz,
            heart_rate_bpm,
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            start_ns: 0,
            next_sample: 0,
            noise: None,
        }
    }

    pub fn with_samples_per_frame(mut self, samples_per_frame: usize) -> Self {
        self.samples_per_frame = samples_per_frame.max(1);
        self
    }

    pub fn with_start(mut self, start_ns: u64) -> Self {
        self.start_ns = start_ns;
        self
    }

    /// Adds uniform noise in `-amplitude..=amplitude`, reproducible per seed.
    pub fn with_noise(mut self, amplitude: i16, seed: u64) -> Self {
        self.noise = Some((amplitude.saturating_abs(), StdRng::seed_from_u64(seed)));
        self
    }

    pub fn next_frame(&mut self) -> RawFrame {
        let period_ns = sample_period_ns(self.sample_rate_hz);
        let base = self.start_ns + (self.next_sample as f64 * period_ns) as u64;
        let beat_ns = 60.0e9 / self.heart_rate_bpm;

        let mut values = Vec::with_capacity(self.samples_per_frame);
        for _ in 0..self.samples_per_frame {
            let time_ns = self.next_sample as f64 * period_ns;
            let cycle = (time_ns % beat_ns) / beat_ns;
            let mut value = ecg_waveform(cycle) * R_WAVE_AMPLITUDE;
            if let Some((amplitude, rng)) = &mut self.noise {
                if *amplitude > 0 {
                    value += f64::from(rng.gen_range(-*amplitude..=*amplitude));
                }
            }
            values.push(value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            self.next_sample += 1;
        }
        encode_ecg_frame(base, &values)
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE_HZ, 60.0)
    }
}

impl Iterator for MockSensor {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        Some(self.next_frame())
    }
}

// One P-QRS-T cycle over `cycle` in [0, 1), R-wave top of 1.0 at 0.30.
fn ecg_waveform(cycle: f64) -> f64 {
    use std::f64::consts::PI;

    if (0.10..0.20).contains(&cycle) {
        // P wave
        0.1 * (PI * (cycle - 0.10) / 0.10).sin()
    } else if (0.24..0.27).contains(&cycle) {
        // Q
        -0.1 * (cycle - 0.24) / 0.03
    } else if (0.27..0.30).contains(&cycle) {
        -0.1 + 1.1 * (cycle - 0.27) / 0.03
    } else if (0.30..0.33).contains(&cycle) {
        1.0 - 1.2 * (cycle - 0.30) / 0.03
    } else if (0.33..0.36).contains(&cycle) {
        // S back to baseline
        -0.2 + 0.2 * (cycle - 0.33) / 0.03
    } else if (0.45..0.65).contains(&cycle) {
        // T wave
        0.3 * (PI * (cycle - 0.45) / 0.20).sin()
    } else {
        0.0
    }
}
