use slog::{debug, o, warn, Logger};

use crate::analysis::hr::{self, BeatInterval};
use crate::analysis::peaks::{self, Peak, ThresholdMode};
use crate::error::ConfigError;
use crate::pmd::frame::DEFAULT_SAMPLE_RATE_HZ;
use crate::storage::Snapshot;

/// Separation enforced between two R-peaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MinDistance {
    Fixed(usize),
    /// Derived from the highest heart rate to accept.
    MaxBpm(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub sample_rate_hz: f64,
    pub threshold_fraction: f64,
    pub threshold_mode: ThresholdMode,
    pub min_distance: MinDistance,
}

impl Parameters {
    /// Live display: fixed 100-sample separation.
    pub fn live() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            threshold_fraction: 0.75,
            threshold_mode: ThresholdMode::Relative,
            min_distance: MinDistance::Fixed(100),
        }
    }

    /// Whole-recording analysis: separation derived from 100 bpm.
    pub fn offline() -> Self {
        Self {
            min_distance: MinDistance::MaxBpm(100.0),
            ..Self::live()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate_hz));
        }
        if !(self.threshold_fraction > 0.0 && self.threshold_fraction <= 1.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold_fraction));
        }
        if let MinDistance::MaxBpm(bpm) = self.min_distance {
            if !(bpm.is_finite() && bpm > 0.0) {
                return Err(ConfigError::InvalidMaxBpm(bpm));
            }
        }
        Ok(())
    }

    pub fn min_distance_samples(&self) -> usize {
        match self.min_distance {
            MinDistance::Fixed(samples) => samples,
            MinDistance::MaxBpm(bpm) => (self.sample_rate_hz * 60.0 / bpm) as usize,
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::live()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    pub peaks: Vec<Peak>,
    pub intervals: Vec<BeatInterval>,
}

/// Peak detection and heart rate over a whole snapshot, recomputed on every call.
pub struct Analysis {
    params: Parameters,
    min_distance: usize,
    log: Logger,
}

impl Analysis {
    pub fn new(params: Parameters, log: &Logger) -> Result<Self, ConfigError> {
        params.validate()?;
        let min_distance = params.min_distance_samples();
        let log = log.new(o!("min_distance" => min_distance));
        Ok(Self {
            params,
            min_distance,
            log,
        })
    }

    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    /// Failed detection or too few peaks leave the corresponding list empty.
    pub fn analyze(&self, snapshot: &Snapshot) -> Results {
        let peaks = match peaks::detect_with_mode(
            snapshot.timestamps.view(),
            snapshot.values.view(),
            self.min_distance,
            self.params.threshold_fraction,
            self.params.threshold_mode,
        ) {
            Ok(peaks) => peaks,
            Err(e) => {
                debug!(self.log, "peak detection skipped"; "samples" => snapshot.len(), "reason" => %e);
                Vec::new()
            }
        };

        let intervals = hr::estimate(&peaks).unwrap_or_default();
        for interval in intervals.iter().filter(|i| i.interval_ns == 0) {
            if interval.timestamps_reversed() {
                warn!(self.log, "timestamps went backwards between beats";
                    "start_ns" => interval.start.timestamp_ns, "end_ns" => interval.end.timestamp_ns);
            } else {
                warn!(self.log, "zero length beat interval"; "timestamp_ns" => interval.start.timestamp_ns);
            }
        }
        debug!(self.log, "analysis done";
            "samples" => snapshot.len(), "peaks" => peaks.len(), "intervals" => intervals.len());

        Results { peaks, intervals }
    }
}
