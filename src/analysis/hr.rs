use crate::analysis::peaks::Peak;
use crate::error::AnalysisError;

const NANOS_PER_MINUTE: f64 = 60.0 * 1.0e9;

/// Time between two consecutive R-peaks and the instantaneous heart rate it implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatInterval {
    pub start: Peak,
    pub end: Peak,
    pub interval_ns: u64,
    pub bpm: f64,
}

impl BeatInterval {
    /// A zero interval gives an infinite rate. An end earlier than the start
    /// also yields a zero interval, see `timestamps_reversed`.
    pub fn between(start: Peak, end: Peak) -> Self {
        let interval_ns = end.timestamp_ns.saturating_sub(start.timestamp_ns);
        Self {
            start,
            end,
            interval_ns,
            bpm: NANOS_PER_MINUTE / interval_ns as f64,
        }
    }

    /// Timestamps went backwards between the two peaks, as after a sensor restart.
    pub fn timestamps_reversed(&self) -> bool {
        self.end.timestamp_ns < self.start.timestamp_ns
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ns as f64 / 1.0e6
    }

    /// Where the interval's heart rate is placed on a time axis.
    pub fn midpoint_ns(&self) -> u64 {
        self.start.timestamp_ns + self.interval_ns / 2
    }
}

/// One interval per consecutive pair of peaks, no smoothing.
pub fn estimate(peaks: &[Peak]) -> Result<Vec<BeatInterval>, AnalysisError> {
    if peaks.len() < 2 {
        return Err(AnalysisError::InsufficientPeaks { found: peaks.len() });
    }
    Ok(peaks
        .windows(2)
        .map(|w| BeatInterval::between(w[0], w[1]))
        .collect())
}
