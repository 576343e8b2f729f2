//! Offline analysis of a capture file in one sequential pass.

use std::io::Read;
use std::path::Path;

use slog::{debug, error, info, o, warn, Logger};

use crate::analysis::{Analysis, BeatInterval, Parameters, Peak};
use crate::error::{CaptureError, ReplayError};
use crate::pmd::FrameDecoder;
use crate::storage::capture::{CaptureReader, EndOfCapture};
use crate::storage::{SampleStream, Snapshot};

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub analysis: Parameters,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            analysis: Parameters::offline(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub frames: usize,
    pub dropped_frames: usize,
    pub end: EndOfCapture,
    pub snapshot: Snapshot,
    pub peaks: Vec<Peak>,
    pub intervals: Vec<BeatInterval>,
}

impl ReplayReport {
    /// `(midpoint_ns, bpm)` for every interval, for plotting HR over time.
    pub fn hr_trace(&self) -> Vec<(u64, f64)> {
        self.intervals
            .iter()
            .map(|i| (i.midpoint_ns(), i.bpm))
            .collect()
    }
}

pub fn replay_file(
    path: impl AsRef<Path>,
    config: &ReplayConfig,
    log: &Logger,
) -> Result<ReplayReport, ReplayError> {
    let path = path.as_ref();
    let log = log.new(o!("file" => path.display().to_string()));
    let file = std::fs::File::open(path).map_err(CaptureError::from)?;
    replay(std::io::BufReader::new(file), config, &log)
}

/// Decodes every frame of the capture into one unbounded stream and analyses
/// it once. Malformed frames are skipped; a bad signature aborts.
pub fn replay<R: Read>(
    reader: R,
    config: &ReplayConfig,
    log: &Logger,
) -> Result<ReplayReport, ReplayError> {
    let log = log.new(o!("mode" => "replay"));
    let decoder = FrameDecoder::new(config.analysis.sample_rate_hz)?;
    let analysis = Analysis::new(config.analysis.clone(), &log)?;

    let mut frames = CaptureReader::new(reader).map_err(|e| {
        error!(log, "cannot replay capture"; "reason" => %e);
        e
    })?;

    let mut stream = SampleStream::unbounded();
    let mut count = 0;
    let mut dropped = 0;
    for raw in frames.by_ref() {
        let raw = raw?;
        count += 1;
        match decoder.decode(&raw) {
            Ok(frame) => stream.append(&frame),
            Err(e) => {
                warn!(log, "dropping frame"; "index" => count - 1, "reason" => %e);
                dropped += 1;
            }
        }
    }

    let end = frames.end().unwrap_or(EndOfCapture::Clean);
    match end {
        EndOfCapture::Clean => debug!(log, "end of file"),
        EndOfCapture::ZeroLength => info!(log, "zero length record ends capture"),
        EndOfCapture::Truncated {
            declared,
            available,
        } => warn!(log, "short read ends capture"; "declared" => declared, "available" => available),
    }

    let snapshot = stream.snapshot();
    let results = analysis.analyze(&snapshot);
    for interval in &results.intervals {
        info!(log, "beat";
            "interval_ms" => format!("{:.1}", interval.interval_ms()),
            "bpm" => format!("{:.1}", interval.bpm));
    }
    info!(log, "replay done";
        "frames" => count, "dropped" => dropped, "samples" => snapshot.len(),
        "peaks" => results.peaks.len());

    Ok(ReplayReport {
        frames: count,
        dropped_frames: dropped,
        end,
        snapshot,
        peaks: results.peaks,
        intervals: results.intervals,
    })
}
