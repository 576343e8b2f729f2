use ndarray::ArrayView1;
use ndarray_stats::QuantileExt;

use crate::error::AnalysisError;

/// A detected R-wave, copied out of the snapshot it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub sample_index: usize,
    pub timestamp_ns: u64,
    pub value: i16,
}

/// How the amplitude threshold fraction is turned into an absolute level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMode {
    /// `fraction * max(values)`.
    #[default]
    Relative,
    /// The fraction is used as the absolute level. Reproduces recordings
    /// analysed with the fraction pre-divided by the signal maximum.
    Absolute,
}

/// Finds R-peaks with the relative amplitude threshold.
pub fn detect(
    timestamps: ArrayView1<u64>,
    values: ArrayView1<i16>,
    min_distance_samples: usize,
    amplitude_threshold_fraction: f64,
) -> Result<Vec<Peak>, AnalysisError> {
    detect_with_mode(
        timestamps,
        values,
        min_distance_samples,
        amplitude_threshold_fraction,
        ThresholdMode::Relative,
    )
}

/// Local maxima at or above the threshold, thinned so that no two retained
/// peaks are closer than `min_distance_samples`. Within a conflict the larger
/// value wins, the earlier index on ties. Peaks come back in index order.
pub fn detect_with_mode(
    timestamps: ArrayView1<u64>,
    values: ArrayView1<i16>,
    min_distance_samples: usize,
    amplitude_threshold_fraction: f64,
    mode: ThresholdMode,
) -> Result<Vec<Peak>, AnalysisError> {
    if timestamps.len() != values.len() {
        return Err(AnalysisError::LengthMismatch {
            timestamps: timestamps.len(),
            values: values.len(),
        });
    }
    let max = *values.max().map_err(|_| AnalysisError::EmptyInput)?;
    if max <= 0 {
        return Err(AnalysisError::EmptyInput);
    }

    let threshold = match mode {
        ThresholdMode::Relative => amplitude_threshold_fraction * f64::from(max),
        ThresholdMode::Absolute => amplitude_threshold_fraction,
    };

    let candidates = local_maxima(values, threshold);
    let retained = enforce_min_distance(values, candidates, min_distance_samples);

    Ok(retained
        .into_iter()
        .map(|i| Peak {
            sample_index: i,
            timestamp_ns: timestamps[i],
            value: values[i],
        })
        .collect())
}

// A flat top counts once, at its first index, if the signal rises into it and
// falls after it. Indices 0 and len-1 never qualify.
fn local_maxima(values: ArrayView1<i16>, threshold: f64) -> Vec<usize> {
    let n = values.len();
    let mut candidates = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if values[i] <= values[i - 1] {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < n && values[end + 1] == values[i] {
            end += 1;
        }
        if end + 1 < n && values[end + 1] < values[i] && f64::from(values[i]) >= threshold {
            candidates.push(i);
        }
        i = end + 1;
    }
    candidates
}

// `candidates` is sorted by index.
fn enforce_min_distance(
    values: ArrayView1<i16>,
    candidates: Vec<usize>,
    min_distance: usize,
) -> Vec<usize> {
    if min_distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut by_height: Vec<usize> = (0..candidates.len()).collect();
    by_height.sort_by(|&a, &b| {
        values[candidates[b]]
            .cmp(&values[candidates[a]])
            .then(candidates[a].cmp(&candidates[b]))
    });

    let mut kept = vec![false; candidates.len()];
    let mut suppressed = vec![false; candidates.len()];
    for &rank in &by_height {
        if suppressed[rank] {
            continue;
        }
        kept[rank] = true;
        let index = candidates[rank];

        for j in (0..rank).rev() {
            if index - candidates[j] >= min_distance {
                break;
            }
            suppressed[j] = true;
        }
        for j in rank + 1..candidates.len() {
            if candidates[j] - index >= min_distance {
                break;
            }
            suppressed[j] = true;
        }
    }

    candidates
        .into_iter()
        .zip(kept)
        .filter_map(|(index, keep)| keep.then_some(index))
        .collect()
}
