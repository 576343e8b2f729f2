use ndarray::Array1;

use crate::error::ConfigError;
use crate::pmd::{DecodedFrame, Sample};

pub mod capture;
mod ringbuffer;

use ringbuffer::SliceableRingBuffer;

/// Largest bounded stream: the ring buffer backs `capacity` samples with
/// twice as many slots, which must stay within one allocation.
pub const MAX_CAPACITY: usize = isize::MAX as usize / 2 / std::mem::size_of::<Sample>();

/// Point-in-time copy of a stream as parallel arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamps: Array1<u64>,
    pub values: Array1<i16>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

enum Samples {
    Bounded(SliceableRingBuffer<Sample>),
    Unbounded(Vec<Sample>),
}

/// Decoded samples in arrival order. A bounded stream keeps the most recent
/// `capacity` samples (live display window), an unbounded one keeps
/// everything (offline replay).
pub struct SampleStream {
    samples: Samples,
}

impl SampleStream {
    pub fn bounded(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > MAX_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                requested: capacity as f64,
                max: MAX_CAPACITY,
            });
        }
        Ok(Self {
            samples: Samples::Bounded(SliceableRingBuffer::new(capacity, Sample::default())),
        })
    }

    /// Bounded stream holding `ceil(display_window_s * sample_rate_hz)` samples.
    pub fn for_window(display_window_s: f64, sample_rate_hz: f64) -> Result<Self, ConfigError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate_hz));
        }
        let capacity = (display_window_s * sample_rate_hz).ceil();
        if !(capacity.is_finite() && capacity >= 1.0) {
            return Err(ConfigError::ZeroCapacity);
        }
        if capacity > MAX_CAPACITY as f64 {
            return Err(ConfigError::CapacityTooLarge {
                requested: capacity,
                max: MAX_CAPACITY,
            });
        }
        Self::bounded(capacity as usize)
    }

    pub fn unbounded() -> Self {
        Self {
            samples: Samples::Unbounded(Vec::new()),
        }
    }

    pub fn append(&mut self, frame: &DecodedFrame) {
        for sample in &frame.samples {
            self.push(*sample);
        }
    }

    pub fn push(&mut self, sample: Sample) {
        match &mut self.samples {
            Samples::Bounded(ring) => ring.write(sample),
            Samples::Unbounded(all) => all.push(sample),
        }
    }

    pub fn as_slice(&self) -> &[Sample] {
        match &self.samples {
            Samples::Bounded(ring) => ring.get_slice(),
            Samples::Unbounded(all) => all.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.samples {
            Samples::Bounded(ring) => ring.len(),
            Samples::Unbounded(all) => all.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.samples {
            Samples::Bounded(ring) => ring.is_empty(),
            Samples::Unbounded(all) => all.is_empty(),
        }
    }

    /// `None` for an unbounded stream.
    pub fn capacity(&self) -> Option<usize> {
        match &self.samples {
            Samples::Bounded(ring) => Some(ring.capacity()),
            Samples::Unbounded(_) => None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let samples = self.as_slice();
        Snapshot {
            timestamps: samples.iter().map(|s| s.timestamp_ns).collect(),
            values: samples.iter().map(|s| s.value).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pmd::{Channel, FrameType};

    fn frame(start: u64, values: &[i16]) -> DecodedFrame {
        DecodedFrame {
            channel: Channel::Ecg,
            frame_type: FrameType::RawSamples,
            base_timestamp_ns: start,
            samples: values
                .iter()
                .enumerate()
                .map(|(i, &value)| Sample {
                    timestamp_ns: start + i as u64 * 10,
                    value,
                })
                .collect(),
        }
    }

    #[test]
    fn window_capacity_rounds_up() {
        let stream = SampleStream::for_window(10.0, 130.0).unwrap();
        assert_eq!(stream.capacity(), Some(1300));
        assert!(stream.is_empty());
        let stream = SampleStream::for_window(0.01, 130.0).unwrap();
        assert_eq!(stream.capacity(), Some(2));
    }

    #[test]
    fn rejects_empty_window() {
        assert_eq!(SampleStream::bounded(0).err(), Some(ConfigError::ZeroCapacity));
        assert!(SampleStream::for_window(0.0, 130.0).is_err());
        assert!(SampleStream::for_window(10.0, 0.0).is_err());
    }

    #[test]
    fn rejects_oversized_window() {
        assert!(matches!(
            SampleStream::for_window(1.0e20, 130.0).err(),
            Some(ConfigError::CapacityTooLarge { max: MAX_CAPACITY, .. })
        ));
        assert!(matches!(
            SampleStream::bounded(usize::MAX).err(),
            Some(ConfigError::CapacityTooLarge { .. })
        ));
    }

    #[test]
    fn bounded_stream_evicts_oldest() {
        let mut stream = SampleStream::bounded(4).unwrap();
        stream.append(&frame(0, &[1, 2, 3]));
        stream.append(&frame(30, &[4, 5, 6]));

        let snapshot = stream.snapshot();
        assert_eq!(snapshot.values.to_vec(), vec![3, 4, 5, 6]);
        assert_eq!(snapshot.timestamps.to_vec(), vec![20, 30, 40, 50]);
        assert_eq!(stream.len(), 4);
    }

    #[test]
    fn unbounded_stream_keeps_everything() {
        let mut stream = SampleStream::unbounded();
        for k in 0..100 {
            stream.append(&frame(k * 30, &[1, 2, 3]));
        }
        assert_eq!(stream.len(), 300);
        assert_eq!(stream.capacity(), None);
        assert!(stream
            .as_slice()
            .windows(2)
            .all(|w| w[0].timestamp_ns < w[1].timestamp_ns));
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut stream = SampleStream::bounded(3).unwrap();
        stream.append(&frame(0, &[7, 8, 9]));
        let before = stream.snapshot();
        stream.append(&frame(30, &[10]));
        assert_eq!(before.values.to_vec(), vec![7, 8, 9]);
        assert_eq!(stream.snapshot().values.to_vec(), vec![8, 9, 10]);
    }
}
