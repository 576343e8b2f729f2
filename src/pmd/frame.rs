use crate::error::{ConfigError, FrameError};

/// 1 channel tag + 7 timestamp bytes + 1 frame type.
pub const HEADER_LEN: usize = 9;
/// 16-bit little-endian value followed by one reserved byte.
pub const SAMPLE_LEN: usize = 3;

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 130.0;

const NANOS_PER_SECOND: f64 = 1.0e9;
const TIMESTAMP_LEN: usize = 7;
const CHANNEL_ECG: u8 = 0x00;
const FRAME_TYPE_RAW: u8 = 0x00;

/// Bytes exactly as delivered by the data characteristic or read from a capture.
pub type RawFrame = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    pub timestamp_ns: u64,
    pub value: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Ecg,
    Other(u8),
}

impl From<u8> for Channel {
    fn from(tag: u8) -> Self {
        match tag {
            CHANNEL_ECG => Channel::Ecg,
            other => Channel::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    RawSamples,
    Other(u8),
}

impl From<u8> for FrameType {
    fn from(tag: u8) -> Self {
        match tag {
            FRAME_TYPE_RAW => FrameType::RawSamples,
            other => FrameType::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub channel: Channel,
    pub frame_type: FrameType,
    pub base_timestamp_ns: u64,
    pub samples: Vec<Sample>,
}

/// Nanoseconds between two consecutive samples at `sample_rate_hz`.
pub fn sample_period_ns(sample_rate_hz: f64) -> f64 {
    NANOS_PER_SECOND / sample_rate_hz
}

/// Decodes data-channel frames. The sample rate is not part of the frame, it
/// has to match whatever was negotiated with the sensor on start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecoder {
    period_ns: f64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            period_ns: sample_period_ns(DEFAULT_SAMPLE_RATE_HZ),
        }
    }
}

impl FrameDecoder {
    pub fn new(sample_rate_hz: f64) -> Result<Self, ConfigError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSampleRate(sample_rate_hz));
        }
        Ok(Self {
            period_ns: sample_period_ns(sample_rate_hz),
        })
    }

    /// Decodes one frame. Frames for other channels or frame types decode to an
    /// empty sample list, and a trailing partial sample is dropped.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedFrame, FrameError> {
        let required = HEADER_LEN + SAMPLE_LEN;
        if data.len() < required {
            return Err(FrameError::Malformed {
                len: data.len(),
                required,
            });
        }

        let channel = Channel::from(data[0]);
        let mut timestamp = [0u8; 8];
        timestamp[..TIMESTAMP_LEN].copy_from_slice(&data[1..1 + TIMESTAMP_LEN]);
        let base_timestamp_ns = u64::from_le_bytes(timestamp);
        let frame_type = FrameType::from(data[HEADER_LEN - 1]);

        let samples = match (channel, frame_type) {
            (Channel::Ecg, FrameType::RawSamples) => data[HEADER_LEN..]
                .chunks_exact(SAMPLE_LEN)
                .enumerate()
                .map(|(k, chunk)| Sample {
                    timestamp_ns: base_timestamp_ns + (k as f64 * self.period_ns) as u64,
                    value: i16::from_le_bytes([chunk[0], chunk[1]]),
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(DecodedFrame {
            channel,
            frame_type,
            base_timestamp_ns,
            samples,
        })
    }
}

/// Builds an ECG raw-sample frame. The reserved byte carries the sign
/// extension, as the sensor fills it.
pub fn encode_ecg_frame(base_timestamp_ns: u64, values: &[i16]) -> RawFrame {
    let mut frame = Vec::with_capacity(HEADER_LEN + values.len() * SAMPLE_LEN);
    frame.push(CHANNEL_ECG);
    frame.extend_from_slice(&base_timestamp_ns.to_le_bytes()[..TIMESTAMP_LEN]);
    frame.push(FRAME_TYPE_RAW);
    for value in values {
        frame.extend_from_slice(&value.to_le_bytes());
        frame.push(if *value < 0 { 0xff } else { 0x00 });
    }
    frame
}
