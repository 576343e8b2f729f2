use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed frame: {len} bytes, header plus one sample needs {required}")]
    Malformed { len: usize, required: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("control response too short: {len} bytes")]
    TooShort { len: usize },
    #[error("not a control point response (first byte 0x{0:02x})")]
    NotAResponse(u8),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("peak detection needs a non-empty signal with a positive maximum")]
    EmptyInput,
    #[error("timestamps ({timestamps}) and values ({values}) differ in length")]
    LengthMismatch { timestamps: usize, values: usize },
    #[error("heart rate needs at least two peaks, found {found}")]
    InsufficientPeaks { found: usize },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("unrecognized capture format: signature mismatch")]
    UnrecognizedFormat,
    #[error("empty frames cannot be recorded, a zero length ends the capture")]
    EmptyFrame,
    #[error("frame of {0} bytes does not fit a 32-bit length prefix")]
    FrameTooLarge(usize),
    #[error("capture i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be greater than zero, got {0}")]
    InvalidSampleRate(f64),
    #[error("sample rate {0} Hz does not round to a 16-bit start command value")]
    UnencodableSampleRate(f64),
    #[error("threshold fraction must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("max bpm must be greater than zero, got {0}")]
    InvalidMaxBpm(f64),
    #[error("sample stream capacity must be greater than zero")]
    ZeroCapacity,
    #[error("sample stream capacity of {requested} samples exceeds {max}")]
    CapacityTooLarge { requested: f64, max: usize },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("control channel closed before {0} could be sent")]
    ControlClosed(&'static str),
    #[error("recording frame failed: {0}")]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid replay configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
