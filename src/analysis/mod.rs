pub mod ecg;
pub mod hr;
pub mod peaks;

pub use ecg::{Analysis, MinDistance, Parameters, Results};
pub use hr::{estimate, BeatInterval};
pub use peaks::{detect, detect_with_mode, Peak, ThresholdMode};
