//! Decoding of Polar H10 ECG measurement frames, R-peak detection and
//! beat-to-beat heart rate, for live notification streams and recorded
//! capture files alike.

pub mod analysis;
pub mod error;
pub mod live;
pub mod log;
pub mod pmd;
pub mod replay;
pub mod storage;

pub use analysis::{Analysis, BeatInterval, MinDistance, Parameters, Peak, Results, ThresholdMode};
pub use error::{AnalysisError, CaptureError, ConfigError, ControlError, FrameError, ReplayError, SessionError};
pub use live::{Delegate, EcgUpdate, LiveSession, Notification, SessionConfig, SessionSummary};
pub use pmd::{Channel, DecodedFrame, FrameDecoder, FrameType, RawFrame, Sample};
pub use replay::{replay, replay_file, ReplayConfig, ReplayReport};
pub use storage::capture::{CaptureReader, CaptureWriter, EndOfCapture};
pub use storage::{SampleStream, Snapshot};
