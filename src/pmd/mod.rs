//! Polar Measurement Data (PMD) wire formats: the data-channel frame layout
//! and the control-point commands that start and stop a measurement.

pub mod control;
pub mod frame;

pub use control::{ControlCommand, ControlResponse, OpCode, ResponseStatus, PMD_CONTROL, PMD_DATA};
pub use frame::{Channel, DecodedFrame, FrameDecoder, FrameType, RawFrame, Sample};
