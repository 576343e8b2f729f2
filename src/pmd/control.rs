use uuid::Uuid;

use crate::error::ControlError;

pub const PMD_CONTROL: Uuid = Uuid::from_u128(0xfb005c81_02e7_f387_1cad_8acd2d8df0c8);
pub const PMD_DATA: Uuid = Uuid::from_u128(0xfb005c82_02e7_f387_1cad_8acd2d8df0c8);

const MEASUREMENT_ECG: u8 = 0x00;
const SETTING_SAMPLE_RATE: u8 = 0x00;
const SETTING_RESOLUTION: u8 = 0x01;
const RESPONSE_TAG: u8 = 0xf0;
const MIN_RESPONSE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start {
        sample_rate_hz: u16,
        resolution_bits: u16,
    },
    Stop,
}

impl ControlCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Start { .. } => "start",
            ControlCommand::Stop => "stop",
        }
    }

    /// Bytes to write to the control point characteristic.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            ControlCommand::Start {
                sample_rate_hz,
                resolution_bits,
            } => {
                let rate = sample_rate_hz.to_le_bytes();
                let resolution = resolution_bits.to_le_bytes();
                vec![
                    OpCode::StartMeasurement.into(),
                    MEASUREMENT_ECG,
                    SETTING_SAMPLE_RATE,
                    0x01,
                    rate[0],
                    rate[1],
                    SETTING_RESOLUTION,
                    0x01,
                    resolution[0],
                    resolution[1],
                ]
            }
            ControlCommand::Stop => vec![OpCode::StopMeasurement.into(), MEASUREMENT_ECG],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    GetMeasurementSettings,
    StartMeasurement,
    StopMeasurement,
    Other(u8),
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value {
            0x01 => OpCode::GetMeasurementSettings,
            0x02 => OpCode::StartMeasurement,
            0x03 => OpCode::StopMeasurement,
            other => OpCode::Other(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        match op {
            OpCode::GetMeasurementSettings => 0x01,
            OpCode::StartMeasurement => 0x02,
            OpCode::StopMeasurement => 0x03,
            OpCode::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Success,
    InvalidOpCode,
    InvalidMeasurementType,
    NotSupported,
    InvalidLength,
    InvalidParameter,
    AlreadyInState,
    InvalidResolution,
    InvalidSampleRate,
    InvalidRange,
    InvalidMtu,
    InvalidNumberOfChannels,
    InvalidState,
    DeviceInCharger,
    Unknown(u8),
}

impl From<u8> for ResponseStatus {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ResponseStatus::Success,
            0x01 => ResponseStatus::InvalidOpCode,
            0x02 => ResponseStatus::InvalidMeasurementType,
            0x03 => ResponseStatus::NotSupported,
            0x04 => ResponseStatus::InvalidLength,
            0x05 => ResponseStatus::InvalidParameter,
            0x06 => ResponseStatus::AlreadyInState,
            0x07 => ResponseStatus::InvalidResolution,
            0x08 => ResponseStatus::InvalidSampleRate,
            0x09 => ResponseStatus::InvalidRange,
            0x0a => ResponseStatus::InvalidMtu,
            0x0b => ResponseStatus::InvalidNumberOfChannels,
            0x0c => ResponseStatus::InvalidState,
            0x0d => ResponseStatus::DeviceInCharger,
            other => ResponseStatus::Unknown(other),
        }
    }
}

impl ResponseStatus {
    /// `AlreadyInState` means the measurement is running anyway.
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseStatus::Success | ResponseStatus::AlreadyInState)
    }
}

/// Acknowledgement sent by the sensor on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub op_code: OpCode,
    pub measurement_type: u8,
    pub status: ResponseStatus,
    pub more_frames: bool,
    pub parameters: Vec<u8>,
}

impl ControlResponse {
    pub fn parse(data: &[u8]) -> Result<Self, ControlError> {
        if data.len() < MIN_RESPONSE_LEN {
            return Err(ControlError::TooShort { len: data.len() });
        }
        if data[0] != RESPONSE_TAG {
            return Err(ControlError::NotAResponse(data[0]));
        }
        Ok(Self {
            op_code: OpCode::from(data[1]),
            measurement_type: data[2],
            status: ResponseStatus::from(data[3]),
            more_frames: data.get(4).map_or(false, |&b| b != 0),
            parameters: data.get(5..).map(|p| p.to_vec()).unwrap_or_default(),
        })
    }
}
