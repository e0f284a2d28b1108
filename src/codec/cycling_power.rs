//! Cycling Power Service (0x1818) characteristic codecs.
//!
//! Field layouts follow the Bluetooth GATT Cycling Power profile: a
//! little-endian flags word up front, then optional fields in a fixed
//! order, present or absent per flag bit.

use serde_derive::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DecodeError;

/// Cycling Power Service UUID (0x1818)
pub const CYCLING_POWER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x00001818_0000_1000_8000_00805f9b34fb);

/// Cycling Power Measurement Characteristic UUID (0x2A63)
pub const MEASUREMENT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a63_0000_1000_8000_00805f9b34fb);

/// Cycling Power Vector Characteristic UUID (0x2A64)
pub const VECTOR_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a64_0000_1000_8000_00805f9b34fb);

/// Cycling Power Feature Characteristic UUID (0x2A65)
pub const FEATURE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a65_0000_1000_8000_00805f9b34fb);

/// Cycling Power Control Point Characteristic UUID (0x2A66)
pub const CONTROL_POINT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a66_0000_1000_8000_00805f9b34fb);

/// Sensor Location Characteristic UUID (0x2A5D)
pub const SENSOR_LOCATION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00002a5d_0000_1000_8000_00805f9b34fb);

/// Wheel event times tick at 1/2048 s.
pub const WHEEL_TIME_RESOLUTION: u32 = 2048;
/// Crank event times tick at 1/1024 s.
pub const CRANK_TIME_RESOLUTION: u32 = 1024;

/// One decoded Cycling Power Measurement notification.
///
/// Revolution counters are cumulative and wrap at their field width;
/// deltas between consecutive frames are what carry meaning, a single
/// frame on its own says nothing about speed or cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFrame {
    /// Instantaneous power in watts. Can go negative on some meters
    /// during weird pedaling transients.
    pub instantaneous_power: i16,
    pub pedal_power_balance: Option<u8>,
    pub accumulated_torque: Option<u16>,
    /// Cumulative wheel revolutions (wraps at 2^32).
    pub wheel_revolutions: Option<u32>,
    /// Wheel event timestamp in 1/2048 s ticks (wraps at 2^16).
    pub wheel_event_time: Option<u16>,
    /// Cumulative crank revolutions (wraps at 2^16).
    pub crank_revolutions: Option<u16>,
    /// Crank event timestamp in 1/1024 s ticks (wraps at 2^16).
    pub crank_event_time: Option<u16>,
}

/// Measurement flag bits (first 2 bytes of the payload).
mod measurement_flags {
    pub const PEDAL_POWER_BALANCE: u16 = 0x0001;
    pub const ACCUMULATED_TORQUE: u16 = 0x0004;
    pub const WHEEL_REVOLUTION_DATA: u16 = 0x0010;
    pub const CRANK_REVOLUTION_DATA: u16 = 0x0020;
}

/// Parse a Cycling Power Measurement notification.
pub fn decode_measurement(data: &[u8]) -> Result<MeasurementFrame, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::TooShort {
            got: data.len(),
            needed: 4,
        });
    }

    let flags = u16::from_le_bytes([data[0], data[1]]);
    let mut frame = MeasurementFrame {
        instantaneous_power: i16::from_le_bytes([data[2], data[3]]),
        ..Default::default()
    };
    let mut offset = 4usize;

    if flags & measurement_flags::PEDAL_POWER_BALANCE != 0 {
        if offset + 1 > data.len() {
            return Err(DecodeError::Truncated("pedal power balance"));
        }
        frame.pedal_power_balance = Some(data[offset]);
        offset += 1;
    }

    if flags & measurement_flags::ACCUMULATED_TORQUE != 0 {
        if offset + 2 > data.len() {
            return Err(DecodeError::Truncated("accumulated torque"));
        }
        frame.accumulated_torque = Some(u16::from_le_bytes([data[offset], data[offset + 1]]));
        offset += 2;
    }

    if flags & measurement_flags::WHEEL_REVOLUTION_DATA != 0 {
        if offset + 6 > data.len() {
            return Err(DecodeError::Truncated("wheel revolution data"));
        }
        frame.wheel_revolutions = Some(u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]));
        frame.wheel_event_time = Some(u16::from_le_bytes([data[offset + 4], data[offset + 5]]));
        offset += 6;
    }

    if flags & measurement_flags::CRANK_REVOLUTION_DATA != 0 {
        if offset + 4 > data.len() {
            return Err(DecodeError::Truncated("crank revolution data"));
        }
        frame.crank_revolutions = Some(u16::from_le_bytes([data[offset], data[offset + 1]]));
        frame.crank_event_time = Some(u16::from_le_bytes([data[offset + 2], data[offset + 3]]));
    }

    Ok(frame)
}

/// A Cycling Power Vector notification, kept raw.
///
/// Per-pedal force/torque arrays aren't interpreted yet; the frame is
/// retained so callers can at least see the flag byte and payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorFrame {
    pub flags: u8,
    pub payload: Vec<u8>,
}

pub fn decode_vector(data: &[u8]) -> Result<VectorFrame, DecodeError> {
    let (&flags, payload) = data.split_first().ok_or(DecodeError::Empty)?;
    Ok(VectorFrame {
        flags,
        payload: payload.to_vec(),
    })
}

/// Cycling Power Feature flags (u32 bitfield).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFeatures(pub u32);

impl PowerFeatures {
    pub const PEDAL_POWER_BALANCE: u32 = 1 << 0;
    pub const ACCUMULATED_TORQUE: u32 = 1 << 1;
    pub const WHEEL_REVOLUTION_DATA: u32 = 1 << 2;
    pub const CRANK_REVOLUTION_DATA: u32 = 1 << 3;
    pub const OFFSET_COMPENSATION: u32 = 1 << 9;

    pub fn supports(&self, feature: u32) -> bool {
        self.0 & feature != 0
    }

    pub fn wheel_revolution_data(&self) -> bool {
        self.supports(Self::WHEEL_REVOLUTION_DATA)
    }

    pub fn crank_revolution_data(&self) -> bool {
        self.supports(Self::CRANK_REVOLUTION_DATA)
    }
}

pub fn decode_features(data: &[u8]) -> Result<PowerFeatures, DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::TooShort {
            got: data.len(),
            needed: 4,
        });
    }
    Ok(PowerFeatures(u32::from_le_bytes([
        data[0], data[1], data[2], data[3],
    ])))
}

/// Where the sensor reports being mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorLocation {
    Other,
    TopOfShoe,
    InShoe,
    Hip,
    FrontWheel,
    LeftCrank,
    RightCrank,
    LeftPedal,
    RightPedal,
    FrontHub,
    RearDropout,
    Chainstay,
    RearWheel,
    RearHub,
    Chest,
    Spider,
    ChainRing,
    /// A position code this crate doesn't know about.
    Unknown(u8),
}

impl From<u8> for SensorLocation {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::Other,
            1 => Self::TopOfShoe,
            2 => Self::InShoe,
            3 => Self::Hip,
            4 => Self::FrontWheel,
            5 => Self::LeftCrank,
            6 => Self::RightCrank,
            7 => Self::LeftPedal,
            8 => Self::RightPedal,
            9 => Self::FrontHub,
            10 => Self::RearDropout,
            11 => Self::Chainstay,
            12 => Self::RearWheel,
            13 => Self::RearHub,
            14 => Self::Chest,
            15 => Self::Spider,
            16 => Self::ChainRing,
            other => Self::Unknown(other),
        }
    }
}

pub fn decode_sensor_location(data: &[u8]) -> Result<SensorLocation, DecodeError> {
    let &raw = data.first().ok_or(DecodeError::Empty)?;
    Ok(SensorLocation::from(raw))
}
