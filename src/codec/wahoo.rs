//! Wahoo Trainer vendor characteristic command encoders.
//!
//! The trainer speaks a simple opcode + little-endian-params format on a
//! single vendor characteristic inside the Cycling Power service. It
//! ignores everything until the unlock sequence has been written.

use uuid::Uuid;

/// Wahoo Trainer vendor characteristic UUID.
pub const WAHOO_TRAINER_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xA026E005_0A7D_4AB3_97FA_F1500F9FEB8B);

#[repr(u8)]
enum OpCode {
    Unlock = 0x20,
    SetResistanceMode = 0x40,
    SetStandardMode = 0x41,
    SetErgMode = 0x42,
    SetSimMode = 0x43,
    SetSimCrr = 0x44,
    SetSimWindResistance = 0x45,
    SetSimGrade = 0x46,
    SetSimWindSpeed = 0x47,
    SetWheelCircumference = 0x48,
}

/// Magic unlock sequence; must be the first write after connecting.
pub fn unlock() -> Vec<u8> {
    vec![OpCode::Unlock as u8, 0xEE, 0xFC]
}

/// Brake force as a fraction of maximum, clamped to `0.0..=1.0`.
pub fn set_resistance_mode(resistance: f32) -> Vec<u8> {
    let norm = (resistance.clamp(0.0, 1.0) * 16383.0) as u16;
    command(OpCode::SetResistanceMode, &norm.to_le_bytes())
}

/// One of the trainer's built-in progressive resistance curves.
pub fn set_standard_mode(level: u8) -> Vec<u8> {
    vec![OpCode::SetStandardMode as u8, level]
}

/// Constant target power in watts.
pub fn set_erg_watts(watts: u16) -> Vec<u8> {
    command(OpCode::SetErgMode, &watts.to_le_bytes())
}

/// Physics simulation parameters: rider+bike weight (kg), rolling
/// resistance coefficient, wind resistance coefficient (kg/m).
pub fn set_sim_mode(weight_kg: f32, crr: f32, wind_resistance: f32) -> Vec<u8> {
    let mut cmd = vec![OpCode::SetSimMode as u8];
    cmd.extend_from_slice(&((weight_kg * 100.0) as u16).to_le_bytes());
    cmd.extend_from_slice(&((crr * 10000.0) as u16).to_le_bytes());
    cmd.extend_from_slice(&((wind_resistance * 1000.0) as u16).to_le_bytes());
    cmd
}

pub fn set_sim_crr(crr: f32) -> Vec<u8> {
    command(OpCode::SetSimCrr, &((crr * 10000.0) as u16).to_le_bytes())
}

pub fn set_sim_wind_resistance(wind_resistance: f32) -> Vec<u8> {
    command(
        OpCode::SetSimWindResistance,
        &((wind_resistance * 1000.0) as u16).to_le_bytes(),
    )
}

/// Simulated grade, clamped to ±100% and mapped onto the full u16 range.
pub fn set_sim_grade(grade: f32) -> Vec<u8> {
    let norm = ((grade.clamp(-1.0, 1.0) + 1.0) * 65535.0 / 2.0) as u16;
    command(OpCode::SetSimGrade, &norm.to_le_bytes())
}

/// Simulated headwind (positive) or tailwind (negative) in m/s.
pub fn set_sim_wind_speed(meters_per_second: f32) -> Vec<u8> {
    let norm = ((meters_per_second.clamp(-32.767, 32.767) + 32.767) * 1000.0) as u16;
    command(OpCode::SetSimWindSpeed, &norm.to_le_bytes())
}

/// Wheel circumference in millimeters, encoded in tenths of a millimeter.
pub fn set_wheel_circumference(millimeters: f32) -> Vec<u8> {
    command(
        OpCode::SetWheelCircumference,
        &((millimeters * 10.0) as u16).to_le_bytes(),
    )
}

fn command(op: OpCode, params: &[u8]) -> Vec<u8> {
    let mut cmd = vec![op as u8];
    cmd.extend_from_slice(params);
    cmd
}
