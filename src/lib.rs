//! BLE Cycling Power service client with Wahoo smart trainer control.
//!
//! Turns raw notification bytes from a power meter or smart trainer into
//! typed readings (watts, speed, cadence, features, sensor placement),
//! and turns control intents (resistance, grade, target wattage) into
//! correctly framed, rate-limited command writes.
//!
//! The pieces compose explicitly: a [`registry::CharacteristicRegistry`]
//! maps characteristic UUIDs to handler factories, a
//! [`service::CyclingPowerService`] owns one live handler per discovered
//! characteristic and dispatches incoming bytes, and [`ble::PowerMonitor`]
//! pumps a connected `btleplug` peripheral into the service. Everything
//! below the transport seam is testable with a mock.

#![deny(unused_must_use)]

pub mod ble;
pub mod characteristics;
pub mod codec;
pub mod errors;
pub mod registry;
pub mod service;
pub mod transport;

pub use characteristics::{Handler, PowerMeasurement, WahooTrainer};
pub use codec::cycling_power::{MeasurementFrame, PowerFeatures, SensorLocation};
pub use errors::{CommandError, DecodeError};
pub use registry::CharacteristicRegistry;
pub use service::{CyclingPowerService, ServiceConfig, ServiceEvent};
pub use transport::{Transport, WriteKind};
