//! Typed handlers, one per characteristic the service knows how to speak.
//!
//! The original dispatch problem ("give me the right behavior for this
//! discovered UUID") is solved with a tagged enum plus factory functions
//! in the registry, instead of a class hierarchy. A handler owns the last
//! decoded state for its characteristic and, for the trainer, the outbound
//! command surface.

pub mod feature;
pub mod location;
pub mod measurement;
pub mod passive;
pub mod trainer;

use std::sync::Arc;

use uuid::Uuid;

use crate::codec::cycling_power::PowerFeatures;
use crate::errors::CommandError;
use crate::service::ServiceConfig;
use crate::transport::Transport;

pub use feature::PowerFeature;
pub use location::SensorPlacement;
pub use measurement::PowerMeasurement;
pub use passive::{ControlPoint, PowerVector};
pub use trainer::WahooTrainer;

/// What a handler did with an incoming payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Payload didn't decode; state untouched.
    Dropped,
    /// State updated.
    Value,
    /// State updated and feature flags are now known.
    Features(PowerFeatures),
}

/// A live, typed characteristic handler.
#[derive(Debug)]
pub enum Handler {
    Measurement(PowerMeasurement),
    Feature(PowerFeature),
    Vector(PowerVector),
    SensorLocation(SensorPlacement),
    ControlPoint(ControlPoint),
    WahooTrainer(WahooTrainer),
}

impl Handler {
    pub fn uuid(&self) -> Uuid {
        match self {
            Handler::Measurement(h) => h.uuid(),
            Handler::Feature(h) => h.uuid(),
            Handler::Vector(h) => h.uuid(),
            Handler::SensorLocation(h) => h.uuid(),
            Handler::ControlPoint(h) => h.uuid(),
            Handler::WahooTrainer(h) => h.uuid(),
        }
    }

    pub(crate) fn apply_config(&mut self, config: &ServiceConfig) {
        match self {
            Handler::Measurement(h) => h.set_wheel_circumference_cm(config.wheel_circumference_cm),
            Handler::WahooTrainer(h) => h.set_erg_write_period(config.erg_write_period),
            _ => {}
        }
    }

    /// Post-construction setup: enable notifications, issue the initial
    /// read, or unlock the trainer. Runs exactly once, right after the
    /// factory produced the handler; outbound traffic here is intentional.
    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        match self {
            Handler::Measurement(h) => h.setup(transport).await,
            Handler::Feature(h) => h.setup(transport).await,
            Handler::Vector(h) => h.setup(transport).await,
            Handler::SensorLocation(h) => h.setup(transport).await,
            Handler::ControlPoint(h) => h.setup(transport).await,
            Handler::WahooTrainer(h) => h.setup(transport).await,
        }
    }

    /// React to a notification payload for this characteristic.
    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        match self {
            Handler::Measurement(h) => h.handle_bytes(data),
            Handler::Feature(h) => h.handle_bytes(data),
            Handler::Vector(h) => h.handle_bytes(data),
            Handler::SensorLocation(h) => h.handle_bytes(data),
            Handler::ControlPoint(h) => h.handle_bytes(data),
            Handler::WahooTrainer(h) => h.handle_bytes(data),
        }
    }

    /// The peripheral is gone; tear down anything periodic.
    pub(crate) fn on_disconnect(&mut self) {
        if let Handler::WahooTrainer(h) = self {
            h.cancel_erg();
        }
    }
}
