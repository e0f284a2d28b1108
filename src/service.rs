//! A connected peripheral's Cycling Power service: one live handler per
//! discovered characteristic, dispatch of raw notification bytes to the
//! right handler, and fan-out of typed events to subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::characteristics::{
    Handler, PowerFeature, PowerMeasurement, SensorPlacement, Update, WahooTrainer,
};
use crate::codec::cycling_power::{PowerFeatures, SensorLocation};
use crate::errors::CommandError;
use crate::registry::CharacteristicRegistry;
use crate::transport::Transport;

use crate::characteristics::measurement::DEFAULT_WHEEL_CIRCUMFERENCE_CM;
use crate::characteristics::trainer::DEFAULT_ERG_WRITE_PERIOD;

/// Tunables a composition root may want to persist alongside its own
/// settings. Applied to handlers as they are constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub wheel_circumference_cm: f64,
    pub erg_write_period: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            wheel_circumference_cm: DEFAULT_WHEEL_CIRCUMFERENCE_CM,
            erg_write_period: DEFAULT_ERG_WRITE_PERIOD,
        }
    }
}

/// Events fanned out to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceEvent {
    /// A handler accepted a new value; read the typed state off the
    /// service to see what changed.
    ValueUpdated(Uuid),
    /// Feature flags are now known. Fired once per successful feature
    /// decode, separately from `ValueUpdated`, because feature discovery
    /// gates logic that must react exactly when flags become known.
    FeaturesIdentified(PowerFeatures),
    Disconnected,
}

#[derive(Debug)]
pub struct CyclingPowerService {
    registry: Arc<CharacteristicRegistry>,
    transport: Arc<dyn Transport>,
    config: ServiceConfig,
    handlers: HashMap<Uuid, Handler>,
    events: broadcast::Sender<ServiceEvent>,
}

impl CyclingPowerService {
    pub fn new(
        registry: Arc<CharacteristicRegistry>,
        transport: Arc<dyn Transport>,
        config: ServiceConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            registry,
            transport,
            config,
            handlers: HashMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// A characteristic was discovered on the peripheral.
    ///
    /// Known identifiers get exactly one live handler, constructed and
    /// set up (notifications enabled, initial read issued, trainer
    /// unlocked) as a single step. Unknown identifiers are skipped
    /// without error, for forward compatibility. Returns whether a
    /// handler now exists for the identifier.
    pub async fn discover_characteristic(&mut self, uuid: Uuid) -> Result<bool, CommandError> {
        let Some(factory) = self.registry.resolve(&uuid) else {
            trace!("Ignoring unknown characteristic {uuid}");
            return Ok(false);
        };
        debug!("Setting up handler for characteristic {uuid}");
        let mut handler = factory(uuid);
        handler.apply_config(&self.config);
        let update = handler.setup(&self.transport).await?;
        // Re-discovery replaces the old handler; dropping a trainer
        // cancels its ERG schedule
        self.handlers.insert(uuid, handler);
        self.emit(uuid, update);
        Ok(true)
    }

    /// Raw bytes arrived for a characteristic. Bytes for identifiers
    /// without a live handler are dropped silently.
    pub fn handle_notification(&mut self, uuid: Uuid, data: &[u8]) {
        let Some(handler) = self.handlers.get_mut(&uuid) else {
            trace!("Notification for unhandled characteristic {uuid}");
            return;
        };
        let update = handler.handle_bytes(data);
        self.emit(uuid, update);
    }

    /// The peripheral is gone: stop periodic work and release every
    /// handler. A later reconnection rebuilds them through discovery.
    pub fn handle_disconnect(&mut self) {
        debug!("Peripheral disconnected, releasing {} handlers", self.handlers.len());
        for handler in self.handlers.values_mut() {
            handler.on_disconnect();
        }
        self.handlers.clear();
        let _ = self.events.send(ServiceEvent::Disconnected);
    }

    pub fn handler(&self, uuid: &Uuid) -> Option<&Handler> {
        self.handlers.get(uuid)
    }

    pub fn measurement(&self) -> Option<&PowerMeasurement> {
        self.handlers.values().find_map(|h| match h {
            Handler::Measurement(m) => Some(m),
            _ => None,
        })
    }

    pub fn measurement_mut(&mut self) -> Option<&mut PowerMeasurement> {
        self.handlers.values_mut().find_map(|h| match h {
            Handler::Measurement(m) => Some(m),
            _ => None,
        })
    }

    pub fn features(&self) -> Option<PowerFeatures> {
        self.handlers.values().find_map(|h| match h {
            Handler::Feature(f) => f.features(),
            _ => None,
        })
    }

    pub fn feature_handler(&self) -> Option<&PowerFeature> {
        self.handlers.values().find_map(|h| match h {
            Handler::Feature(f) => Some(f),
            _ => None,
        })
    }

    pub fn sensor_location(&self) -> Option<SensorLocation> {
        self.handlers.values().find_map(|h| match h {
            Handler::SensorLocation(l) => l.location(),
            _ => None,
        })
    }

    pub fn sensor_location_handler(&self) -> Option<&SensorPlacement> {
        self.handlers.values().find_map(|h| match h {
            Handler::SensorLocation(l) => Some(l),
            _ => None,
        })
    }

    pub fn trainer(&self) -> Option<&WahooTrainer> {
        self.handlers.values().find_map(|h| match h {
            Handler::WahooTrainer(t) => Some(t),
            _ => None,
        })
    }

    pub fn trainer_mut(&mut self) -> Option<&mut WahooTrainer> {
        self.handlers.values_mut().find_map(|h| match h {
            Handler::WahooTrainer(t) => Some(t),
            _ => None,
        })
    }

    fn emit(&self, uuid: Uuid, update: Update) {
        // Send only fails with no subscribers, which is fine
        match update {
            Update::Dropped => {}
            Update::Value => {
                let _ = self.events.send(ServiceEvent::ValueUpdated(uuid));
            }
            Update::Features(features) => {
                let _ = self.events.send(ServiceEvent::ValueUpdated(uuid));
                let _ = self
                    .events
                    .send(ServiceEvent::FeaturesIdentified(features));
            }
        }
    }
}
