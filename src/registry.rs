//! Characteristic identifier → handler factory mapping.
//!
//! One registry is shared by every service instance a composition root
//! creates; it's read on each discovery event and written only by
//! explicit registration calls (built-in seeding, vendor activation).
//! Interior locking keeps a concurrent lookup from ever observing a torn
//! insert. No ambient singleton: the registry is constructed explicitly
//! and passed into [`crate::service::CyclingPowerService::new`].

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::characteristics::{
    ControlPoint, Handler, PowerFeature, PowerMeasurement, PowerVector, SensorPlacement,
};
use crate::codec::cycling_power::{
    CONTROL_POINT_CHARACTERISTIC_UUID, FEATURE_CHARACTERISTIC_UUID,
    MEASUREMENT_CHARACTERISTIC_UUID, SENSOR_LOCATION_CHARACTERISTIC_UUID,
    VECTOR_CHARACTERISTIC_UUID,
};

/// Builds the typed handler for a discovered characteristic.
pub type HandlerFactory = fn(Uuid) -> Handler;

#[derive(Debug, Default)]
pub struct CharacteristicRegistry {
    entries: RwLock<HashMap<Uuid, HandlerFactory>>,
}

impl CharacteristicRegistry {
    /// An empty registry. Most callers want [`Self::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the standard Cycling Power characteristics.
    /// Vendor extensions (e.g. [`crate::characteristics::trainer::activate`])
    /// add theirs on top.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(MEASUREMENT_CHARACTERISTIC_UUID, |uuid| {
            Handler::Measurement(PowerMeasurement::new(uuid))
        });
        registry.register(FEATURE_CHARACTERISTIC_UUID, |uuid| {
            Handler::Feature(PowerFeature::new(uuid))
        });
        registry.register(VECTOR_CHARACTERISTIC_UUID, |uuid| {
            Handler::Vector(PowerVector::new(uuid))
        });
        registry.register(SENSOR_LOCATION_CHARACTERISTIC_UUID, |uuid| {
            Handler::SensorLocation(SensorPlacement::new(uuid))
        });
        registry.register(CONTROL_POINT_CHARACTERISTIC_UUID, |uuid| {
            Handler::ControlPoint(ControlPoint::new(uuid))
        });
        registry
    }

    /// Insert or replace the factory for an identifier. Last writer wins,
    /// which is how vendor extensions can shadow a built-in.
    pub fn register(&self, uuid: Uuid, factory: HandlerFactory) {
        self.entries
            .write()
            .expect("registry lock poisoned")
            .insert(uuid, factory);
    }

    /// Look up the factory for an identifier, or `None` for characteristics
    /// this registry doesn't know (not an error; see dispatch rules).
    pub fn resolve(&self, uuid: &Uuid) -> Option<HandlerFactory> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(uuid)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristics::trainer;
    use crate::codec::wahoo::WAHOO_TRAINER_CHARACTERISTIC_UUID;

    #[test]
    fn builtins_are_seeded() {
        let registry = CharacteristicRegistry::with_builtins();
        assert!(registry.resolve(&MEASUREMENT_CHARACTERISTIC_UUID).is_some());
        assert!(registry.resolve(&FEATURE_CHARACTERISTIC_UUID).is_some());
        assert!(registry
            .resolve(&SENSOR_LOCATION_CHARACTERISTIC_UUID)
            .is_some());
    }

    #[test]
    fn unknown_uuid_resolves_to_none() {
        let registry = CharacteristicRegistry::with_builtins();
        assert!(registry.resolve(&Uuid::from_u128(0xDEAD_BEEF)).is_none());
    }

    #[test]
    fn vendor_activation_adds_entry() {
        let registry = CharacteristicRegistry::with_builtins();
        assert!(registry
            .resolve(&WAHOO_TRAINER_CHARACTERISTIC_UUID)
            .is_none());
        trainer::activate(&registry);
        let factory = registry
            .resolve(&WAHOO_TRAINER_CHARACTERISTIC_UUID)
            .unwrap();
        assert!(matches!(
            factory(WAHOO_TRAINER_CHARACTERISTIC_UUID),
            Handler::WahooTrainer(_)
        ));
    }

    #[test]
    fn later_registration_overwrites_earlier() {
        let registry = CharacteristicRegistry::with_builtins();
        // Shadow the measurement slot with a vector handler
        registry.register(MEASUREMENT_CHARACTERISTIC_UUID, |uuid| {
            Handler::Vector(PowerVector::new(uuid))
        });
        let factory = registry.resolve(&MEASUREMENT_CHARACTERISTIC_UUID).unwrap();
        assert!(matches!(
            factory(MEASUREMENT_CHARACTERISTIC_UUID),
            Handler::Vector(_)
        ));
    }
}
