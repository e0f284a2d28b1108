mod common;

use common::service_with_mock;
use uuid::Uuid;
use wattlink::codec::cycling_power::{
    FEATURE_CHARACTERISTIC_UUID, MEASUREMENT_CHARACTERISTIC_UUID,
    SENSOR_LOCATION_CHARACTERISTIC_UUID,
};
use wattlink::{PowerFeatures, SensorLocation, ServiceEvent};

#[test_log::test(tokio::test)]
async fn unknown_characteristic_is_ignored() {
    let (mut service, transport) = service_with_mock();
    let bogus = Uuid::from_u128(0xBADC0FFEE);

    let created = service.discover_characteristic(bogus).await.unwrap();

    assert!(!created);
    assert!(service.handler(&bogus).is_none());
    // No traffic either: not subscribed, nothing written
    assert!(transport.subscriptions().is_empty());
    assert!(transport.writes().is_empty());
}

#[test_log::test(tokio::test)]
async fn measurement_discovery_subscribes_and_dispatches() {
    let (mut service, transport) = service_with_mock();

    let created = service
        .discover_characteristic(MEASUREMENT_CHARACTERISTIC_UUID)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(
        transport.subscriptions(),
        vec![MEASUREMENT_CHARACTERISTIC_UUID]
    );

    let mut events = service.subscribe();
    // Power-only frame, 180W
    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &[0x00, 0x00, 0xB4, 0x00]);

    assert_eq!(
        service.measurement().unwrap().instantaneous_power(),
        Some(180)
    );
    assert_eq!(
        events.try_recv().unwrap(),
        ServiceEvent::ValueUpdated(MEASUREMENT_CHARACTERISTIC_UUID)
    );
}

#[test_log::test(tokio::test)]
async fn feature_read_fires_features_identified() {
    let (mut service, transport) = service_with_mock();
    // Wheel + crank revolution data supported
    transport.set_read_value(FEATURE_CHARACTERISTIC_UUID, vec![0x0C, 0x00, 0x00, 0x00]);

    let mut events = service.subscribe();
    service
        .discover_characteristic(FEATURE_CHARACTERISTIC_UUID)
        .await
        .unwrap();

    let features = service.features().unwrap();
    assert!(features.wheel_revolution_data());
    assert!(features.crank_revolution_data());

    assert_eq!(
        events.try_recv().unwrap(),
        ServiceEvent::ValueUpdated(FEATURE_CHARACTERISTIC_UUID)
    );
    assert_eq!(
        events.try_recv().unwrap(),
        ServiceEvent::FeaturesIdentified(PowerFeatures(0x0C))
    );
}

#[test_log::test(tokio::test)]
async fn sensor_location_read_on_setup() {
    let (mut service, transport) = service_with_mock();
    transport.set_read_value(SENSOR_LOCATION_CHARACTERISTIC_UUID, vec![5]);

    service
        .discover_characteristic(SENSOR_LOCATION_CHARACTERISTIC_UUID)
        .await
        .unwrap();

    assert_eq!(service.sensor_location(), Some(SensorLocation::LeftCrank));
}

#[test_log::test(tokio::test)]
async fn notification_without_handler_is_dropped() {
    let (mut service, _transport) = service_with_mock();
    // Nothing discovered; must not panic or create state
    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &[0x00, 0x00, 0xB4, 0x00]);
    assert!(service.measurement().is_none());
}

#[test_log::test(tokio::test)]
async fn overwritten_registration_drives_dispatch() {
    use std::sync::Arc;
    use wattlink::characteristics::{Handler, PowerVector};
    use wattlink::{CharacteristicRegistry, CyclingPowerService, ServiceConfig, Transport};

    let registry = Arc::new(CharacteristicRegistry::with_builtins());
    // Vendor shadowing: the measurement slot now builds a vector handler
    registry.register(MEASUREMENT_CHARACTERISTIC_UUID, |uuid| {
        Handler::Vector(PowerVector::new(uuid))
    });
    let transport: Arc<dyn Transport> = common::MockTransport::new();
    let mut service = CyclingPowerService::new(registry, transport, ServiceConfig::default());

    service
        .discover_characteristic(MEASUREMENT_CHARACTERISTIC_UUID)
        .await
        .unwrap();

    assert!(service.measurement().is_none());
    assert!(matches!(
        service.handler(&MEASUREMENT_CHARACTERISTIC_UUID),
        Some(Handler::Vector(_))
    ));
}

#[test_log::test(tokio::test)]
async fn disconnect_releases_handlers_and_notifies() {
    let (mut service, _transport) = service_with_mock();
    service
        .discover_characteristic(MEASUREMENT_CHARACTERISTIC_UUID)
        .await
        .unwrap();

    let mut events = service.subscribe();
    service.handle_disconnect();

    assert!(service.measurement().is_none());
    assert_eq!(events.try_recv().unwrap(), ServiceEvent::Disconnected);
}
