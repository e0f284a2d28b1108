//! End-to-end derived-metric behavior: raw notification buffers in,
//! typed speed/cadence/power out, driven through service dispatch.

mod common;

use common::service_with_mock;
use wattlink::codec::cycling_power::MEASUREMENT_CHARACTERISTIC_UUID;
use wattlink::CyclingPowerService;

fn wheel_frame(power: i16, revs: u32, ticks: u16) -> Vec<u8> {
    let mut data = vec![0x10, 0x00];
    data.extend_from_slice(&power.to_le_bytes());
    data.extend_from_slice(&revs.to_le_bytes());
    data.extend_from_slice(&ticks.to_le_bytes());
    data
}

async fn service_with_measurement() -> CyclingPowerService {
    let (mut service, _transport) = service_with_mock();
    service
        .discover_characteristic(MEASUREMENT_CHARACTERISTIC_UUID)
        .await
        .unwrap();
    service
}

#[test_log::test(tokio::test)]
async fn identical_wheel_event_time_keeps_speed() {
    let mut service = service_with_measurement().await;

    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &wheel_frame(200, 100, 0));
    service.handle_notification(
        MEASUREMENT_CHARACTERISTIC_UUID,
        &wheel_frame(200, 101, 2048),
    );
    let before = service.measurement().unwrap().speed_kph().unwrap();

    // Same timestamp again: no new wheel event, no division, no change
    service.handle_notification(
        MEASUREMENT_CHARACTERISTIC_UUID,
        &wheel_frame(200, 101, 2048),
    );
    assert_eq!(service.measurement().unwrap().speed_kph(), Some(before));
}

#[test_log::test(tokio::test)]
async fn wheel_counter_wraparound_yields_small_delta() {
    let mut service = service_with_measurement().await;

    service.handle_notification(
        MEASUREMENT_CHARACTERISTIC_UUID,
        &wheel_frame(200, u32::MAX, 0),
    );
    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &wheel_frame(200, 1, 2048));

    // Delta is 2 revolutions in one second, not a giant negative number
    let circumference = service.measurement().unwrap().wheel_circumference_cm();
    let expected = 2.0 * circumference / 100_000.0 * 3600.0;
    let kph = service.measurement().unwrap().speed_kph().unwrap();
    assert!((kph - expected).abs() < 1e-6, "got {kph}, expected {expected}");
}

#[test_log::test(tokio::test)]
async fn negative_power_is_treated_as_noise() {
    let mut service = service_with_measurement().await;

    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &[0x00, 0x00, 0xB4, 0x00]);
    assert_eq!(
        service.measurement().unwrap().instantaneous_power(),
        Some(180)
    );

    // -1W frame: derived power untouched
    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &[0x00, 0x00, 0xFF, 0xFF]);
    assert_eq!(
        service.measurement().unwrap().instantaneous_power(),
        Some(180)
    );
}

#[test_log::test(tokio::test)]
async fn truncated_buffer_mutates_nothing() {
    let mut service = service_with_measurement().await;
    let mut events = service.subscribe();

    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &wheel_frame(200, 100, 0));
    assert!(events.try_recv().is_ok());

    // Wheel flag set, wheel bytes missing: frame dropped whole
    service.handle_notification(MEASUREMENT_CHARACTERISTIC_UUID, &[0x10, 0x00, 0xC8, 0x00]);
    assert!(events.try_recv().is_err(), "dropped frame must not emit");

    let measurement = service.measurement().unwrap();
    assert_eq!(measurement.current_frame().unwrap().wheel_revolutions, Some(100));

    // The pair (first, third) still derives a sane speed afterwards
    service.handle_notification(
        MEASUREMENT_CHARACTERISTIC_UUID,
        &wheel_frame(200, 101, 2048),
    );
    assert!(service.measurement().unwrap().speed_kph().is_some());
}
