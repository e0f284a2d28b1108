use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Update;
use crate::codec::cycling_power::{
    decode_measurement, MeasurementFrame, CRANK_TIME_RESOLUTION, WHEEL_TIME_RESOLUTION,
};
use crate::errors::CommandError;
use crate::transport::Transport;

/// 700x23c road wheel, the de-facto default.
pub const DEFAULT_WHEEL_CIRCUMFERENCE_CM: f64 = 213.3;

/// Handler for the Cycling Power Measurement characteristic (0x2A63).
///
/// Keeps the last two decoded frames and derives speed and cadence from
/// the revolution-counter deltas between them. The cumulative counters
/// wrap (wheel at 2^32, crank and both event clocks at 2^16), so deltas
/// use wrapping arithmetic throughout.
#[derive(Debug)]
pub struct PowerMeasurement {
    uuid: Uuid,
    previous: Option<MeasurementFrame>,
    current: Option<MeasurementFrame>,

    instantaneous_power: Option<u16>,
    speed_kph: Option<f64>,
    crank_rpm: Option<f64>,
    wheel_circumference_cm: f64,
}

impl PowerMeasurement {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            previous: None,
            current: None,
            instantaneous_power: None,
            speed_kph: None,
            crank_rpm: None,
            wheel_circumference_cm: DEFAULT_WHEEL_CIRCUMFERENCE_CM,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Latest accepted power reading, in watts.
    pub fn instantaneous_power(&self) -> Option<u16> {
        self.instantaneous_power
    }

    /// Derived wheel speed. Needs two consecutive frames with wheel data.
    pub fn speed_kph(&self) -> Option<f64> {
        self.speed_kph
    }

    /// Derived cadence. Needs two consecutive frames with crank data.
    pub fn crank_rpm(&self) -> Option<f64> {
        self.crank_rpm
    }

    pub fn wheel_circumference_cm(&self) -> f64 {
        self.wheel_circumference_cm
    }

    /// Takes effect from the next frame pair onward; already-derived
    /// speed values are not recomputed.
    pub fn set_wheel_circumference_cm(&mut self, circumference_cm: f64) {
        self.wheel_circumference_cm = circumference_cm;
    }

    /// The most recent decoded frame, if any.
    pub fn current_frame(&self) -> Option<&MeasurementFrame> {
        self.current.as_ref()
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        transport.subscribe(self.uuid).await?;
        Ok(Update::Dropped)
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        let frame = match decode_measurement(data) {
            Ok(frame) => frame,
            Err(e) => {
                // Lossy telemetry; drop the sample and move on
                debug!("Discarding malformed power measurement: {e}");
                return Update::Dropped;
            }
        };
        self.previous = self.current.replace(frame);
        self.update_derived();
        Update::Value
    }

    /// Recompute derived metrics from the (previous, current) pair.
    ///
    /// Deliberately an explicit step after the frame shift rather than a
    /// side effect of assignment, so ordering is auditable.
    fn update_derived(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        // Negative power is sensor noise; keep the previous reading
        if current.instantaneous_power >= 0 {
            self.instantaneous_power = Some(current.instantaneous_power as u16);
        }
        let Some(previous) = self.previous else {
            return;
        };

        if let (Some(revs), Some(ticks), Some(prev_revs), Some(prev_ticks)) = (
            current.wheel_revolutions,
            current.wheel_event_time,
            previous.wheel_revolutions,
            previous.wheel_event_time,
        ) {
            let delta_revs = revs.wrapping_sub(prev_revs);
            let delta_ticks = ticks.wrapping_sub(prev_ticks);
            // Equal timestamps mean no new wheel event; division would
            // blow up, and there's nothing to derive anyway
            if delta_ticks != 0 {
                let seconds = f64::from(delta_ticks) / f64::from(WHEEL_TIME_RESOLUTION);
                let km = f64::from(delta_revs) * self.wheel_circumference_cm / 100_000.0;
                self.speed_kph = Some(km / seconds * 3600.0);
            }
        }

        if let (Some(revs), Some(ticks), Some(prev_revs), Some(prev_ticks)) = (
            current.crank_revolutions,
            current.crank_event_time,
            previous.crank_revolutions,
            previous.crank_event_time,
        ) {
            let delta_revs = revs.wrapping_sub(prev_revs);
            let delta_ticks = ticks.wrapping_sub(prev_ticks);
            if delta_ticks != 0 {
                let seconds = f64::from(delta_ticks) / f64::from(CRANK_TIME_RESOLUTION);
                self.crank_rpm = Some(f64::from(delta_revs) / seconds * 60.0);
            }
        }
    }
}
