//! Wahoo Trainer vendor characteristic handler.
//!
//! Owns the outbound command surface and the ERG-mode write throttle.
//! Trainers need a couple of seconds to settle after a resistance change,
//! and flooding the link with every intermediate target makes them hunt.
//! ERG targets are therefore coalesced: at most one write per period,
//! always carrying the latest requested wattage.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Handler, Update};
use crate::codec::wahoo::{self, WAHOO_TRAINER_CHARACTERISTIC_UUID};
use crate::errors::CommandError;
use crate::registry::CharacteristicRegistry;
use crate::transport::{Transport, WriteKind};

/// Minimum interval between ERG writes, giving the trainer time to
/// react and apply the previous setting.
pub const DEFAULT_ERG_WRITE_PERIOD: Duration = Duration::from_secs(2);

/// Registers the Wahoo Trainer characteristic with a registry.
///
/// Vendor extension entry point; call before or after discovery starts.
/// Registration is last-writer-wins, so re-activating is harmless.
pub fn activate(registry: &CharacteristicRegistry) {
    debug!("Activating Wahoo Trainer characteristic");
    registry.register(WAHOO_TRAINER_CHARACTERISTIC_UUID, |uuid| {
        Handler::WahooTrainer(WahooTrainer::new(uuid))
    });
}

#[derive(Debug)]
pub struct WahooTrainer {
    uuid: Uuid,
    transport: Option<Arc<dyn Transport>>,
    erg_write_period: Duration,
    /// Latest requested wattage not yet flushed to the trainer.
    /// Shared with the schedule task.
    erg_target: Arc<Mutex<Option<u16>>>,
    erg_cancel: Option<CancellationToken>,
    last_response: Option<Vec<u8>>,
}

impl WahooTrainer {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            transport: None,
            erg_write_period: DEFAULT_ERG_WRITE_PERIOD,
            erg_target: Arc::new(Mutex::new(None)),
            erg_cancel: None,
            last_response: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn set_erg_write_period(&mut self, period: Duration) {
        self.erg_write_period = period;
    }

    /// Raw bytes of the trainer's last notification, if any.
    pub fn last_response(&self) -> Option<&[u8]> {
        self.last_response.as_deref()
    }

    /// Whether a recurring ERG write schedule is currently running.
    pub fn erg_active(&self) -> bool {
        self.erg_cancel
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        transport.subscribe(self.uuid).await?;
        // The trainer ignores every command until it sees the unlock
        transport
            .write(self.uuid, &wahoo::unlock(), WriteKind::WithResponse)
            .await?;
        self.transport = Some(Arc::clone(transport));
        Ok(Update::Dropped)
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        self.last_response = Some(data.to_vec());
        Update::Value
    }

    /// Target a constant power output.
    ///
    /// The first call flushes immediately and starts the recurring
    /// schedule; further calls within a period just replace the pending
    /// target, so rapid requests collapse to one write carrying the
    /// latest wattage.
    pub async fn set_erg_mode(&mut self, watts: u16) -> Result<(), CommandError> {
        *self.erg_target.lock().unwrap() = Some(watts);
        if self.erg_active() {
            return Ok(());
        }
        let transport = self.transport()?;
        flush_erg(transport.as_ref(), self.uuid, &self.erg_target).await?;
        self.start_erg_schedule(transport);
        Ok(())
    }

    /// Set brake force as a fraction of maximum (`0.0..=1.0`). Exits ERG mode.
    pub async fn set_resistance_mode(&mut self, resistance: f32) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_resistance_mode(resistance)).await
    }

    /// Select one of the trainer's progressive resistance curves. Exits ERG mode.
    pub async fn set_standard_mode(&mut self, level: u8) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_standard_mode(level)).await
    }

    /// Enter physics simulation mode. Exits ERG mode.
    pub async fn set_sim_mode(
        &mut self,
        weight_kg: f32,
        crr: f32,
        wind_resistance: f32,
    ) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_sim_mode(weight_kg, crr, wind_resistance))
            .await
    }

    pub async fn set_sim_crr(&mut self, crr: f32) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_sim_crr(crr)).await
    }

    pub async fn set_sim_wind_resistance(
        &mut self,
        wind_resistance: f32,
    ) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_sim_wind_resistance(wind_resistance))
            .await
    }

    /// Simulated grade, `-1.0..=1.0`. Exits ERG mode.
    pub async fn set_sim_grade(&mut self, grade: f32) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_sim_grade(grade)).await
    }

    /// Simulated wind speed in m/s, headwind positive. Exits ERG mode.
    pub async fn set_sim_wind_speed(&mut self, meters_per_second: f32) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_sim_wind_speed(meters_per_second))
            .await
    }

    pub async fn set_wheel_circumference(&mut self, millimeters: f32) -> Result<(), CommandError> {
        self.cancel_erg();
        self.write(&wahoo::set_wheel_circumference(millimeters))
            .await
    }

    /// Stop the recurring ERG schedule and discard any pending target.
    /// Idempotent; cancelling an idle trainer is a no-op.
    pub fn cancel_erg(&mut self) {
        if let Some(token) = self.erg_cancel.take() {
            token.cancel();
        }
        *self.erg_target.lock().unwrap() = None;
    }

    fn start_erg_schedule(&mut self, transport: Arc<dyn Transport>) {
        let token = CancellationToken::new();
        self.erg_cancel = Some(token.clone());

        let uuid = self.uuid;
        let period = self.erg_write_period;
        let target = Arc::clone(&self.erg_target);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; that flush already happened
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = flush_erg(transport.as_ref(), uuid, &target).await {
                            // The trainer is probably gone; don't retry forever
                            warn!("ERG write failed, stopping schedule: {e}");
                            *target.lock().unwrap() = None;
                            token.cancel();
                            break;
                        }
                    }
                }
            }
        });
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, CommandError> {
        self.transport
            .clone()
            .ok_or_else(|| CommandError::Write("trainer handler not attached".into()))
    }

    async fn write(&self, payload: &[u8]) -> Result<(), CommandError> {
        self.transport()?
            .write(self.uuid, payload, WriteKind::WithResponse)
            .await
    }
}

/// Write the pending ERG target, if there is one.
///
/// Clears the pending slot only when the written value is still the
/// latest one, so a target that arrived mid-write isn't lost. A firing
/// with nothing pending is a no-op, not a retransmission.
async fn flush_erg(
    transport: &dyn Transport,
    uuid: Uuid,
    target: &Mutex<Option<u16>>,
) -> Result<(), CommandError> {
    let Some(watts) = *target.lock().unwrap() else {
        return Ok(());
    };
    transport
        .write(uuid, &wahoo::set_erg_watts(watts), WriteKind::WithResponse)
        .await?;
    let mut pending = target.lock().unwrap();
    if *pending == Some(watts) {
        *pending = None;
    }
    Ok(())
}

impl Drop for WahooTrainer {
    fn drop(&mut self) {
        // No dangling periodic writer may outlive the handler
        if let Some(token) = self.erg_cancel.take() {
            token.cancel();
        }
    }
}
