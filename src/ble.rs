//! btleplug glue: a [`Transport`] over a connected peripheral and the
//! notification-pump actor that feeds a [`CyclingPowerService`].
//!
//! Connection establishment, scanning and pairing are the embedder's
//! problem; this module starts from an already-connected
//! `btleplug::platform::Peripheral`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::codec::cycling_power::CYCLING_POWER_SERVICE_UUID;
use crate::errors::CommandError;
use crate::registry::CharacteristicRegistry;
use crate::service::{CyclingPowerService, ServiceConfig};
use crate::transport::{Transport, WriteKind};

/// [`Transport`] implementation over a connected btleplug peripheral,
/// resolving characteristic UUIDs against the discovered GATT table.
#[derive(Debug, Clone)]
pub struct BlePeripheralTransport {
    device: Peripheral,
}

impl BlePeripheralTransport {
    pub fn new(device: Peripheral) -> Self {
        Self { device }
    }

    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic, CommandError> {
        self.device
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
            .ok_or(CommandError::MissingCharacteristic(uuid))
    }
}

#[async_trait]
impl Transport for BlePeripheralTransport {
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, CommandError> {
        let characteristic = self.characteristic(characteristic)?;
        Ok(self.device.read(&characteristic).await?)
    }

    async fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
        kind: WriteKind,
    ) -> Result<(), CommandError> {
        let characteristic = self.characteristic(characteristic)?;
        let write_type = match kind {
            WriteKind::WithResponse => WriteType::WithResponse,
            WriteKind::WithoutResponse => WriteType::WithoutResponse,
        };
        Ok(self.device.write(&characteristic, payload, write_type).await?)
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<(), CommandError> {
        let characteristic = self.characteristic(characteristic)?;
        Ok(self.device.subscribe(&characteristic).await?)
    }
}

/// Pumps notifications from a connected peripheral into a
/// [`CyclingPowerService`] until cancellation, stream close, or silence.
pub struct PowerMonitor {
    device: Peripheral,
    service: Arc<Mutex<CyclingPowerService>>,
    no_packet_timeout: Duration,
    cancel_token: CancellationToken,
}

impl PowerMonitor {
    pub fn new(
        device: Peripheral,
        registry: Arc<CharacteristicRegistry>,
        config: ServiceConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let transport: Arc<dyn Transport> =
            Arc::new(BlePeripheralTransport::new(device.clone()));
        let service = Arc::new(Mutex::new(CyclingPowerService::new(
            registry, transport, config,
        )));
        Self {
            device,
            service,
            no_packet_timeout: Duration::from_secs(30),
            cancel_token,
        }
    }

    /// Shared handle to the service; lock it to read derived state or to
    /// issue trainer commands while the monitor runs.
    pub fn service(&self) -> Arc<Mutex<CyclingPowerService>> {
        Arc::clone(&self.service)
    }

    pub fn set_no_packet_timeout(&mut self, timeout: Duration) {
        self.no_packet_timeout = timeout;
    }

    /// Discover the Cycling Power characteristics, set up handlers, then
    /// pump notifications. Returns once the link is considered dead or
    /// the token is cancelled; handlers are released either way.
    pub async fn run(self) -> Result<(), CommandError> {
        self.device.discover_services().await?;
        let cps_characteristics: Vec<Uuid> = self
            .device
            .characteristics()
            .into_iter()
            .filter(|c| c.service_uuid == CYCLING_POWER_SERVICE_UUID)
            .map(|c| c.uuid)
            .collect();
        info!(
            "Found {} Cycling Power characteristics",
            cps_characteristics.len()
        );

        {
            let mut service = self.service.lock().await;
            for uuid in cps_characteristics {
                // One refused handler shouldn't take down the rest
                if let Err(e) = service.discover_characteristic(uuid).await {
                    warn!("Handler setup failed for {uuid}: {e}");
                }
            }
        }

        let mut notification_stream = self.device.notifications().await?;

        loop {
            tokio::select! {
                data = notification_stream.next() => {
                    match data {
                        Some(data) => {
                            self.service.lock().await.handle_notification(data.uuid, &data.value);
                        }
                        None => {
                            info!("Notification stream closed");
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(self.no_packet_timeout) => {
                    error!("No data received in {} seconds, assuming the link is dead",
                        self.no_packet_timeout.as_secs());
                    break;
                }
                _ = self.cancel_token.cancelled() => {
                    info!("Shutting down power monitor");
                    break;
                }
            }
        }

        self.service.lock().await.handle_disconnect();
        if self.device.is_connected().await.unwrap_or(false) {
            self.device.disconnect().await?;
        }
        Ok(())
    }
}
