use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Update;
use crate::codec::cycling_power::{decode_sensor_location, SensorLocation};
use crate::errors::CommandError;
use crate::transport::Transport;

/// Handler for the Sensor Location characteristic (0x2A5D).
///
/// Read once on setup; sensors don't migrate around the bike mid-ride.
#[derive(Debug)]
pub struct SensorPlacement {
    uuid: Uuid,
    location: Option<SensorLocation>,
}

impl SensorPlacement {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            location: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn location(&self) -> Option<SensorLocation> {
        self.location
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        let value = transport.read(self.uuid).await?;
        Ok(self.handle_bytes(&value))
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        match decode_sensor_location(data) {
            Ok(location) => {
                self.location = Some(location);
                Update::Value
            }
            Err(e) => {
                debug!("Discarding malformed sensor location: {e}");
                Update::Dropped
            }
        }
    }
}
