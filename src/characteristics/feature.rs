use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Update;
use crate::codec::cycling_power::{decode_features, PowerFeatures};
use crate::errors::CommandError;
use crate::transport::Transport;

/// Handler for the Cycling Power Feature characteristic (0x2A65).
///
/// Issues a read on setup. Each successful decode surfaces as
/// [`Update::Features`] so the service can fire the one-shot
/// features-identified event that gates downstream logic (UI enabling
/// controls, deciding whether wheel data will ever arrive), distinct
/// from the generic value-updated notification.
#[derive(Debug)]
pub struct PowerFeature {
    uuid: Uuid,
    features: Option<PowerFeatures>,
}

impl PowerFeature {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            features: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn features(&self) -> Option<PowerFeatures> {
        self.features
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        let value = transport.read(self.uuid).await?;
        Ok(self.handle_bytes(&value))
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        match decode_features(data) {
            Ok(features) => {
                self.features = Some(features);
                Update::Features(features)
            }
            Err(e) => {
                debug!("Discarding malformed feature payload: {e}");
                Update::Dropped
            }
        }
    }
}
