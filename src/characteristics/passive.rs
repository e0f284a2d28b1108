//! Present-but-inert handlers.
//!
//! The Vector and Control Point characteristics are subscribed to and
//! their payloads retained, but nothing interprets them yet: there's no
//! sourced wire contract for per-pedal force arrays or control point
//! responses, so they stay pass-through rather than guessing.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::Update;
use crate::codec::cycling_power::{decode_vector, VectorFrame};
use crate::errors::CommandError;
use crate::transport::Transport;

/// Handler for the Cycling Power Vector characteristic (0x2A64).
#[derive(Debug)]
pub struct PowerVector {
    uuid: Uuid,
    last: Option<VectorFrame>,
}

impl PowerVector {
    pub fn new(uuid: Uuid) -> Self {
        Self { uuid, last: None }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn last_frame(&self) -> Option<&VectorFrame> {
        self.last.as_ref()
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        transport.subscribe(self.uuid).await?;
        Ok(Update::Dropped)
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        match decode_vector(data) {
            Ok(frame) => {
                self.last = Some(frame);
                Update::Value
            }
            Err(e) => {
                debug!("Discarding empty vector payload: {e}");
                Update::Dropped
            }
        }
    }
}

/// Handler for the Cycling Power Control Point characteristic (0x2A66).
#[derive(Debug)]
pub struct ControlPoint {
    uuid: Uuid,
    last_response: Option<Vec<u8>>,
}

impl ControlPoint {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            last_response: None,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn last_response(&self) -> Option<&[u8]> {
        self.last_response.as_deref()
    }

    pub(crate) async fn setup(
        &mut self,
        transport: &Arc<dyn Transport>,
    ) -> Result<Update, CommandError> {
        transport.subscribe(self.uuid).await?;
        Ok(Update::Dropped)
    }

    pub(crate) fn handle_bytes(&mut self, data: &[u8]) -> Update {
        self.last_response = Some(data.to_vec());
        Update::Value
    }
}
