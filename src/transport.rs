use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::CommandError;

/// Whether a write needs the peripheral to acknowledge it.
///
/// Trainer control writes always want a response; fire-and-forget is kept
/// around for peripherals that only offer write-without-response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    WithResponse,
    WithoutResponse,
}

/// The slice of a connected peripheral the service layer actually touches.
///
/// Keyed by characteristic UUID rather than handle so handlers never hold
/// platform types. The real implementation lives in [`crate::ble`]; tests
/// substitute a recording mock.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, CommandError>;

    async fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
        kind: WriteKind,
    ) -> Result<(), CommandError>;

    /// Enable notifications for a characteristic.
    async fn subscribe(&self, characteristic: Uuid) -> Result<(), CommandError>;
}
