use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;
use wattlink::errors::CommandError;
use wattlink::{CharacteristicRegistry, CyclingPowerService, ServiceConfig, Transport, WriteKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
}

/// In-memory peripheral: records writes and subscriptions, serves canned
/// read values, and can be told to start rejecting writes.
#[derive(Debug, Default)]
pub struct MockTransport {
    writes: Mutex<Vec<RecordedWrite>>,
    subscriptions: Mutex<Vec<Uuid>>,
    read_values: Mutex<HashMap<Uuid, Vec<u8>>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_read_value(&self, characteristic: Uuid, value: Vec<u8>) {
        self.read_values
            .lock()
            .unwrap()
            .insert(characteristic, value);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Payloads written to one characteristic, in order.
    pub fn payloads_for(&self, characteristic: Uuid) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|w| w.characteristic == characteristic)
            .map(|w| w.payload)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<Uuid> {
        self.subscriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, CommandError> {
        self.read_values
            .lock()
            .unwrap()
            .get(&characteristic)
            .cloned()
            .ok_or_else(|| CommandError::Read("no canned value".into()))
    }

    async fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
        _kind: WriteKind,
    ) -> Result<(), CommandError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CommandError::Write("mock transport rejecting writes".into()));
        }
        self.writes.lock().unwrap().push(RecordedWrite {
            characteristic,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<(), CommandError> {
        self.subscriptions.lock().unwrap().push(characteristic);
        Ok(())
    }
}

/// A service over a fresh mock transport, with the Wahoo extension active.
#[allow(dead_code)]
pub fn service_with_mock() -> (CyclingPowerService, Arc<MockTransport>) {
    let registry = Arc::new(CharacteristicRegistry::with_builtins());
    wattlink::characteristics::trainer::activate(&registry);
    let transport = MockTransport::new();
    let shared: Arc<dyn Transport> = transport.clone();
    let service = CyclingPowerService::new(registry, shared, ServiceConfig::default());
    (service, transport)
}
