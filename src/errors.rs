use thiserror::Error;

/// Failure to make sense of a notification or read payload.
///
/// These are absorbed at the handler boundary: a bad frame is a dropped
/// sample over a lossy radio link, not something worth bubbling up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Buffer too short: got {got} bytes, needed {needed}")]
    TooShort { got: usize, needed: usize },
    #[error("Buffer truncated inside field: {0}")]
    Truncated(&'static str),
    #[error("Empty buffer")]
    Empty,
}

/// Failure to deliver a command to the peripheral.
///
/// Unlike decode failures, these are surfaced to the caller: when a
/// resistance change doesn't land, whoever asked for it needs to know.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Write rejected by transport: {0}")]
    Write(String),
    #[error("Read failed: {0}")]
    Read(String),
    #[error("Subscribe failed: {0}")]
    Subscribe(String),
    #[error("Bluetooth Error: {0}")]
    Bt(#[from] btleplug::Error),
    #[error("Characteristic {0} not present on peripheral")]
    MissingCharacteristic(uuid::Uuid),
}
