//! Pure byte-level codecs for the Cycling Power service and the Wahoo
//! Trainer vendor extension.
//!
//! Everything in here is stateless: decoders take a notification/read
//! payload and either produce a typed record or say why they couldn't,
//! encoders take typed parameters and produce a command buffer. Handlers
//! own all state.

pub mod cycling_power;
pub mod wahoo;
