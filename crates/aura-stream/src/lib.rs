//! Aura Stream - Sample buffers and transfers against the audio transport.
//!
//! The outbound (tx) buffer always holds a contiguous unsent prefix starting at
//! offset 0; partial writes are compacted. The inbound (rx) side is
//! all-or-nothing per call.
//!
//! Nothing here blocks. Callers poll [`transfer_bytes`] (or
//! [`StreamBuffers::exchange`]) once per service tick from a single context;
//! the buffers are not meant to be shared between execution contexts.

pub mod buffer;
pub mod transfer;

pub use buffer::{StreamBuffer, StreamBuffers};
pub use transfer::{RxOutcome, Transfer, TxOutcome, transfer_bytes, transfer_samples};
