//! Aura Function - a mono, full-duplex UAC2 audio function.
//!
//! [`AudioFunction`] registers its strings and interface with a device stack,
//! answers the stack's descriptor queries and moves sample data through an
//! [`aura_core::AudioTransport`] on every service tick. The [`loopback`] module
//! provides an in-memory device stack and transport for hosts without hardware.

pub mod function;
pub mod loopback;

pub use function::AudioFunction;
pub use loopback::{LoopbackDevice, LoopbackTransport};
