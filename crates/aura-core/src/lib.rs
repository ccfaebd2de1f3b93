//! Aura Core - Shared types for the UAC2 audio function.
//!
//! This crate holds the audio function configuration, the error taxonomy, and
//! the traits describing the USB device stack and isochronous transport that the
//! descriptor builder and stream manager consume.

pub mod config;
pub mod error;
pub mod usb;

pub use config::{AudioFunctionConfig, BitDepth, StringNames};
pub use error::{Error, Result};
pub use usb::{
    AudioTransport, DeviceStack, Direction, EndpointAddress, InterfaceAllocator, StringTable,
    UsbInterface,
};
