//! Error types for the Aura audio function.

use thiserror::Error;

/// Core error type for audio function operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Unsupported channel count: {0} (only mono is supported)")]
    UnsupportedChannels(u8),

    #[error("Unsupported bit depth: {0} (must be 8, 10, 12 or 16)")]
    UnsupportedBitDepth(u8),

    #[error("Audio function is already registered with the device")]
    AlreadyRegistered,

    #[error("Device stack rejected the audio interface")]
    RegistrationRejected,

    #[error("No internal stream buffers (buffer_samples is 0)")]
    NoInternalBuffers,
}

/// Result type alias for audio function operations.
pub type Result<T> = std::result::Result<T, Error>;
