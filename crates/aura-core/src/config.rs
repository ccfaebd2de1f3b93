//! Audio function configuration.
//!
//! The configuration is fixed at construction time. Channel count, bit depth and
//! buffer depth cannot change once an [`AudioFunctionConfig`] has been handed to
//! the audio function.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of samples per channel buffered internally by default.
pub const DEFAULT_BUFFER_SAMPLES: u16 = 32;

/// Sample resolution of the audio function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    /// 8-bit samples, one byte each
    Eight,
    /// 10-bit samples in a two-byte container
    Ten,
    /// 12-bit samples in a two-byte container
    Twelve,
    /// 16-bit samples
    #[default]
    Sixteen,
}

impl BitDepth {
    /// Number of significant bits per sample.
    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            Self::Eight => 8,
            Self::Ten => 10,
            Self::Twelve => 12,
            Self::Sixteen => 16,
        }
    }

    /// Bytes needed to carry one sample, rounded up to whole bytes.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        usize::from(self.bits().div_ceil(8))
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(Self::Eight),
            10 => Ok(Self::Ten),
            12 => Ok(Self::Twelve),
            16 => Ok(Self::Sixteen),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

/// Texts registered with the device string table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringNames {
    /// Name of both feature units (mute/volume controls)
    #[serde(default = "default_feature_unit_name")]
    pub feature_unit: String,
    /// Name of the analog output terminal
    #[serde(default = "default_output_terminal_name")]
    pub output_terminal: String,
    /// Name of the analog input terminal
    #[serde(default = "default_input_terminal_name")]
    pub input_terminal: String,
    /// Name of the audio interface collection
    #[serde(default = "default_collection_name")]
    pub collection: String,
    /// Whether the collection name is registered and referenced by the
    /// interface association descriptor
    #[serde(default)]
    pub register_collection: bool,
}

impl Default for StringNames {
    fn default() -> Self {
        Self {
            feature_unit: default_feature_unit_name(),
            output_terminal: default_output_terminal_name(),
            input_terminal: default_input_terminal_name(),
            collection: default_collection_name(),
            register_collection: false,
        }
    }
}

fn default_feature_unit_name() -> String {
    "AURA Controls".to_string()
}

fn default_output_terminal_name() -> String {
    "Analog out".to_string()
}

fn default_input_terminal_name() -> String {
    "Analog in".to_string()
}

fn default_collection_name() -> String {
    "AURA MGP01".to_string()
}

/// Immutable configuration of one audio function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFunctionConfig {
    /// Logical channel count (only 1 is supported)
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Sample resolution
    #[serde(default)]
    pub bit_depth: BitDepth,
    /// Samples per channel held in each internal buffer; 0 means the caller
    /// supplies buffers on every update
    #[serde(default = "default_buffer_samples")]
    pub buffer_samples: u16,
    /// String descriptor texts
    #[serde(default)]
    pub names: StringNames,
}

impl Default for AudioFunctionConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            bit_depth: BitDepth::default(),
            buffer_samples: default_buffer_samples(),
            names: StringNames::default(),
        }
    }
}

fn default_channels() -> u8 {
    1
}

fn default_buffer_samples() -> u16 {
    DEFAULT_BUFFER_SAMPLES
}

impl AudioFunctionConfig {
    /// Create a configuration with default string names.
    #[must_use]
    pub fn new(channels: u8, bit_depth: BitDepth, buffer_samples: u16) -> Self {
        Self { channels, bit_depth, buffer_samples, names: StringNames::default() }
    }

    /// Create a single-channel configuration.
    #[must_use]
    pub fn mono(bit_depth: BitDepth, buffer_samples: u16) -> Self {
        Self::new(1, bit_depth, buffer_samples)
    }

    /// Check the configuration against what the function can describe.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedChannels`] for anything other than one channel.
    pub fn validate(&self) -> Result<()> {
        if self.channels != 1 {
            return Err(Error::UnsupportedChannels(self.channels));
        }
        Ok(())
    }

    /// Bytes per sample for the configured bit depth.
    #[must_use]
    pub fn bytes_per_sample(&self) -> usize {
        self.bit_depth.bytes_per_sample()
    }

    /// Size in bytes of each internal stream buffer.
    #[must_use]
    pub fn buffer_bytes(&self) -> usize {
        usize::from(self.channels) * self.bytes_per_sample() * usize::from(self.buffer_samples)
    }

    /// Whether the function allocates and owns its stream buffers.
    #[must_use]
    pub fn uses_internal_buffers(&self) -> bool {
        self.buffer_samples > 0
    }
}
