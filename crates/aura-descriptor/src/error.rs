//! Descriptor error types.

use aura_core::Direction;
use thiserror::Error;

use crate::layout::BlockKind;

/// Errors produced while building the interface descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Descriptor buffer too small: need {required} bytes, have {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error("Descriptor layout mismatch: wrote {written} bytes, expected {expected}")]
    LayoutMismatch { written: usize, expected: usize },

    #[error("Allocator returned endpoint {address:#04x}, expected an {expected:?} endpoint")]
    EndpointDirection { address: u8, expected: Direction },
}

/// Errors produced while decoding descriptor bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Descriptor truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("Invalid bLength {length} at offset {offset}")]
    InvalidLength { offset: usize, length: u8 },

    #[error("Unsupported descriptor type {descriptor_type:#04x}/{subtype:#04x} at offset {offset}")]
    Unsupported { offset: usize, descriptor_type: u8, subtype: u8 },

    #[error("{kind:?} at offset {offset} has bLength {length}, expected {expected}")]
    UnexpectedLength { offset: usize, kind: BlockKind, length: u8, expected: u8 },

    #[error("Class-specific descriptor at offset {offset} precedes any audio interface")]
    OutsideInterface { offset: usize },
}
