//! Aura Descriptor - UAC2 interface descriptor for a mono, full-duplex,
//! asynchronous isochronous audio function.
//!
//! The descriptor is described declaratively: [`layout::LAYOUT`] fixes the
//! ordered block kinds and their lengths, and [`layout::layout`] maps the
//! numbers assigned at enumeration time onto block contents. The
//! [`DescriptorBuilder`] folds that table into bytes, and [`parse`] decodes
//! bytes back into [`Block`]s.

pub mod builder;
pub mod constants;
pub mod error;
pub mod layout;
pub mod parser;

pub use builder::DescriptorBuilder;
pub use error::{DescriptorError, ParseError};
pub use layout::{Assignment, Block, BlockKind, DESCRIPTOR_LEN, EntityIds, StringIndices};
pub use parser::parse;
