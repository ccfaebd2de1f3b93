//! Descriptor decoder.
//!
//! Walks a descriptor byte stream and decodes every block this crate produces.
//! Class-specific interface subtypes overlap between AudioControl and
//! AudioStreaming, so the decoder tracks which interface subclass it is in.

use bytes::Buf;

use crate::constants::{
    AC_CLOCK_SOURCE, AC_FEATURE_UNIT, AC_HEADER, AC_INPUT_TERMINAL, AC_OUTPUT_TERMINAL,
    AS_FORMAT_TYPE, AS_GENERAL, CLASS_AUDIO, DESC_CS_ENDPOINT, DESC_CS_INTERFACE, DESC_ENDPOINT,
    DESC_INTERFACE, DESC_INTERFACE_ASSOCIATION, EP_GENERAL, EP_USAGE_FEEDBACK, FORMAT_TYPE_I,
    SUBCLASS_AUDIOCONTROL, SUBCLASS_AUDIOSTREAMING,
};
use crate::error::ParseError;
use crate::layout::{Block, BlockKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    None,
    Control,
    Streaming,
}

/// Decode a descriptor byte stream into blocks.
///
/// # Errors
/// Returns a [`ParseError`] on truncated input, malformed lengths, or any
/// descriptor this crate does not produce.
pub fn parse(bytes: &[u8]) -> Result<Vec<Block>, ParseError> {
    let mut blocks = Vec::new();
    let mut context = Context::None;
    let mut offset = 0;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < 2 {
            return Err(ParseError::Truncated { offset });
        }

        let length = rest[0];
        if length < 2 {
            return Err(ParseError::InvalidLength { offset, length });
        }
        if usize::from(length) > rest.len() {
            return Err(ParseError::Truncated { offset });
        }

        let raw = &rest[..usize::from(length)];
        let descriptor_type = raw[1];
        let subtype = raw.get(2).copied().unwrap_or_default();
        let unsupported = ParseError::Unsupported { offset, descriptor_type, subtype };

        let kind = match (descriptor_type, context) {
            (DESC_INTERFACE_ASSOCIATION, _) => BlockKind::InterfaceAssociation,
            (DESC_INTERFACE, _) => match raw.get(6).copied() {
                Some(SUBCLASS_AUDIOCONTROL) => BlockKind::ControlInterface,
                Some(SUBCLASS_AUDIOSTREAMING) => BlockKind::StreamingInterface,
                _ => return Err(unsupported),
            },
            (DESC_CS_INTERFACE, Context::Control) => match subtype {
                AC_HEADER => BlockKind::ControlHeader,
                AC_CLOCK_SOURCE => BlockKind::ClockSource,
                AC_INPUT_TERMINAL => BlockKind::InputTerminal,
                AC_FEATURE_UNIT => BlockKind::FeatureUnit,
                AC_OUTPUT_TERMINAL => BlockKind::OutputTerminal,
                _ => return Err(unsupported),
            },
            (DESC_CS_INTERFACE, Context::Streaming) => match subtype {
                AS_GENERAL => BlockKind::StreamingGeneral,
                AS_FORMAT_TYPE => BlockKind::FormatTypeI,
                _ => return Err(unsupported),
            },
            (DESC_CS_INTERFACE | DESC_CS_ENDPOINT, Context::None) => {
                return Err(ParseError::OutsideInterface { offset });
            }
            (DESC_CS_ENDPOINT, _) if subtype == EP_GENERAL => BlockKind::IsoDataEndpointGeneral,
            (DESC_ENDPOINT, _) => match raw.get(3).copied() {
                Some(attributes) if attributes & EP_USAGE_FEEDBACK != 0 => {
                    BlockKind::IsoFeedbackEndpoint
                }
                Some(_) => BlockKind::IsoDataEndpoint,
                None => return Err(unsupported),
            },
            _ => return Err(unsupported),
        };

        if length != kind.length() {
            return Err(ParseError::UnexpectedLength {
                offset,
                kind,
                length,
                expected: kind.length(),
            });
        }

        let block = decode(kind, &raw[2..]);
        match block {
            Block::ControlInterface { .. } => context = Context::Control,
            Block::StreamingInterface { .. } => context = Context::Streaming,
            _ => {}
        }
        if matches!(kind, BlockKind::FormatTypeI) && raw[3] != FORMAT_TYPE_I {
            return Err(unsupported);
        }
        if matches!(kind, BlockKind::ControlInterface | BlockKind::StreamingInterface)
            && raw[5] != CLASS_AUDIO
        {
            return Err(unsupported);
        }

        blocks.push(block);
        offset += usize::from(length);
    }

    Ok(blocks)
}

/// Decode the body of a block (everything after `bLength` and
/// `bDescriptorType`). The body length has already been checked.
fn decode(kind: BlockKind, mut body: &[u8]) -> Block {
    match kind {
        BlockKind::InterfaceAssociation => {
            let first_interface = body.get_u8();
            let interface_count = body.get_u8();
            body.advance(3); // class, subclass, protocol
            Block::InterfaceAssociation { first_interface, interface_count, function_string: body.get_u8() }
        }
        BlockKind::ControlInterface => {
            let interface = body.get_u8();
            body.advance(1); // alternate setting
            let endpoints = body.get_u8();
            body.advance(3);
            Block::ControlInterface { interface, endpoints, string: body.get_u8() }
        }
        BlockKind::StreamingInterface => {
            let interface = body.get_u8();
            let alternate = body.get_u8();
            let endpoints = body.get_u8();
            body.advance(3);
            Block::StreamingInterface { interface, alternate, endpoints, string: body.get_u8() }
        }
        BlockKind::ControlHeader => {
            body.advance(1);
            Block::ControlHeader {
                bcd_adc: body.get_u16_le(),
                category: body.get_u8(),
                total_length: body.get_u16_le(),
                controls: body.get_u8(),
            }
        }
        BlockKind::ClockSource => {
            body.advance(1);
            Block::ClockSource {
                id: body.get_u8(),
                attributes: body.get_u8(),
                controls: body.get_u8(),
                assoc_terminal: body.get_u8(),
                string: body.get_u8(),
            }
        }
        BlockKind::InputTerminal => {
            body.advance(1);
            Block::InputTerminal {
                id: body.get_u8(),
                terminal_type: body.get_u16_le(),
                assoc_terminal: body.get_u8(),
                clock: body.get_u8(),
                channels: body.get_u8(),
                channel_config: body.get_u32_le(),
                channel_names: body.get_u8(),
                controls: body.get_u16_le(),
                string: body.get_u8(),
            }
        }
        BlockKind::FeatureUnit => {
            body.advance(1);
            Block::FeatureUnit {
                id: body.get_u8(),
                source: body.get_u8(),
                master_controls: body.get_u32_le(),
                channel_controls: body.get_u32_le(),
                string: body.get_u8(),
            }
        }
        BlockKind::OutputTerminal => {
            body.advance(1);
            Block::OutputTerminal {
                id: body.get_u8(),
                terminal_type: body.get_u16_le(),
                assoc_terminal: body.get_u8(),
                source: body.get_u8(),
                clock: body.get_u8(),
                controls: body.get_u16_le(),
                string: body.get_u8(),
            }
        }
        BlockKind::StreamingGeneral => {
            body.advance(1);
            Block::StreamingGeneral {
                terminal_link: body.get_u8(),
                controls: body.get_u8(),
                format_type: body.get_u8(),
                formats: body.get_u32_le(),
                channels: body.get_u8(),
                channel_config: body.get_u32_le(),
                string: body.get_u8(),
            }
        }
        BlockKind::FormatTypeI => {
            body.advance(2); // subtype, format type
            Block::FormatTypeI { subslot_size: body.get_u8(), bit_resolution: body.get_u8() }
        }
        BlockKind::IsoDataEndpoint => Block::IsoDataEndpoint {
            address: body.get_u8(),
            attributes: body.get_u8(),
            max_packet_size: body.get_u16_le(),
            interval: body.get_u8(),
        },
        BlockKind::IsoFeedbackEndpoint => Block::IsoFeedbackEndpoint {
            address: body.get_u8(),
            attributes: body.get_u8(),
            max_packet_size: body.get_u16_le(),
            interval: body.get_u8(),
        },
        BlockKind::IsoDataEndpointGeneral => {
            body.advance(1);
            Block::IsoDataEndpointGeneral {
                attributes: body.get_u8(),
                controls: body.get_u8(),
                lock_delay_units: body.get_u8(),
                lock_delay: body.get_u16_le(),
            }
        }
    }
}
