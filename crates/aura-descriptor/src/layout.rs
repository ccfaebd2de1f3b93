//! Declarative descriptor layout.
//!
//! [`LAYOUT`] is the ordered list of block kinds. Every kind has a fixed
//! `bLength`, so the total descriptor length is known before any number has
//! been allocated. [`layout`] turns an [`Assignment`] into the block contents
//! in the same order.

use aura_core::EndpointAddress;
use bytes::BufMut;
use serde::Serialize;

use crate::constants::{
    AC_CLOCK_SOURCE, AC_FEATURE_UNIT, AC_HEADER, AC_INPUT_TERMINAL, AC_OUTPUT_TERMINAL,
    AS_FORMAT_TYPE, AS_GENERAL, BCD_ADC, BIT_RESOLUTION, CATEGORY_MUSICAL_INSTRUMENT,
    CHANNEL_FRONT_CENTER, CLASS_AUDIO, CLOCK_INTERNAL_FIXED, CLOCK_SYNCED_TO_SOF,
    DESC_CS_ENDPOINT, DESC_CS_INTERFACE, DESC_ENDPOINT, DESC_INTERFACE,
    DESC_INTERFACE_ASSOCIATION, EP_GENERAL, FORMAT_PCM, FORMAT_TYPE_I,
    FU_MUTE_PROGRAMMABLE, FUNCTION_PROTOCOL_AF_VERSION_02_00, INTERFACE_COUNT,
    ISO_DATA_ATTRIBUTES, ISO_FEEDBACK_ATTRIBUTES, MAX_PACKET_SIZE, POLLING_INTERVAL,
    PROTOCOL_IP_VERSION_02_00, SUBCLASS_AUDIOCONTROL, SUBCLASS_AUDIOSTREAMING,
    SUBCLASS_UNDEFINED, SUBSLOT_SIZE, TERMINAL_ANALOG_CONNECTOR, TERMINAL_USB_STREAMING,
};

/// Kind of descriptor block, with its fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Interface Association Descriptor
    InterfaceAssociation,
    /// Standard AudioControl interface descriptor
    ControlInterface,
    /// Class-specific AudioControl interface header
    ControlHeader,
    /// Clock Source descriptor
    ClockSource,
    /// Input Terminal descriptor
    InputTerminal,
    /// Feature Unit descriptor with a master and one logical channel
    FeatureUnit,
    /// Output Terminal descriptor
    OutputTerminal,
    /// Standard AudioStreaming interface descriptor (one per alternate setting)
    StreamingInterface,
    /// Class-specific AudioStreaming general descriptor
    StreamingGeneral,
    /// Type I format descriptor
    FormatTypeI,
    /// Standard isochronous audio data endpoint
    IsoDataEndpoint,
    /// Class-specific isochronous audio data endpoint
    IsoDataEndpointGeneral,
    /// Standard isochronous feedback endpoint
    IsoFeedbackEndpoint,
}

impl BlockKind {
    /// `bLength` of this kind of block.
    #[must_use]
    pub const fn length(self) -> u8 {
        match self {
            Self::InterfaceAssociation | Self::ClockSource | Self::IsoDataEndpointGeneral => 8,
            Self::ControlInterface | Self::ControlHeader | Self::StreamingInterface => 9,
            Self::InputTerminal => 17,
            Self::FeatureUnit => 14,
            Self::OutputTerminal => 12,
            Self::StreamingGeneral => 16,
            Self::FormatTypeI => 6,
            Self::IsoDataEndpoint | Self::IsoFeedbackEndpoint => 7,
        }
    }

    /// Whether the block is counted by the AudioControl header's `wTotalLength`.
    #[must_use]
    pub const fn is_control_class_specific(self) -> bool {
        matches!(
            self,
            Self::ControlHeader
                | Self::ClockSource
                | Self::InputTerminal
                | Self::FeatureUnit
                | Self::OutputTerminal
        )
    }
}

/// Number of blocks in the descriptor.
pub const BLOCK_COUNT: usize = 17;

/// Ordered block kinds making up the interface descriptor.
pub const LAYOUT: [BlockKind; BLOCK_COUNT] = [
    BlockKind::InterfaceAssociation,
    BlockKind::ControlInterface,
    BlockKind::ControlHeader,
    BlockKind::ClockSource,
    // USB -> analog out
    BlockKind::InputTerminal,
    BlockKind::FeatureUnit,
    BlockKind::OutputTerminal,
    // analog in -> USB
    BlockKind::InputTerminal,
    BlockKind::FeatureUnit,
    BlockKind::OutputTerminal,
    BlockKind::StreamingInterface,
    BlockKind::StreamingInterface,
    BlockKind::StreamingGeneral,
    BlockKind::FormatTypeI,
    BlockKind::IsoDataEndpoint,
    BlockKind::IsoDataEndpointGeneral,
    BlockKind::IsoFeedbackEndpoint,
];

const fn sum_lengths(control_only: bool) -> u16 {
    let mut total = 0u16;
    let mut i = 0;
    while i < LAYOUT.len() {
        if !control_only || LAYOUT[i].is_control_class_specific() {
            total += LAYOUT[i].length() as u16;
        }
        i += 1;
    }
    total
}

/// Total length of the interface descriptor in bytes.
pub const DESCRIPTOR_LEN: u16 = sum_lengths(false);

/// `wTotalLength` of the class-specific AudioControl interface: the header plus
/// every clock, terminal and unit descriptor.
pub const CONTROL_TOTAL_LEN: u16 = sum_lengths(true);

/// Entity IDs shared by clock, terminals and units.
///
/// IDs are handed out sequentially from 1 in descriptor order, and later blocks
/// refer back to them. Changing the number of terminals means re-deriving the
/// whole chain here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityIds {
    pub clock: u8,
    /// Input terminal fed by the USB streaming endpoint
    pub usb_input: u8,
    /// Feature unit on the playback path
    pub playback_unit: u8,
    /// Analog output terminal (DAC side)
    pub analog_output: u8,
    /// Analog input terminal (ADC side)
    pub analog_input: u8,
    /// Feature unit on the capture path
    pub capture_unit: u8,
    /// Output terminal towards the USB host
    pub usb_output: u8,
}

impl EntityIds {
    /// Assign IDs in descriptor order starting at 1.
    #[must_use]
    pub fn assign() -> Self {
        let mut next = 1u8..;
        let mut take = || next.next().unwrap_or_default();

        Self {
            clock: take(),
            usb_input: take(),
            playback_unit: take(),
            analog_output: take(),
            analog_input: take(),
            capture_unit: take(),
            usb_output: take(),
        }
    }
}

impl Default for EntityIds {
    fn default() -> Self {
        Self::assign()
    }
}

/// Indices of the strings referenced from the descriptor (0 = no string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StringIndices {
    pub collection: u8,
    pub feature_unit: u8,
    pub output_terminal: u8,
    pub input_terminal: u8,
}

/// Numbers assigned to one audio function at enumeration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// First of the two consecutive interface numbers (AudioControl)
    pub first_interface: u8,
    /// OUT endpoint carrying host-to-device audio
    pub data_endpoint: EndpointAddress,
    /// IN endpoint carrying explicit feedback
    pub feedback_endpoint: EndpointAddress,
    pub strings: StringIndices,
    pub ids: EntityIds,
}

impl Assignment {
    /// Interface number of the AudioStreaming interface.
    #[must_use]
    pub fn streaming_interface(&self) -> u8 {
        self.first_interface + 1
    }
}

/// One descriptor block with its variable fields.
///
/// Constant fields (descriptor types, class codes) are written by
/// [`Block::write`] and checked by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Block {
    InterfaceAssociation { first_interface: u8, interface_count: u8, function_string: u8 },
    ControlInterface { interface: u8, endpoints: u8, string: u8 },
    ControlHeader { bcd_adc: u16, category: u8, total_length: u16, controls: u8 },
    ClockSource { id: u8, attributes: u8, controls: u8, assoc_terminal: u8, string: u8 },
    InputTerminal {
        id: u8,
        terminal_type: u16,
        assoc_terminal: u8,
        clock: u8,
        channels: u8,
        channel_config: u32,
        channel_names: u8,
        controls: u16,
        string: u8,
    },
    FeatureUnit { id: u8, source: u8, master_controls: u32, channel_controls: u32, string: u8 },
    OutputTerminal {
        id: u8,
        terminal_type: u16,
        assoc_terminal: u8,
        source: u8,
        clock: u8,
        controls: u16,
        string: u8,
    },
    StreamingInterface { interface: u8, alternate: u8, endpoints: u8, string: u8 },
    StreamingGeneral {
        terminal_link: u8,
        controls: u8,
        format_type: u8,
        formats: u32,
        channels: u8,
        channel_config: u32,
        string: u8,
    },
    FormatTypeI { subslot_size: u8, bit_resolution: u8 },
    IsoDataEndpoint { address: u8, attributes: u8, max_packet_size: u16, interval: u8 },
    IsoDataEndpointGeneral { attributes: u8, controls: u8, lock_delay_units: u8, lock_delay: u16 },
    IsoFeedbackEndpoint { address: u8, attributes: u8, max_packet_size: u16, interval: u8 },
}

impl Block {
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::InterfaceAssociation { .. } => BlockKind::InterfaceAssociation,
            Self::ControlInterface { .. } => BlockKind::ControlInterface,
            Self::ControlHeader { .. } => BlockKind::ControlHeader,
            Self::ClockSource { .. } => BlockKind::ClockSource,
            Self::InputTerminal { .. } => BlockKind::InputTerminal,
            Self::FeatureUnit { .. } => BlockKind::FeatureUnit,
            Self::OutputTerminal { .. } => BlockKind::OutputTerminal,
            Self::StreamingInterface { .. } => BlockKind::StreamingInterface,
            Self::StreamingGeneral { .. } => BlockKind::StreamingGeneral,
            Self::FormatTypeI { .. } => BlockKind::FormatTypeI,
            Self::IsoDataEndpoint { .. } => BlockKind::IsoDataEndpoint,
            Self::IsoDataEndpointGeneral { .. } => BlockKind::IsoDataEndpointGeneral,
            Self::IsoFeedbackEndpoint { .. } => BlockKind::IsoFeedbackEndpoint,
        }
    }

    /// Append the wire encoding of this block, `bLength` first.
    pub fn write<B: BufMut>(&self, out: &mut B) {
        out.put_u8(self.kind().length());

        match *self {
            Self::InterfaceAssociation { first_interface, interface_count, function_string } => {
                out.put_u8(DESC_INTERFACE_ASSOCIATION);
                out.put_u8(first_interface);
                out.put_u8(interface_count);
                out.put_u8(CLASS_AUDIO);
                out.put_u8(SUBCLASS_UNDEFINED);
                out.put_u8(FUNCTION_PROTOCOL_AF_VERSION_02_00);
                out.put_u8(function_string);
            }
            Self::ControlInterface { interface, endpoints, string } => {
                put_interface(out, interface, 0, endpoints, SUBCLASS_AUDIOCONTROL, string);
            }
            Self::ControlHeader { bcd_adc, category, total_length, controls } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AC_HEADER);
                out.put_u16_le(bcd_adc);
                out.put_u8(category);
                out.put_u16_le(total_length);
                out.put_u8(controls);
            }
            Self::ClockSource { id, attributes, controls, assoc_terminal, string } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AC_CLOCK_SOURCE);
                out.put_u8(id);
                out.put_u8(attributes);
                out.put_u8(controls);
                out.put_u8(assoc_terminal);
                out.put_u8(string);
            }
            Self::InputTerminal {
                id,
                terminal_type,
                assoc_terminal,
                clock,
                channels,
                channel_config,
                channel_names,
                controls,
                string,
            } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AC_INPUT_TERMINAL);
                out.put_u8(id);
                out.put_u16_le(terminal_type);
                out.put_u8(assoc_terminal);
                out.put_u8(clock);
                out.put_u8(channels);
                out.put_u32_le(channel_config);
                out.put_u8(channel_names);
                out.put_u16_le(controls);
                out.put_u8(string);
            }
            Self::FeatureUnit { id, source, master_controls, channel_controls, string } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AC_FEATURE_UNIT);
                out.put_u8(id);
                out.put_u8(source);
                out.put_u32_le(master_controls);
                out.put_u32_le(channel_controls);
                out.put_u8(string);
            }
            Self::OutputTerminal { id, terminal_type, assoc_terminal, source, clock, controls, string } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AC_OUTPUT_TERMINAL);
                out.put_u8(id);
                out.put_u16_le(terminal_type);
                out.put_u8(assoc_terminal);
                out.put_u8(source);
                out.put_u8(clock);
                out.put_u16_le(controls);
                out.put_u8(string);
            }
            Self::StreamingInterface { interface, alternate, endpoints, string } => {
                put_interface(out, interface, alternate, endpoints, SUBCLASS_AUDIOSTREAMING, string);
            }
            Self::StreamingGeneral {
                terminal_link,
                controls,
                format_type,
                formats,
                channels,
                channel_config,
                string,
            } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AS_GENERAL);
                out.put_u8(terminal_link);
                out.put_u8(controls);
                out.put_u8(format_type);
                out.put_u32_le(formats);
                out.put_u8(channels);
                out.put_u32_le(channel_config);
                out.put_u8(string);
            }
            Self::FormatTypeI { subslot_size, bit_resolution } => {
                out.put_u8(DESC_CS_INTERFACE);
                out.put_u8(AS_FORMAT_TYPE);
                out.put_u8(FORMAT_TYPE_I);
                out.put_u8(subslot_size);
                out.put_u8(bit_resolution);
            }
            Self::IsoDataEndpoint { address, attributes, max_packet_size, interval }
            | Self::IsoFeedbackEndpoint { address, attributes, max_packet_size, interval } => {
                out.put_u8(DESC_ENDPOINT);
                out.put_u8(address);
                out.put_u8(attributes);
                out.put_u16_le(max_packet_size);
                out.put_u8(interval);
            }
            Self::IsoDataEndpointGeneral { attributes, controls, lock_delay_units, lock_delay } => {
                out.put_u8(DESC_CS_ENDPOINT);
                out.put_u8(EP_GENERAL);
                out.put_u8(attributes);
                out.put_u8(controls);
                out.put_u8(lock_delay_units);
                out.put_u16_le(lock_delay);
            }
        }
    }
}

fn put_interface<B: BufMut>(
    out: &mut B,
    interface: u8,
    alternate: u8,
    endpoints: u8,
    subclass: u8,
    string: u8,
) {
    out.put_u8(DESC_INTERFACE);
    out.put_u8(interface);
    out.put_u8(alternate);
    out.put_u8(endpoints);
    out.put_u8(CLASS_AUDIO);
    out.put_u8(subclass);
    out.put_u8(PROTOCOL_IP_VERSION_02_00);
    out.put_u8(string);
}

/// Block contents for an assignment, in [`LAYOUT`] order.
#[must_use]
pub fn layout(assignment: &Assignment) -> [Block; BLOCK_COUNT] {
    let ids = assignment.ids;
    let strings = assignment.strings;
    let streaming_interface = assignment.streaming_interface();

    [
        Block::InterfaceAssociation {
            first_interface: assignment.first_interface,
            interface_count: INTERFACE_COUNT,
            function_string: strings.collection,
        },
        // No interrupt endpoint on the control interface
        Block::ControlInterface { interface: assignment.first_interface, endpoints: 0, string: 0 },
        Block::ControlHeader {
            bcd_adc: BCD_ADC,
            category: CATEGORY_MUSICAL_INSTRUMENT,
            total_length: CONTROL_TOTAL_LEN,
            controls: 0,
        },
        Block::ClockSource {
            id: ids.clock,
            attributes: CLOCK_INTERNAL_FIXED | CLOCK_SYNCED_TO_SOF,
            controls: 0,
            assoc_terminal: 0,
            string: 0,
        },
        Block::InputTerminal {
            id: ids.usb_input,
            terminal_type: TERMINAL_USB_STREAMING,
            assoc_terminal: ids.analog_output,
            clock: ids.clock,
            channels: 1,
            channel_config: 0,
            channel_names: 0,
            controls: 0,
            string: 0,
        },
        Block::FeatureUnit {
            id: ids.playback_unit,
            source: ids.usb_input,
            master_controls: FU_MUTE_PROGRAMMABLE,
            channel_controls: 0,
            string: strings.feature_unit,
        },
        Block::OutputTerminal {
            id: ids.analog_output,
            terminal_type: TERMINAL_ANALOG_CONNECTOR,
            assoc_terminal: ids.usb_input,
            source: ids.playback_unit,
            clock: ids.clock,
            controls: 0,
            string: strings.output_terminal,
        },
        Block::InputTerminal {
            id: ids.analog_input,
            terminal_type: TERMINAL_ANALOG_CONNECTOR,
            assoc_terminal: ids.usb_output,
            clock: ids.clock,
            channels: 1,
            channel_config: 0,
            channel_names: 0,
            controls: 0,
            string: strings.input_terminal,
        },
        Block::FeatureUnit {
            id: ids.capture_unit,
            source: ids.analog_input,
            master_controls: FU_MUTE_PROGRAMMABLE,
            channel_controls: 0,
            string: strings.feature_unit,
        },
        Block::OutputTerminal {
            id: ids.usb_output,
            terminal_type: TERMINAL_USB_STREAMING,
            assoc_terminal: ids.analog_input,
            source: ids.capture_unit,
            clock: ids.clock,
            controls: 0,
            string: 0,
        },
        // Zero-bandwidth alternate setting
        Block::StreamingInterface { interface: streaming_interface, alternate: 0, endpoints: 0, string: 0 },
        // Data endpoint plus explicit feedback endpoint
        Block::StreamingInterface { interface: streaming_interface, alternate: 1, endpoints: 2, string: 0 },
        Block::StreamingGeneral {
            terminal_link: ids.usb_input,
            controls: 0,
            format_type: FORMAT_TYPE_I,
            formats: FORMAT_PCM,
            channels: 1,
            channel_config: CHANNEL_FRONT_CENTER,
            string: 0,
        },
        Block::FormatTypeI { subslot_size: SUBSLOT_SIZE, bit_resolution: BIT_RESOLUTION },
        Block::IsoDataEndpoint {
            address: assignment.data_endpoint.raw(),
            attributes: ISO_DATA_ATTRIBUTES,
            max_packet_size: MAX_PACKET_SIZE,
            interval: POLLING_INTERVAL,
        },
        // Internal clock, so no lock delay
        Block::IsoDataEndpointGeneral { attributes: 0, controls: 0, lock_delay_units: 0, lock_delay: 0 },
        Block::IsoFeedbackEndpoint {
            address: assignment.feedback_endpoint.raw(),
            attributes: ISO_FEEDBACK_ATTRIBUTES,
            max_packet_size: MAX_PACKET_SIZE,
            interval: POLLING_INTERVAL,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::Direction;

    fn sample_assignment() -> Assignment {
        Assignment {
            first_interface: 3,
            data_endpoint: EndpointAddress::new(2, Direction::Out),
            feedback_endpoint: EndpointAddress::new(2, Direction::In),
            strings: StringIndices {
                collection: 0,
                feature_unit: 4,
                output_terminal: 5,
                input_terminal: 6,
            },
            ids: EntityIds::assign(),
        }
    }

    #[test]
    fn test_descriptor_len_is_sum_of_blocks() {
        let sum: u16 = LAYOUT.iter().map(|kind| u16::from(kind.length())).sum();

        assert_eq!(DESCRIPTOR_LEN, sum);
        assert_eq!(DESCRIPTOR_LEN, 182);
    }

    #[test]
    fn test_control_total_len_covers_header_and_entities() {
        // header 9 + clock 8 + 2 x (input 17 + feature 14 + output 12)
        assert_eq!(CONTROL_TOTAL_LEN, 103);
    }

    #[test]
    fn test_entity_ids_are_sequential() {
        let ids = EntityIds::assign();

        assert_eq!(ids.clock, 1);
        assert_eq!(ids.usb_input, 2);
        assert_eq!(ids.playback_unit, 3);
        assert_eq!(ids.analog_output, 4);
        assert_eq!(ids.analog_input, 5);
        assert_eq!(ids.capture_unit, 6);
        assert_eq!(ids.usb_output, 7);
    }

    #[test]
    fn test_layout_follows_block_kinds() {
        let blocks = layout(&sample_assignment());

        for (block, kind) in blocks.iter().zip(LAYOUT) {
            assert_eq!(block.kind(), kind);
        }
    }

    #[test]
    fn test_each_block_writes_its_length() {
        for block in layout(&sample_assignment()) {
            let mut bytes = Vec::new();
            block.write(&mut bytes);

            assert_eq!(bytes.len(), usize::from(block.kind().length()), "{:?}", block.kind());
            assert_eq!(bytes[0], block.kind().length());
        }
    }

    #[test]
    fn test_streaming_interface_follows_control_interface() {
        let assignment = sample_assignment();
        assert_eq!(assignment.streaming_interface(), 4);
    }

    #[test]
    fn test_clock_source_encoding() {
        let block = Block::ClockSource {
            id: 1,
            attributes: CLOCK_INTERNAL_FIXED | CLOCK_SYNCED_TO_SOF,
            controls: 0,
            assoc_terminal: 0,
            string: 0,
        };
        let mut bytes = Vec::new();
        block.write(&mut bytes);

        assert_eq!(bytes, [0x08, 0x24, 0x0A, 0x01, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_feedback_endpoint_encoding() {
        let block = Block::IsoFeedbackEndpoint {
            address: 0x81,
            attributes: ISO_FEEDBACK_ATTRIBUTES,
            max_packet_size: 512,
            interval: 100,
        };
        let mut bytes = Vec::new();
        block.write(&mut bytes);

        assert_eq!(bytes, [0x07, 0x05, 0x81, 0x11, 0x00, 0x02, 0x64]);
    }
}
