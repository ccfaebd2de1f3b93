//! USB and UAC2 descriptor codes.
//!
//! Values follow the USB 2.0 specification, the USB Audio Class 2.0
//! specification and its "Audio Data Formats" companion.

// Standard descriptor types
pub const DESC_INTERFACE: u8 = 0x04;
pub const DESC_ENDPOINT: u8 = 0x05;
pub const DESC_INTERFACE_ASSOCIATION: u8 = 0x0B;

// Class-specific descriptor types
pub const DESC_CS_INTERFACE: u8 = 0x24;
pub const DESC_CS_ENDPOINT: u8 = 0x25;

// Audio interface class, subclasses and protocol
pub const CLASS_AUDIO: u8 = 0x01;
pub const SUBCLASS_UNDEFINED: u8 = 0x00;
pub const SUBCLASS_AUDIOCONTROL: u8 = 0x01;
pub const SUBCLASS_AUDIOSTREAMING: u8 = 0x02;
pub const PROTOCOL_IP_VERSION_02_00: u8 = 0x20;
pub const FUNCTION_PROTOCOL_AF_VERSION_02_00: u8 = 0x20;

// AudioControl interface descriptor subtypes
pub const AC_HEADER: u8 = 0x01;
pub const AC_INPUT_TERMINAL: u8 = 0x02;
pub const AC_OUTPUT_TERMINAL: u8 = 0x03;
pub const AC_FEATURE_UNIT: u8 = 0x06;
pub const AC_CLOCK_SOURCE: u8 = 0x0A;

// AudioStreaming interface descriptor subtypes
pub const AS_GENERAL: u8 = 0x01;
pub const AS_FORMAT_TYPE: u8 = 0x02;

// Class-specific endpoint descriptor subtype
pub const EP_GENERAL: u8 = 0x01;

/// Audio Device Class release number, BCD 2.00.
pub const BCD_ADC: u16 = 0x0200;

/// Audio function category: musical instrument.
pub const CATEGORY_MUSICAL_INSTRUMENT: u8 = 0x09;

// Terminal types
pub const TERMINAL_USB_STREAMING: u16 = 0x0101;
pub const TERMINAL_ANALOG_CONNECTOR: u16 = 0x0601;

// Clock source bmAttributes
pub const CLOCK_INTERNAL_FIXED: u8 = 0x01;
pub const CLOCK_SYNCED_TO_SOF: u8 = 0x04;

/// Feature unit bmaControls: mute, host programmable.
pub const FU_MUTE_PROGRAMMABLE: u32 = 0x0000_0003;

// Format type and formats
pub const FORMAT_TYPE_I: u8 = 0x01;
pub const FORMAT_PCM: u32 = 0x0000_0001;

/// Spatial location of the single physical channel.
pub const CHANNEL_FRONT_CENTER: u32 = 0x0000_0004;

/// Bytes per audio subslot in the Type I format descriptor.
pub const SUBSLOT_SIZE: u8 = 2;
/// Bits used within each subslot.
pub const BIT_RESOLUTION: u8 = 16;

// Endpoint bmAttributes
pub const EP_ISOCHRONOUS: u8 = 0x01;
pub const EP_SYNC_ASYNCHRONOUS: u8 = 0x04;
pub const EP_USAGE_FEEDBACK: u8 = 0x10;

pub const ISO_DATA_ATTRIBUTES: u8 = EP_ISOCHRONOUS | EP_SYNC_ASYNCHRONOUS;
pub const ISO_FEEDBACK_ATTRIBUTES: u8 = EP_ISOCHRONOUS | EP_USAGE_FEEDBACK;

// TODO: derive wMaxPacketSize and bInterval from the sample rate once rate
// negotiation exists; both are placeholders today.
pub const MAX_PACKET_SIZE: u16 = 512;
pub const POLLING_INTERVAL: u8 = 100;

/// Interfaces in the collection: one AudioControl, one AudioStreaming.
pub const INTERFACE_COUNT: u8 = 2;
