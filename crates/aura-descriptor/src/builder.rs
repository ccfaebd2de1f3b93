//! Interface descriptor builder.

use aura_core::{Direction, InterfaceAllocator};
use tracing::{debug, error};

use crate::constants::INTERFACE_COUNT;
use crate::error::DescriptorError;
use crate::layout::{self, Assignment, DESCRIPTOR_LEN, EntityIds, StringIndices};

/// Builds the UAC2 interface descriptor for one audio function.
///
/// The length query is free of side effects and may be repeated. Filling a
/// buffer allocates interface and endpoint numbers, so it must happen exactly
/// once per audio function; calling it again would claim a second set of
/// numbers from the allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorBuilder {
    strings: StringIndices,
}

impl DescriptorBuilder {
    #[must_use]
    pub fn new(strings: StringIndices) -> Self {
        Self { strings }
    }

    /// Exact number of bytes the descriptor occupies.
    #[must_use]
    pub const fn required_len() -> u16 {
        DESCRIPTOR_LEN
    }

    /// Query the descriptor length or write the descriptor.
    ///
    /// With `out` set to `None` this returns the required length and touches
    /// nothing. Otherwise it allocates two interfaces and two endpoints, writes
    /// the descriptor to the front of `out` and returns the bytes written.
    ///
    /// # Errors
    /// Returns [`DescriptorError::BufferTooSmall`] if `out` cannot hold the
    /// descriptor (no numbers are allocated in that case),
    /// [`DescriptorError::EndpointDirection`] if the allocator hands back an
    /// endpoint of the wrong direction, or [`DescriptorError::LayoutMismatch`]
    /// if serialization disagrees with the layout table.
    pub fn build(
        &self,
        allocator: &mut dyn InterfaceAllocator,
        out: Option<&mut [u8]>,
    ) -> Result<u16, DescriptorError> {
        let Some(out) = out else {
            return Ok(DESCRIPTOR_LEN);
        };

        let required = usize::from(DESCRIPTOR_LEN);
        if out.len() < required {
            return Err(DescriptorError::BufferTooSmall { required, capacity: out.len() });
        }

        let assignment = self.assign(allocator);
        for (endpoint, expected) in
            [(assignment.feedback_endpoint, Direction::In), (assignment.data_endpoint, Direction::Out)]
        {
            if endpoint.direction() != expected {
                error!(?endpoint, ?expected, "Allocator returned endpoint with wrong direction");
                return Err(DescriptorError::EndpointDirection { address: endpoint.raw(), expected });
            }
        }
        debug!(
            interface = assignment.first_interface,
            data_endpoint = ?assignment.data_endpoint,
            feedback_endpoint = ?assignment.feedback_endpoint,
            "Allocated audio function numbers"
        );

        Self::serialize(&assignment, out)
    }

    /// Claim interface numbers and endpoints for this function.
    pub fn assign(&self, allocator: &mut dyn InterfaceAllocator) -> Assignment {
        let first_interface = allocator.allocate_interfaces(INTERFACE_COUNT);
        let feedback_endpoint = allocator.allocate_endpoint(Direction::In);
        let data_endpoint = allocator.allocate_endpoint(Direction::Out);

        Assignment {
            first_interface,
            data_endpoint,
            feedback_endpoint,
            strings: self.strings,
            ids: EntityIds::assign(),
        }
    }

    /// Write the descriptor for an existing assignment.
    ///
    /// # Errors
    /// Same as [`DescriptorBuilder::build`].
    pub fn serialize(assignment: &Assignment, out: &mut [u8]) -> Result<u16, DescriptorError> {
        let required = usize::from(DESCRIPTOR_LEN);
        if out.len() < required {
            return Err(DescriptorError::BufferTooSmall { required, capacity: out.len() });
        }

        let bytes = layout::layout(assignment).iter().try_fold(
            Vec::with_capacity(required),
            |mut bytes, block| {
                let start = bytes.len();
                block.write(&mut bytes);

                let written = bytes.len() - start;
                let expected = usize::from(block.kind().length());
                if written == expected {
                    Ok(bytes)
                } else {
                    error!(kind = ?block.kind(), written, expected, "Descriptor block length mismatch");
                    Err(DescriptorError::LayoutMismatch { written, expected })
                }
            },
        )?;

        if bytes.len() != required {
            error!(written = bytes.len(), expected = required, "Descriptor length mismatch");
            return Err(DescriptorError::LayoutMismatch { written: bytes.len(), expected: required });
        }

        out[..required].copy_from_slice(&bytes);
        Ok(DESCRIPTOR_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Block, LAYOUT};
    use crate::parser::parse;
    use assert_matches::assert_matches;
    use aura_core::EndpointAddress;
    use proptest::prelude::*;

    /// Allocator handing out numbers the way a device stack would.
    #[derive(Default)]
    struct CountingAllocator {
        interfaces: u8,
        in_endpoints: u8,
        out_endpoints: u8,
    }

    impl InterfaceAllocator for CountingAllocator {
        fn allocate_interfaces(&mut self, count: u8) -> u8 {
            let first = self.interfaces;
            self.interfaces += count;
            first
        }

        fn allocate_endpoint(&mut self, direction: Direction) -> EndpointAddress {
            let counter = match direction {
                Direction::In => &mut self.in_endpoints,
                Direction::Out => &mut self.out_endpoints,
            };
            *counter += 1;
            EndpointAddress::new(*counter, direction)
        }
    }

    /// Allocator that ignores the requested direction.
    struct OutOnlyAllocator;

    impl InterfaceAllocator for OutOnlyAllocator {
        fn allocate_interfaces(&mut self, _count: u8) -> u8 {
            0
        }

        fn allocate_endpoint(&mut self, _direction: Direction) -> EndpointAddress {
            EndpointAddress::new(1, Direction::Out)
        }
    }

    #[test]
    fn test_wrong_endpoint_direction_is_rejected() {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut buf = vec![0u8; usize::from(DESCRIPTOR_LEN)];

        let result = builder.build(&mut OutOnlyAllocator, Some(&mut buf));

        assert_matches!(
            result,
            Err(DescriptorError::EndpointDirection { address: 0x01, expected: Direction::In })
        );
        assert!(buf.iter().all(|&b| b == 0));
    }

    fn sample_strings() -> StringIndices {
        StringIndices { collection: 0, feature_unit: 4, output_terminal: 5, input_terminal: 6 }
    }

    fn build_descriptor() -> Vec<u8> {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut allocator = CountingAllocator::default();
        let mut buf = vec![0u8; usize::from(DescriptorBuilder::required_len())];

        let written = builder.build(&mut allocator, Some(&mut buf)).expect("Failed to build");
        assert_eq!(written, DescriptorBuilder::required_len());
        buf
    }

    #[test]
    fn test_length_query_has_no_side_effects() {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut allocator = CountingAllocator::default();

        assert_eq!(builder.build(&mut allocator, None), Ok(182));
        assert_eq!(builder.build(&mut allocator, None), Ok(182));
        assert_eq!(allocator.interfaces, 0);
        assert_eq!(allocator.in_endpoints, 0);
        assert_eq!(allocator.out_endpoints, 0);
    }

    #[test]
    fn test_short_buffer_is_rejected_without_allocating() {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut allocator = CountingAllocator::default();
        let mut buf = vec![0u8; 181];

        assert_matches!(
            builder.build(&mut allocator, Some(&mut buf)),
            Err(DescriptorError::BufferTooSmall { required: 182, capacity: 181 })
        );
        assert_eq!(allocator.interfaces, 0);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fill_allocates_two_interfaces_and_two_endpoints() {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut allocator = CountingAllocator { interfaces: 2, ..Default::default() };
        let mut buf = vec![0u8; 200];

        builder.build(&mut allocator, Some(&mut buf)).expect("Failed to build");

        assert_eq!(allocator.interfaces, 4);
        assert_eq!(allocator.in_endpoints, 1);
        assert_eq!(allocator.out_endpoints, 1);

        let blocks = parse(&buf[..182]).expect("Failed to parse");
        assert_matches!(blocks[0], Block::InterfaceAssociation { first_interface: 2, interface_count: 2, .. });
        assert_matches!(blocks[1], Block::ControlInterface { interface: 2, .. });
        assert_matches!(blocks[10], Block::StreamingInterface { interface: 3, alternate: 0, endpoints: 0, .. });
        assert_matches!(blocks[11], Block::StreamingInterface { interface: 3, alternate: 1, endpoints: 2, .. });
        assert_matches!(blocks[14], Block::IsoDataEndpoint { address: 0x01, attributes: 0x05, .. });
        assert_matches!(blocks[16], Block::IsoFeedbackEndpoint { address: 0x81, attributes: 0x11, .. });
    }

    #[test]
    fn test_larger_buffer_leaves_tail_untouched() {
        let builder = DescriptorBuilder::new(sample_strings());
        let mut allocator = CountingAllocator::default();
        let mut buf = vec![0xAAu8; 190];

        assert_eq!(builder.build(&mut allocator, Some(&mut buf)), Ok(182));
        assert!(buf[182..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_descriptor_bytes() {
        let buf = build_descriptor();

        // Interface association
        assert_eq!(buf[0..8], [0x08, 0x0B, 0x00, 0x02, 0x01, 0x00, 0x20, 0x00]);
        // Standard AudioControl interface
        assert_eq!(buf[8..17], [0x09, 0x04, 0x00, 0x00, 0x00, 0x01, 0x01, 0x20, 0x00]);
        // Class-specific AC header: bcdADC 2.00, musical instrument, wTotalLength 103
        assert_eq!(buf[17..26], [0x09, 0x24, 0x01, 0x00, 0x02, 0x09, 0x67, 0x00, 0x00]);
        // Clock source
        assert_eq!(buf[26..34], [0x08, 0x24, 0x0A, 0x01, 0x05, 0x00, 0x00, 0x00]);
        // USB streaming input terminal
        assert_eq!(
            buf[34..51],
            [0x11, 0x24, 0x02, 0x02, 0x01, 0x01, 0x04, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        // Playback feature unit
        assert_eq!(
            buf[51..65],
            [0x0E, 0x24, 0x06, 0x03, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04]
        );
        // Analog output terminal
        assert_eq!(buf[65..77], [0x0C, 0x24, 0x03, 0x04, 0x01, 0x06, 0x02, 0x03, 0x01, 0x00, 0x00, 0x05]);
        // AudioStreaming alternate settings 0 and 1 on interface 1
        assert_eq!(buf[120..129], [0x09, 0x04, 0x01, 0x00, 0x00, 0x01, 0x02, 0x20, 0x00]);
        assert_eq!(buf[129..138], [0x09, 0x04, 0x01, 0x01, 0x02, 0x01, 0x02, 0x20, 0x00]);
        // Class-specific AS general: PCM, one front-center channel
        assert_eq!(
            buf[138..154],
            [0x10, 0x24, 0x01, 0x02, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00]
        );
        // Type I format: 2-byte subslot, 16 bits
        assert_eq!(buf[154..160], [0x06, 0x24, 0x02, 0x01, 0x02, 0x10]);
        // Data endpoint, class-specific endpoint, feedback endpoint
        assert_eq!(buf[160..167], [0x07, 0x05, 0x01, 0x05, 0x00, 0x02, 0x64]);
        assert_eq!(buf[167..175], [0x08, 0x25, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(buf[175..182], [0x07, 0x05, 0x81, 0x11, 0x00, 0x02, 0x64]);
    }

    #[test]
    fn test_id_chain_round_trip() {
        let blocks = parse(&build_descriptor()).expect("Failed to parse");
        assert_eq!(blocks.len(), LAYOUT.len());

        let Block::ClockSource { id: clock, .. } = blocks[3] else { panic!("expected clock") };

        // Each path: input terminal -> feature unit -> output terminal
        for path in [&blocks[4..7], &blocks[7..10]] {
            let Block::InputTerminal { id: input, assoc_terminal: input_assoc, clock: input_clock, .. } =
                path[0]
            else {
                panic!("expected input terminal");
            };
            let Block::FeatureUnit { id: unit, source: unit_source, .. } = path[1] else {
                panic!("expected feature unit");
            };
            let Block::OutputTerminal {
                id: output,
                assoc_terminal: output_assoc,
                source: output_source,
                clock: output_clock,
                ..
            } = path[2]
            else {
                panic!("expected output terminal");
            };

            assert_eq!(input_assoc, output);
            assert_eq!(output_assoc, input);
            assert_eq!(unit_source, input);
            assert_eq!(output_source, unit);
            assert_eq!(input_clock, clock);
            assert_eq!(output_clock, clock);
        }

        let Block::InputTerminal { id: usb_input, .. } = blocks[4] else { panic!() };
        assert_matches!(blocks[12], Block::StreamingGeneral { terminal_link, .. } if terminal_link == usb_input);
    }

    #[test]
    fn test_string_indices_are_referenced() {
        let blocks = parse(&build_descriptor()).expect("Failed to parse");

        assert_matches!(blocks[5], Block::FeatureUnit { string: 4, .. });
        assert_matches!(blocks[6], Block::OutputTerminal { string: 5, .. });
        assert_matches!(blocks[7], Block::InputTerminal { string: 6, .. });
        assert_matches!(blocks[8], Block::FeatureUnit { string: 4, .. });
        assert_matches!(blocks[0], Block::InterfaceAssociation { function_string: 0, .. });
    }

    proptest! {
        #[test]
        fn test_any_buffer_at_least_required_succeeds(extra in 0usize..64, fill in any::<u8>()) {
            let builder = DescriptorBuilder::new(sample_strings());
            let mut allocator = CountingAllocator::default();
            let required = builder.build(&mut allocator, None).expect("length query");
            let mut buf = vec![fill; usize::from(required) + extra];

            prop_assert_eq!(builder.build(&mut allocator, Some(&mut buf)), Ok(required));
            prop_assert_eq!(parse(&buf[..usize::from(required)]).map(|b| b.len()), Ok(LAYOUT.len()));
        }

        #[test]
        fn test_any_buffer_below_required_fails(capacity in 0usize..182) {
            let builder = DescriptorBuilder::new(sample_strings());
            let mut allocator = CountingAllocator::default();
            let mut buf = vec![0u8; capacity];

            let result = builder.build(&mut allocator, Some(&mut buf));
            let is_too_small = matches!(result, Err(DescriptorError::BufferTooSmall { .. }));
            prop_assert!(is_too_small);
        }
    }
}
