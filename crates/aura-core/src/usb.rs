//! USB device stack and transport boundaries.
//!
//! The audio function never talks to hardware directly. Interface numbers,
//! endpoint addresses and string indices come from an allocator passed in at
//! call time, and sample data moves through an [`AudioTransport`].

use std::fmt;

/// Endpoint direction, from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// An endpoint address as it appears in `bEndpointAddress`.
///
/// D7 is the direction (1 = IN) and D3..0 the endpoint number.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointAddress(u8);

impl EndpointAddress {
    const DIRECTION_IN: u8 = 0x80;

    /// Build an address from an endpoint number and direction.
    #[must_use]
    pub fn new(number: u8, direction: Direction) -> Self {
        let number = number & 0x0F;
        match direction {
            Direction::In => Self(Self::DIRECTION_IN | number),
            Direction::Out => Self(number),
        }
    }

    /// Raw `bEndpointAddress` byte.
    #[must_use]
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Endpoint number without the direction bit.
    #[must_use]
    pub fn number(self) -> u8 {
        self.0 & 0x0F
    }

    #[must_use]
    pub fn direction(self) -> Direction {
        if self.0 & Self::DIRECTION_IN == 0 { Direction::Out } else { Direction::In }
    }
}

impl From<u8> for EndpointAddress {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EndpointAddress({:#04x})", self.0)
    }
}

/// Allocates interface numbers and endpoint addresses for a configuration.
pub trait InterfaceAllocator {
    /// Reserve `count` consecutive interface numbers, returning the first.
    fn allocate_interfaces(&mut self, count: u8) -> u8;

    /// Reserve the next free endpoint in the given direction.
    fn allocate_endpoint(&mut self, direction: Direction) -> EndpointAddress;
}

/// Device-wide string descriptor table.
pub trait StringTable {
    /// Register a string, returning the index descriptors use to reference it.
    fn register_string(&mut self, text: &str) -> u8;
}

/// Something that contributes an interface descriptor to the configuration.
pub trait UsbInterface {
    /// Write this interface's descriptor.
    ///
    /// With `buf` set to `None` this only reports the required length. With a
    /// buffer it allocates numbers from `allocator`, fills the buffer and returns
    /// the number of bytes written, or 0 on failure. `itf_hint` is advisory; the
    /// allocator is authoritative for interface numbers.
    fn interface_descriptor(
        &mut self,
        itf_hint: u8,
        allocator: &mut dyn InterfaceAllocator,
        buf: Option<&mut [u8]>,
    ) -> u16;
}

/// The owning USB device stack.
pub trait DeviceStack: InterfaceAllocator + StringTable {
    /// Append an interface to the configuration descriptor.
    ///
    /// Returns `false` once the device has been enumerated or when the
    /// configuration has no room left.
    fn add_interface(&mut self, interface: &mut dyn UsbInterface) -> bool;
}

/// Non-blocking isochronous audio endpoints.
pub trait AudioTransport {
    /// Queue bytes towards the host, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Take bytes received from the host, returning how many were copied.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

impl<T: AudioTransport + ?Sized> AudioTransport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> usize {
        (**self).write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_address_in() {
        let ep = EndpointAddress::new(1, Direction::In);

        assert_eq!(ep.raw(), 0x81);
        assert_eq!(ep.number(), 1);
        assert_eq!(ep.direction(), Direction::In);
    }

    #[test]
    fn test_endpoint_address_out() {
        let ep = EndpointAddress::new(2, Direction::Out);

        assert_eq!(ep.raw(), 0x02);
        assert_eq!(ep.number(), 2);
        assert_eq!(ep.direction(), Direction::Out);
    }

    #[test]
    fn test_endpoint_number_is_masked() {
        let ep = EndpointAddress::new(0x13, Direction::Out);
        assert_eq!(ep.raw(), 0x03);
    }

    #[test]
    fn test_endpoint_debug_is_hex() {
        let ep = EndpointAddress::from(0x81);
        assert_eq!(format!("{ep:?}"), "EndpointAddress(0x81)");
    }
}
