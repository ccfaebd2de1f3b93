//! In-memory device stack and transport.
//!
//! [`LoopbackDevice`] hands out interface numbers, endpoint addresses and
//! string indices the way a small device stack does and collects the interface
//! descriptors into a bounded configuration buffer. [`LoopbackTransport`] plays
//! the host side of the isochronous endpoints.

use std::collections::VecDeque;

use aura_core::{
    AudioTransport, DeviceStack, Direction, EndpointAddress, InterfaceAllocator, StringTable,
    UsbInterface,
};
use tracing::{debug, info, warn};

/// Space reserved for interface descriptors in the configuration descriptor.
pub const CONFIG_CAPACITY: usize = 256;

/// Indices 0..=3 are the language table, manufacturer, product and serial.
pub const FIRST_STRING_INDEX: u8 = 4;

/// Endpoint 0 is the control endpoint.
const FIRST_ENDPOINT: u8 = 1;

/// A device stack without hardware.
#[derive(Debug)]
pub struct LoopbackDevice {
    next_interface: u8,
    next_in: u8,
    next_out: u8,
    strings: Vec<String>,
    configuration: Vec<u8>,
    enumerated: bool,
}

impl Default for LoopbackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_interface: 0,
            next_in: FIRST_ENDPOINT,
            next_out: FIRST_ENDPOINT,
            strings: Vec::new(),
            configuration: Vec::with_capacity(CONFIG_CAPACITY),
            enumerated: false,
        }
    }

    /// Close registration, as a host reading the configuration would.
    pub fn mark_enumerated(&mut self) {
        self.enumerated = true;
        info!(
            interfaces = self.next_interface,
            length = self.configuration.len(),
            "Loopback device enumerated"
        );
    }

    #[must_use]
    pub fn is_enumerated(&self) -> bool {
        self.enumerated
    }

    /// Interface descriptors collected so far.
    #[must_use]
    pub fn configuration(&self) -> &[u8] {
        &self.configuration
    }

    /// Number of interface numbers handed out.
    #[must_use]
    pub fn interface_count(&self) -> u8 {
        self.next_interface
    }

    #[must_use]
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    /// Look up a registered string by descriptor index.
    #[must_use]
    pub fn string(&self, index: u8) -> Option<&str> {
        let offset = index.checked_sub(FIRST_STRING_INDEX)?;
        self.strings.get(usize::from(offset)).map(String::as_str)
    }
}

impl InterfaceAllocator for LoopbackDevice {
    fn allocate_interfaces(&mut self, count: u8) -> u8 {
        let first = self.next_interface;
        self.next_interface = self.next_interface.saturating_add(count);
        first
    }

    fn allocate_endpoint(&mut self, direction: Direction) -> EndpointAddress {
        let next = match direction {
            Direction::In => &mut self.next_in,
            Direction::Out => &mut self.next_out,
        };
        let address = EndpointAddress::new(*next, direction);
        *next = next.saturating_add(1);
        address
    }
}

impl StringTable for LoopbackDevice {
    fn register_string(&mut self, text: &str) -> u8 {
        let Some(index) = u8::try_from(self.strings.len())
            .ok()
            .and_then(|offset| offset.checked_add(FIRST_STRING_INDEX))
        else {
            warn!(text, "String table full");
            return 0;
        };
        self.strings.push(text.to_string());
        debug!(index, text, "Registered string");
        index
    }
}

impl DeviceStack for LoopbackDevice {
    fn add_interface(&mut self, interface: &mut dyn UsbInterface) -> bool {
        if self.is_enumerated() {
            warn!("Device already enumerated, interface not added");
            return false;
        }

        let hint = self.next_interface;
        let required = usize::from(interface.interface_descriptor(hint, self, None));
        let free = CONFIG_CAPACITY - self.configuration.len();
        if required == 0 || required > free {
            warn!(required, free, "No room for interface descriptor");
            return false;
        }

        let mut buf = vec![0u8; required];
        let written = usize::from(interface.interface_descriptor(hint, self, Some(&mut buf)));
        if written == 0 {
            return false;
        }

        self.configuration.extend_from_slice(&buf[..written]);
        debug!(written, total = self.configuration.len(), "Interface descriptor added");
        true
    }
}

/// Host side of the isochronous endpoints.
///
/// Bytes the host sends wait in a queue until the device reads them; bytes the
/// device writes wait until the host collects them. An optional write budget
/// caps how much one device write may deliver.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    to_device: VecDeque<u8>,
    to_host: VecDeque<u8>,
    write_budget: Option<usize>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that accepts at most `budget` bytes per write.
    #[must_use]
    pub fn with_write_budget(budget: usize) -> Self {
        Self { write_budget: Some(budget), ..Self::default() }
    }

    pub fn set_write_budget(&mut self, budget: Option<usize>) {
        self.write_budget = budget;
    }

    /// Queue bytes for the device to read.
    pub fn host_send(&mut self, bytes: &[u8]) {
        self.to_device.extend(bytes);
    }

    /// Collect everything the device has written.
    pub fn host_receive(&mut self) -> Vec<u8> {
        self.to_host.drain(..).collect()
    }

    /// Bytes sent by the host and not yet read by the device.
    #[must_use]
    pub fn pending_to_device(&self) -> usize {
        self.to_device.len()
    }
}

impl AudioTransport for LoopbackTransport {
    fn write(&mut self, bytes: &[u8]) -> usize {
        let accepted = self.write_budget.map_or(bytes.len(), |budget| budget.min(bytes.len()));
        self.to_host.extend(&bytes[..accepted]);
        accepted
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.to_device.len());
        for (slot, byte) in buf.iter_mut().zip(self.to_device.drain(..n)) {
            *slot = byte;
        }
        n
    }
}
