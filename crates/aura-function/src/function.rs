//! The audio function object.

use aura_core::{
    AudioFunctionConfig, AudioTransport, DeviceStack, Error, InterfaceAllocator, Result,
    StringTable, UsbInterface,
};
use aura_descriptor::{DescriptorBuilder, DescriptorError, StringIndices};
use aura_stream::{StreamBuffers, Transfer, transfer_bytes, transfer_samples};
use tracing::{debug, error, info, warn};

/// A mono, full-duplex, asynchronous UAC2 audio function.
///
/// Construction registers the string descriptors; [`AudioFunction::begin`]
/// adds the interface to the device stack, which then calls back into
/// [`UsbInterface::interface_descriptor`] during enumeration.
#[derive(Debug)]
pub struct AudioFunction {
    config: AudioFunctionConfig,
    strings: StringIndices,
    buffers: Option<StreamBuffers<'static>>,
    registered: bool,
}

impl AudioFunction {
    /// Create the function and register its strings with the device.
    ///
    /// Internal buffers are allocated when `config.buffer_samples` is non-zero.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedChannels`] if the configuration is not mono.
    pub fn new(config: AudioFunctionConfig, strings: &mut dyn StringTable) -> Result<Self> {
        config.validate()?;

        let names = &config.names;
        let feature_unit = strings.register_string(&names.feature_unit);
        let output_terminal = strings.register_string(&names.output_terminal);
        let input_terminal = strings.register_string(&names.input_terminal);
        let collection =
            if names.register_collection { strings.register_string(&names.collection) } else { 0 };
        let strings = StringIndices { collection, feature_unit, output_terminal, input_terminal };

        let buffers = config
            .uses_internal_buffers()
            .then(|| StreamBuffers::owned(config.buffer_bytes()));

        debug!(
            bits = config.bit_depth.bits(),
            buffer_bytes = config.buffer_bytes(),
            ?strings,
            "Audio function created"
        );

        Ok(Self { config, strings, buffers, registered: false })
    }

    /// Add the audio interface to the device configuration.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyRegistered`] on every call after a successful one,
    /// and [`Error::RegistrationRejected`] if the stack refuses the interface
    /// (already enumerated or out of configuration space).
    pub fn begin(&mut self, stack: &mut dyn DeviceStack) -> Result<()> {
        if self.registered {
            return Err(Error::AlreadyRegistered);
        }

        if !stack.add_interface(self) {
            warn!("Device stack rejected the audio interface");
            return Err(Error::RegistrationRejected);
        }

        self.registered = true;
        info!("Audio function registered");
        Ok(())
    }

    /// Exchange the internal buffers with the transport.
    ///
    /// # Errors
    /// Returns [`Error::NoInternalBuffers`] when the function was configured
    /// with zero buffer samples.
    pub fn update<T: AudioTransport + ?Sized>(&mut self, transport: &mut T) -> Result<Transfer> {
        let buffers = self.buffers.as_mut().ok_or(Error::NoInternalBuffers)?;
        Ok(buffers.exchange(transport))
    }

    /// Exchange caller-supplied byte buffers with the transport.
    ///
    /// See [`aura_stream::transfer_bytes`] for the count semantics.
    pub fn update_bytes<T: AudioTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        tx: Option<(&mut [u8], &mut usize)>,
        rx: Option<&mut [u8]>,
    ) -> Transfer {
        transfer_bytes(transport, tx, rx)
    }

    /// Exchange caller-supplied 16-bit sample buffers with the transport.
    pub fn update_samples<T: AudioTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        tx: Option<(&mut [u16], &mut usize)>,
        rx: Option<&mut [u16]>,
    ) -> Transfer {
        transfer_samples(transport, tx, rx)
    }

    /// Append bytes to the outbound buffer. Returns how many fit.
    pub fn queue_outbound(&mut self, data: &[u8]) -> usize {
        self.buffers.as_mut().map_or(0, |buffers| buffers.tx.push(data))
    }

    /// Consume received bytes into `out`. Returns how many were copied.
    pub fn take_inbound(&mut self, out: &mut [u8]) -> usize {
        self.buffers.as_mut().map_or(0, |buffers| buffers.rx.take(out))
    }

    /// Size of each internal buffer in bytes (0 without internal buffers).
    #[must_use]
    pub fn buffer_bytes(&self) -> usize {
        self.buffers.as_ref().map_or(0, |buffers| buffers.tx.capacity())
    }

    /// Outbound bytes not yet accepted by the transport.
    #[must_use]
    pub fn pending_outbound(&self) -> usize {
        self.buffers.as_ref().map_or(0, |buffers| buffers.tx.len())
    }

    /// Received bytes waiting to be consumed.
    #[must_use]
    pub fn pending_inbound(&self) -> usize {
        self.buffers.as_ref().map_or(0, |buffers| buffers.rx.len())
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    #[must_use]
    pub fn strings(&self) -> StringIndices {
        self.strings
    }

    #[must_use]
    pub fn config(&self) -> &AudioFunctionConfig {
        &self.config
    }
}

impl UsbInterface for AudioFunction {
    fn interface_descriptor(
        &mut self,
        itf_hint: u8,
        allocator: &mut dyn InterfaceAllocator,
        buf: Option<&mut [u8]>,
    ) -> u16 {
        let filling = buf.is_some();
        match DescriptorBuilder::new(self.strings).build(allocator, buf) {
            Ok(len) => {
                if filling {
                    debug!(itf_hint, len, "Wrote audio interface descriptor");
                }
                len
            }
            Err(e @ DescriptorError::BufferTooSmall { .. }) => {
                warn!(error = %e, "Descriptor buffer too small");
                0
            }
            Err(e) => {
                error!(error = %e, "Descriptor serialization failed");
                0
            }
        }
    }
}
