//! Loopback harness.
//!
//! Each tick the simulated host sends one frame, the application echoes what
//! the function received back towards the host, and the function exchanges its
//! buffers with the transport. The host holds back a frame while the device
//! still has a full frame unread, so the host queue stays bounded. The host checks that what comes back is the
//! stream it sent, in order.

use anyhow::{Context, Result};
use aura_core::AudioFunctionConfig;
use aura_descriptor::{Block, parse};
use aura_function::{AudioFunction, LoopbackDevice, LoopbackTransport};
use aura_stream::{RxOutcome, Transfer, TxOutcome};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;

/// Frame size used when the function has no internal buffers.
const EXTERNAL_FRAME_BYTES: usize = 64;

/// Per-run transfer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub ticks: u64,
    pub ok: u64,
    pub busy: u64,
    pub partial: u64,
    pub short: u64,
    pub bytes_sent: u64,
    pub bytes_echoed: u64,
    /// Ticks on which the host held back its frame
    pub frames_deferred: u64,
    pub mismatches: u64,
}

/// Caller-owned buffers for functions configured without internal buffers.
#[derive(Debug)]
struct Scratch {
    tx: Vec<u8>,
    tx_len: usize,
    rx: Vec<u8>,
}

#[derive(Debug)]
pub struct Harness {
    device: LoopbackDevice,
    function: AudioFunction,
    transport: LoopbackTransport,
    scratch: Option<Scratch>,
    frame_bytes: usize,
    next_byte: u8,
    expected_byte: u8,
    stats: Stats,
}

impl Harness {
    /// Create the device, register the function and enumerate.
    pub fn new(function_config: AudioFunctionConfig, harness: &HarnessConfig) -> Result<Self> {
        let mut device = LoopbackDevice::new();
        let mut function =
            AudioFunction::new(function_config, &mut device).context("Failed to create audio function")?;
        function.begin(&mut device).context("Failed to register audio function")?;
        device.mark_enumerated();

        let (scratch, frame_bytes) = if function.buffer_bytes() > 0 {
            (None, function.buffer_bytes())
        } else {
            info!(frame_bytes = EXTERNAL_FRAME_BYTES, "No internal buffers, using caller-owned buffers");
            let scratch = Scratch {
                tx: vec![0; EXTERNAL_FRAME_BYTES],
                tx_len: 0,
                rx: vec![0; EXTERNAL_FRAME_BYTES],
            };
            (Some(scratch), EXTERNAL_FRAME_BYTES)
        };

        let transport = harness
            .write_budget
            .map_or_else(LoopbackTransport::new, LoopbackTransport::with_write_budget);

        Ok(Self {
            device,
            function,
            transport,
            scratch,
            frame_bytes,
            next_byte: 0,
            expected_byte: 0,
            stats: Stats::default(),
        })
    }

    /// Decode the enumerated configuration.
    pub fn descriptor(&self) -> Result<Vec<Block>> {
        parse(self.device.configuration()).context("Failed to decode configuration descriptor")
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Run one service tick.
    pub fn tick(&mut self) {
        self.stats.ticks += 1;
        self.host_send_frame();

        let transfer = if self.scratch.is_some() { self.exchange_external() } else { self.exchange_internal() };
        if let Some(transfer) = transfer {
            self.record(transfer);
        }
        self.host_check_echo();
    }

    fn exchange_internal(&mut self) -> Option<Transfer> {
        self.echo_internal();
        match self.function.update(&mut self.transport) {
            Ok(transfer) => Some(transfer),
            Err(e) => {
                warn!(error = %e, "Update failed");
                None
            }
        }
    }

    fn exchange_external(&mut self) -> Option<Transfer> {
        let scratch = self.scratch.as_mut()?;

        // Only read a new frame once the previous echo has been sent.
        let rx = (scratch.tx_len == 0).then_some(scratch.rx.as_mut_slice());
        let transfer = self.function.update_bytes(
            &mut self.transport,
            Some((scratch.tx.as_mut_slice(), &mut scratch.tx_len)),
            rx,
        );
        if let RxOutcome::Received(n) = transfer.rx {
            scratch.tx[..n].copy_from_slice(&scratch.rx[..n]);
            scratch.tx_len = n;
        }
        Some(transfer)
    }

    fn host_send_frame(&mut self) {
        if self.transport.pending_to_device() >= self.frame_bytes {
            self.stats.frames_deferred += 1;
            return;
        }

        let frame: Vec<u8> = (0..self.frame_bytes)
            .map(|_| {
                let byte = self.next_byte;
                self.next_byte = self.next_byte.wrapping_add(1);
                byte
            })
            .collect();
        self.transport.host_send(&frame);
        self.stats.bytes_sent += frame.len() as u64;
    }

    /// Move as much received data into the outbound buffer as it can hold.
    fn echo_internal(&mut self) {
        let free = self.function.buffer_bytes() - self.function.pending_outbound();
        let mut chunk = vec![0u8; free.min(self.function.pending_inbound())];
        let taken = self.function.take_inbound(&mut chunk);
        let queued = self.function.queue_outbound(&chunk[..taken]);
        debug!(taken, queued, "Echoed inbound data");
    }

    fn host_check_echo(&mut self) {
        for byte in self.transport.host_receive() {
            if byte != self.expected_byte {
                self.stats.mismatches += 1;
            }
            self.expected_byte = byte.wrapping_add(1);
            self.stats.bytes_echoed += 1;
        }
    }

    fn record(&mut self, transfer: Transfer) {
        if transfer.is_ok() {
            self.stats.ok += 1;
        }
        match transfer.tx {
            TxOutcome::Busy => self.stats.busy += 1,
            TxOutcome::Partial { .. } => self.stats.partial += 1,
            TxOutcome::Idle | TxOutcome::Sent(_) => {}
        }
        if matches!(transfer.rx, RxOutcome::Short { .. }) {
            self.stats.short += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::BitDepth;

    fn harness(buffer_samples: u16, write_budget: Option<usize>) -> Harness {
        let config = AudioFunctionConfig::mono(BitDepth::Sixteen, buffer_samples);
        let harness = HarnessConfig { tick_ms: 1, ticks: None, write_budget };
        Harness::new(config, &harness).expect("Failed to build harness")
    }

    #[test]
    fn test_descriptor_decodes_after_enumeration() {
        let harness = harness(32, None);
        let blocks = harness.descriptor().expect("Failed to decode descriptor");

        assert_eq!(blocks.len(), 17);
        assert!(matches!(blocks[0], Block::InterfaceAssociation { first_interface: 0, interface_count: 2, .. }));
    }

    #[test]
    fn test_echo_round_trip_internal_buffers() {
        let mut harness = harness(32, None);
        for _ in 0..10 {
            harness.tick();
        }

        let stats = harness.stats();
        assert_eq!(stats.ticks, 10);
        assert_eq!(stats.bytes_sent, 640);
        assert_eq!(stats.mismatches, 0);
        // Data read on tick n is echoed on tick n + 1.
        assert_eq!(stats.bytes_echoed, 576);
    }

    #[test]
    fn test_echo_survives_partial_writes() {
        let mut harness = harness(32, Some(24));
        for _ in 0..20 {
            harness.tick();
        }

        let stats = harness.stats();
        assert!(stats.partial > 0);
        assert!(stats.bytes_echoed > 0);
        assert_eq!(stats.mismatches, 0);
    }

    #[test]
    fn test_echo_with_caller_buffers() {
        let mut harness = harness(0, None);
        for _ in 0..4 {
            harness.tick();
        }

        // Frames alternate between being read and being echoed.
        let stats = harness.stats();
        assert_eq!(stats.mismatches, 0);
        assert_eq!(stats.bytes_echoed, 2 * EXTERNAL_FRAME_BYTES as u64);
    }

    #[test]
    fn test_busy_transport_counts() {
        let mut harness = harness(32, Some(0));
        for _ in 0..3 {
            harness.tick();
        }

        let stats = harness.stats();
        assert_eq!(stats.bytes_echoed, 0);
        assert_eq!(stats.busy, 2);
    }

    #[test]
    fn test_host_queue_stays_bounded() {
        for (buffer_samples, write_budget) in [(0, None), (32, Some(24)), (32, Some(0))] {
            let mut harness = harness(buffer_samples, write_budget);
            for _ in 0..1000 {
                harness.tick();
                assert!(harness.transport.pending_to_device() < 2 * harness.frame_bytes);
            }

            let stats = harness.stats();
            assert!(stats.frames_deferred > 0);
            assert_eq!(stats.mismatches, 0);
        }
    }

    #[test]
    fn test_no_deferral_when_device_keeps_up() {
        let mut harness = harness(32, None);
        for _ in 0..100 {
            harness.tick();
        }

        assert_eq!(harness.stats().frames_deferred, 0);
        assert_eq!(harness.transport.pending_to_device(), 0);
    }
}
