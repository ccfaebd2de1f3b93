//! Non-blocking transfers between sample buffers and the audio transport.

use aura_core::AudioTransport;
use tracing::{debug, trace, warn};

/// What happened to the outbound buffer during one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// No buffer or nothing pending
    Idle,
    /// Every pending byte was accepted; the buffer is now empty
    Sent(usize),
    /// Some bytes were accepted; the rest moved to the front of the buffer
    Partial { sent: usize, remaining: usize },
    /// The transport accepted nothing; the buffer is untouched
    Busy,
}

/// What happened to the inbound buffer during one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// No buffer or nothing requested
    Idle,
    /// Exactly the requested number of bytes arrived
    Received(usize),
    /// The transport delivered a different amount than requested
    Short { requested: usize, received: usize },
}

/// Result of one transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub tx: TxOutcome,
    pub rx: RxOutcome,
}

impl Transfer {
    /// True unless either side failed. A partial write still counts as success
    /// because the remainder is kept for the next call.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self.tx, TxOutcome::Busy) && !matches!(self.rx, RxOutcome::Short { .. })
    }
}

/// Push pending outbound bytes and pull one inbound frame.
///
/// `tx` is the outbound buffer with its count of valid bytes. After the call the
/// count reflects what is still unsent, and those bytes start at offset 0.
/// `rx` is filled only if the transport delivers exactly `rx.len()` bytes.
///
/// Inbound data is not accumulated across calls: a short read fails the call and
/// whatever the transport copied is not accounted for. Outbound partial writes,
/// on the other hand, are compacted and retried. This asymmetry is intentional
/// for now.
pub fn transfer_bytes<T: AudioTransport + ?Sized>(
    transport: &mut T,
    tx: Option<(&mut [u8], &mut usize)>,
    rx: Option<&mut [u8]>,
) -> Transfer {
    let tx = match tx {
        Some((buf, count)) => send(transport, buf, count),
        None => TxOutcome::Idle,
    };
    let rx = match rx {
        Some(buf) => receive(transport, buf),
        None => RxOutcome::Idle,
    };

    let transfer = Transfer { tx, rx };
    trace!(?transfer, "Audio transfer");
    transfer
}

fn send<T: AudioTransport + ?Sized>(transport: &mut T, buf: &mut [u8], count: &mut usize) -> TxOutcome {
    if *count > buf.len() {
        warn!(count = *count, capacity = buf.len(), "Outbound count exceeds buffer, clamping");
        *count = buf.len();
    }

    let pending = *count;
    if pending == 0 {
        return TxOutcome::Idle;
    }

    let mut accepted = transport.write(&buf[..pending]);
    if accepted > pending {
        warn!(accepted, pending, "Transport claims more bytes than offered");
        accepted = pending;
    }

    match accepted {
        0 => TxOutcome::Busy,
        sent if sent == pending => {
            *count = 0;
            TxOutcome::Sent(sent)
        }
        sent => {
            buf.copy_within(sent..pending, 0);
            *count = pending - sent;
            debug!(sent, remaining = *count, "Partial write, compacted outbound buffer");
            TxOutcome::Partial { sent, remaining: *count }
        }
    }
}

fn receive<T: AudioTransport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> RxOutcome {
    let requested = buf.len();
    if requested == 0 {
        return RxOutcome::Idle;
    }

    let received = transport.read(buf);
    if received == requested {
        RxOutcome::Received(received)
    } else {
        RxOutcome::Short { requested, received }
    }
}

/// Sample-oriented form of [`transfer_bytes`] for 9 to 16-bit samples.
///
/// Samples travel as little-endian 16-bit words. The outbound count is in
/// samples on entry and on return; the inbound request is `rx.len()` samples,
/// i.e. twice as many bytes.
///
/// Each call packs into freshly allocated byte buffers sized to the sample
/// slices. Callers on a hard per-tick budget should use internal buffers
/// ([`crate::StreamBuffers::exchange`]), which allocate nothing per call.
///
/// If the transport accepts an odd number of bytes, the split sample's
/// trailing byte is dropped and the count is rounded down to whole samples.
pub fn transfer_samples<T: AudioTransport + ?Sized>(
    transport: &mut T,
    tx: Option<(&mut [u16], &mut usize)>,
    rx: Option<&mut [u16]>,
) -> Transfer {
    let mut tx_bytes = tx
        .as_ref()
        .map(|(samples, count)| pack(&samples[..(**count).min(samples.len())]))
        .unwrap_or_default();
    let mut tx_len = tx_bytes.len();
    let mut rx_bytes = vec![0u8; rx.as_ref().map_or(0, |samples| samples.len() * 2)];

    let transfer = transfer_bytes(
        transport,
        tx.is_some().then_some((tx_bytes.as_mut_slice(), &mut tx_len)),
        rx.is_some().then_some(rx_bytes.as_mut_slice()),
    );

    if let Some((samples, count)) = tx {
        if tx_len % 2 != 0 {
            warn!(remaining = tx_len, "Transport split a sample, dropping its trailing byte");
        }
        unpack(&tx_bytes[..tx_len], samples);
        *count = tx_len / 2;
    }

    if let Some(samples) = rx {
        let filled = match transfer.rx {
            RxOutcome::Received(received) | RxOutcome::Short { received, .. } => {
                received.min(rx_bytes.len())
            }
            RxOutcome::Idle => 0,
        };
        unpack(&rx_bytes[..filled], samples);
    }

    transfer
}

fn pack(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|sample| sample.to_le_bytes()).collect()
}

fn unpack(bytes: &[u8], samples: &mut [u16]) {
    for (sample, chunk) in samples.iter_mut().zip(bytes.chunks_exact(2)) {
        *sample = u16::from_le_bytes([chunk[0], chunk[1]]);
    }
}
