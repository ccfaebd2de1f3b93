//! Outbound and inbound sample storage.
//!
//! A [`StreamBuffer`] either owns its bytes or borrows them from the caller, so
//! the same exchange logic serves both the internal-buffer mode and the
//! caller-supplied mode.

use aura_core::AudioTransport;
use tracing::warn;

use crate::transfer::{RxOutcome, Transfer, transfer_bytes};

enum Storage<'a> {
    Owned(Box<[u8]>),
    Borrowed(&'a mut [u8]),
}

impl Storage<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Borrowed(bytes) => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Borrowed(bytes) => bytes,
        }
    }
}

/// Fixed-capacity byte buffer with a count of valid bytes at its front.
pub struct StreamBuffer<'a> {
    storage: Storage<'a>,
    len: usize,
}

impl StreamBuffer<'static> {
    /// Zeroed buffer owned by the function.
    #[must_use]
    pub fn owned(capacity: usize) -> Self {
        Self { storage: Storage::Owned(vec![0; capacity].into_boxed_slice()), len: 0 }
    }
}

impl<'a> StreamBuffer<'a> {
    /// Empty buffer over caller storage.
    #[must_use]
    pub fn borrowed(buf: &'a mut [u8]) -> Self {
        Self { storage: Storage::Borrowed(buf), len: 0 }
    }

    /// Caller storage whose first `len` bytes are already valid.
    #[must_use]
    pub fn borrowed_with_len(buf: &'a mut [u8], len: usize) -> Self {
        let len = if len > buf.len() {
            warn!(len, capacity = buf.len(), "Valid length exceeds buffer, clamping");
            buf.len()
        } else {
            len
        };
        Self { storage: Storage::Borrowed(buf), len }
    }

    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.bytes().len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.storage.bytes()[..self.len]
    }

    /// Append as much of `data` as fits. Returns the number of bytes taken.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let start = self.len;
        let n = data.len().min(self.capacity() - start);
        self.storage.bytes_mut()[start..start + n].copy_from_slice(&data[..n]);
        self.len += n;
        n
    }

    /// Move up to `out.len()` valid bytes into `out`, keeping the rest at the front.
    pub fn take(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        let len = self.len;
        let bytes = self.storage.bytes_mut();
        out[..n].copy_from_slice(&bytes[..n]);
        bytes.copy_within(n..len, 0);
        self.len = len - n;
        n
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [u8], &mut usize) {
        (self.storage.bytes_mut(), &mut self.len)
    }
}

impl std::fmt::Debug for StreamBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("owned", &self.is_owned())
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}

/// Outbound and inbound buffer pair driven by [`StreamBuffers::exchange`].
#[derive(Debug)]
pub struct StreamBuffers<'a> {
    pub tx: StreamBuffer<'a>,
    pub rx: StreamBuffer<'a>,
}

impl StreamBuffers<'static> {
    #[must_use]
    pub fn owned(capacity: usize) -> Self {
        Self { tx: StreamBuffer::owned(capacity), rx: StreamBuffer::owned(capacity) }
    }
}

impl<'a> StreamBuffers<'a> {
    #[must_use]
    pub fn borrowed(tx: StreamBuffer<'a>, rx: StreamBuffer<'a>) -> Self {
        Self { tx, rx }
    }

    /// Send pending outbound bytes and, if the inbound buffer has been drained,
    /// request a full inbound frame.
    ///
    /// Inbound data that has not been taken yet is never overwritten; the read
    /// is simply skipped until the consumer catches up.
    pub fn exchange<T: AudioTransport + ?Sized>(&mut self, transport: &mut T) -> Transfer {
        let rx_request = if self.rx.is_empty() { self.rx.capacity() } else { 0 };

        let (rx_bytes, _) = self.rx.parts_mut();
        let transfer = transfer_bytes(transport, Some(self.tx.parts_mut()), Some(&mut rx_bytes[..rx_request]));

        if let RxOutcome::Received(received) = transfer.rx {
            self.rx.len = received;
        }
        transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TxOutcome;

    struct Echo {
        accept: usize,
        sent: Vec<u8>,
        frame: Vec<u8>,
        reads: usize,
    }

    impl AudioTransport for Echo {
        fn write(&mut self, bytes: &[u8]) -> usize {
            let n = self.accept.min(bytes.len());
            self.sent.extend_from_slice(&bytes[..n]);
            n
        }

        fn read(&mut self, buf: &mut [u8]) -> usize {
            self.reads += 1;
            let n = self.frame.len().min(buf.len());
            buf[..n].copy_from_slice(&self.frame[..n]);
            n
        }
    }

    #[test]
    fn test_owned_buffers_start_empty() {
        let buffers = StreamBuffers::owned(64);
        assert!(buffers.tx.is_owned());
        assert_eq!(buffers.tx.capacity(), 64);
        assert_eq!(buffers.rx.capacity(), 64);
        assert!(buffers.tx.is_empty());
        assert!(buffers.rx.is_empty());
    }

    #[test]
    fn test_push_stops_at_capacity() {
        let mut buffer = StreamBuffer::owned(4);
        assert_eq!(buffer.push(&[1, 2, 3]), 3);
        assert_eq!(buffer.push(&[4, 5, 6]), 1);
        assert_eq!(buffer.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_take_compacts() {
        let mut buffer = StreamBuffer::owned(8);
        buffer.push(&[1, 2, 3, 4, 5]);
        let mut out = [0u8; 2];
        assert_eq!(buffer.take(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(buffer.as_slice(), &[3, 4, 5]);
    }

    #[test]
    fn test_borrowed_with_len_clamps() {
        let mut storage = [7u8; 4];
        let buffer = StreamBuffer::borrowed_with_len(&mut storage, 10);
        assert!(!buffer.is_owned());
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_exchange_fills_drained_rx() {
        let mut buffers = StreamBuffers::owned(4);
        buffers.tx.push(&[9, 8, 7]);
        let mut echo = Echo { accept: usize::MAX, sent: Vec::new(), frame: vec![1, 2, 3, 4], reads: 0 };

        let transfer = buffers.exchange(&mut echo);

        assert!(transfer.is_ok());
        assert_eq!(transfer.tx, TxOutcome::Sent(3));
        assert_eq!(echo.sent, [9, 8, 7]);
        assert_eq!(buffers.rx.as_slice(), &[1, 2, 3, 4]);
        assert!(buffers.tx.is_empty());
    }

    #[test]
    fn test_exchange_skips_read_while_rx_pending() {
        let mut buffers = StreamBuffers::owned(4);
        buffers.rx.push(&[5]);
        let mut echo = Echo { accept: usize::MAX, sent: Vec::new(), frame: vec![1, 2, 3, 4], reads: 0 };

        let transfer = buffers.exchange(&mut echo);

        assert_eq!(transfer.rx, RxOutcome::Idle);
        assert_eq!(echo.reads, 0);
        assert_eq!(buffers.rx.as_slice(), &[5]);
    }

    #[test]
    fn test_exchange_short_read_leaves_rx_empty() {
        let mut buffers = StreamBuffers::owned(4);
        let mut echo = Echo { accept: usize::MAX, sent: Vec::new(), frame: vec![1, 2], reads: 0 };

        let transfer = buffers.exchange(&mut echo);

        assert!(!transfer.is_ok());
        assert!(buffers.rx.is_empty());
    }

    #[test]
    fn test_exchange_over_borrowed_storage() {
        let mut tx = [1u8, 2, 3, 4, 5, 6];
        let mut rx = [0u8; 2];
        let mut echo = Echo { accept: 4, sent: Vec::new(), frame: vec![0xA, 0xB], reads: 0 };
        {
            let mut buffers =
                StreamBuffers::borrowed(StreamBuffer::borrowed_with_len(&mut tx, 6), StreamBuffer::borrowed(&mut rx));
            let transfer = buffers.exchange(&mut echo);
            assert_eq!(transfer.tx, TxOutcome::Partial { sent: 4, remaining: 2 });
            assert_eq!(buffers.tx.as_slice(), &[5, 6]);
        }
        assert_eq!(rx, [0xA, 0xB]);
    }
}
