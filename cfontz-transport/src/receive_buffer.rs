//! Circular receive buffer with transactional look-ahead
//!
//! Three cursors walk the ring: `head` is where the next byte from the link
//! lands, `tail` is the first byte not yet committed, and `peek` is the
//! look-ahead position used while a packet is being validated. Bytes in
//! `[tail, peek)` are tentatively consumed; only [`ReceiveBuffer::get_byte`]
//! and [`ReceiveBuffer::accept_peeked`] move `tail`.

use crate::link::Link;
use crate::protocol::MAX_DATA_LENGTH;
use crate::TransportError;
use std::time::Duration;
use tracing::trace;

/// Default capacity, comfortably larger than the biggest packet
pub const RECEIVE_BUFFER_SIZE: usize = 512;

pub struct ReceiveBuffer {
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
    peek: usize,
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::with_capacity(RECEIVE_BUFFER_SIZE)
    }
}

impl ReceiveBuffer {
    /// Create a buffer; one slot always stays empty, so `capacity - 1` bytes fit.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            peek: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Drop everything, committed or not
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.peek = 0;
    }

    fn distance(&self, from: usize, to: usize) -> usize {
        (to + self.buf.len() - from) % self.buf.len()
    }

    fn advance(&self, pos: usize) -> usize {
        (pos + 1) % self.buf.len()
    }

    /// Bytes between `tail` and `head`
    pub fn bytes_available(&self) -> usize {
        self.distance(self.tail, self.head)
    }

    /// Room left before unread data would be overwritten
    pub fn free_space(&self) -> usize {
        self.buf.len() - 1 - self.bytes_available()
    }

    /// Perform one bounded read from `link`, appending what arrives.
    ///
    /// Reads at most `max_bytes` and never more than the free space. Returns the
    /// number of bytes stored; zero is not an error.
    pub fn fill<L: Link + ?Sized>(
        &mut self,
        link: &mut L,
        max_bytes: usize,
        wait: Duration,
    ) -> Result<usize, TransportError> {
        let want = max_bytes.min(self.free_space()).min(MAX_DATA_LENGTH);
        if want == 0 {
            return Ok(0);
        }

        let mut chunk = [0u8; MAX_DATA_LENGTH];
        let n = link.read_available(&mut chunk[..want], wait)?;
        if n > 0 {
            trace!("rx {:02x?}", &chunk[..n]);
            self.extend_from_slice(&chunk[..n]);
        }
        Ok(n)
    }

    /// Append bytes directly, dropping whatever does not fit.
    /// Returns how many were stored.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.free_space());
        for &b in &bytes[..n] {
            self.buf[self.head] = b;
            self.head = self.advance(self.head);
        }
        n
    }

    /// Consume one committed byte; 0x00 when empty.
    pub fn get_byte(&mut self) -> u8 {
        if self.tail == self.head {
            return 0;
        }
        let b = self.buf[self.tail];
        if self.peek == self.tail {
            self.peek = self.advance(self.peek);
        }
        self.tail = self.advance(self.tail);
        b
    }

    /// Bytes between `peek` and `head`
    pub fn peek_bytes_available(&self) -> usize {
        self.distance(self.peek, self.head)
    }

    /// Rewind the look-ahead to the committed position
    pub fn sync_peek(&mut self) {
        self.peek = self.tail;
    }

    /// Read the next look-ahead byte without committing; 0x00 when exhausted.
    pub fn peek_byte(&mut self) -> u8 {
        if self.peek == self.head {
            return 0;
        }
        let b = self.buf[self.peek];
        self.peek = self.advance(self.peek);
        b
    }

    /// Commit everything read through the look-ahead
    pub fn accept_peeked(&mut self) {
        self.tail = self.peek;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut rb = ReceiveBuffer::default();
        assert_eq!(rb.extend_from_slice(&[1, 2, 3]), 3);
        assert_eq!(rb.bytes_available(), 3);
        assert_eq!(rb.get_byte(), 1);
        assert_eq!(rb.get_byte(), 2);
        assert_eq!(rb.get_byte(), 3);
        assert_eq!(rb.bytes_available(), 0);
    }

    #[test]
    fn test_empty_returns_sentinel() {
        let mut rb = ReceiveBuffer::default();
        assert_eq!(rb.get_byte(), 0);
        assert_eq!(rb.peek_byte(), 0);
        assert_eq!(rb.bytes_available(), 0);
    }

    #[test]
    fn test_peek_does_not_commit() {
        let mut rb = ReceiveBuffer::default();
        rb.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        rb.sync_peek();
        assert_eq!(rb.peek_byte(), 0xAA);
        assert_eq!(rb.peek_byte(), 0xBB);
        assert_eq!(rb.peek_bytes_available(), 1);
        assert_eq!(rb.bytes_available(), 3);

        rb.sync_peek();
        assert_eq!(rb.peek_byte(), 0xAA);
        assert_eq!(rb.get_byte(), 0xAA);
        assert_eq!(rb.bytes_available(), 2);
    }

    #[test]
    fn test_accept_peeked_commits() {
        let mut rb = ReceiveBuffer::default();
        rb.extend_from_slice(&[1, 2, 3, 4]);
        rb.sync_peek();
        rb.peek_byte();
        rb.peek_byte();
        rb.accept_peeked();
        assert_eq!(rb.bytes_available(), 2);
        assert_eq!(rb.get_byte(), 3);
    }

    #[test]
    fn test_get_byte_keeps_peek_behind_head() {
        let mut rb = ReceiveBuffer::default();
        rb.extend_from_slice(&[1, 2]);
        rb.sync_peek();
        rb.get_byte();
        assert_eq!(rb.peek_bytes_available(), 1);
        assert_eq!(rb.peek_byte(), 2);
    }

    #[test]
    fn test_wraparound() {
        let mut rb = ReceiveBuffer::with_capacity(8);
        for round in 0..10u8 {
            let data = [round, round + 1, round + 2, round + 3, round + 4];
            assert_eq!(rb.extend_from_slice(&data), 5);
            for &b in &data {
                assert_eq!(rb.get_byte(), b);
            }
        }
        assert_eq!(rb.bytes_available(), 0);
    }

    #[test]
    fn test_never_overwrites_unread() {
        let mut rb = ReceiveBuffer::with_capacity(8);
        assert_eq!(rb.extend_from_slice(&[0u8; 10]), 7);
        assert_eq!(rb.free_space(), 0);
        assert_eq!(rb.extend_from_slice(&[9]), 0);
        rb.get_byte();
        assert_eq!(rb.extend_from_slice(&[9]), 1);
    }

    #[test]
    fn test_reset() {
        let mut rb = ReceiveBuffer::default();
        rb.extend_from_slice(&[1, 2, 3]);
        rb.reset();
        assert_eq!(rb.bytes_available(), 0);
        assert_eq!(rb.peek_bytes_available(), 0);
    }
}
