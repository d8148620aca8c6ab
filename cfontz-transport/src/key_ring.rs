//! Fixed-size FIFO for key activity codes

/// Slots in the ring; one is always left empty
pub const KEY_RING_SIZE: usize = 16;

/// FIFO of raw key codes pulled out of the receive stream.
///
/// A push onto a full ring drops the new code; nothing is overwritten.
#[derive(Debug, Clone)]
pub struct KeyRing {
    contents: [u8; KEY_RING_SIZE],
    head: usize,
    tail: usize,
}

impl Default for KeyRing {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRing {
    pub const fn new() -> Self {
        Self {
            contents: [0; KEY_RING_SIZE],
            head: 0,
            tail: 0,
        }
    }

    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Number of codes that fit at once
    pub const fn capacity(&self) -> usize {
        KEY_RING_SIZE - 1
    }

    pub fn len(&self) -> usize {
        (self.head + KEY_RING_SIZE - self.tail) % KEY_RING_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.head + 1) % KEY_RING_SIZE == self.tail
    }

    /// Queue a code. Returns false (and drops the code) when full.
    pub fn push(&mut self, code: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.contents[self.head] = code;
        self.head = (self.head + 1) % KEY_RING_SIZE;
        true
    }

    /// Oldest code, or 0x00 when empty
    pub fn pop(&mut self) -> u8 {
        if self.is_empty() {
            return 0;
        }
        let code = self.contents[self.tail];
        self.tail = (self.tail + 1) % KEY_RING_SIZE;
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut ring = KeyRing::new();
        for code in 1..=5 {
            assert!(ring.push(code));
        }
        assert_eq!(ring.len(), 5);
        for code in 1..=5 {
            assert_eq!(ring.pop(), code);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut ring = KeyRing::new();
        assert_eq!(ring.pop(), 0);
    }

    #[test]
    fn test_overflow_drops_newest() {
        let mut ring = KeyRing::new();
        for code in 1..=15 {
            assert!(ring.push(code));
        }
        assert!(ring.is_full());
        assert!(!ring.push(99));
        assert_eq!(ring.len(), ring.capacity());
        for code in 1..=15 {
            assert_eq!(ring.pop(), code);
        }
        assert_eq!(ring.pop(), 0);
    }

    #[test]
    fn test_wraps_after_drain() {
        let mut ring = KeyRing::new();
        for round in 0..40u8 {
            assert!(ring.push(round));
            assert_eq!(ring.pop(), round);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reset() {
        let mut ring = KeyRing::new();
        ring.push(3);
        ring.reset();
        assert!(ring.is_empty());
    }
}
