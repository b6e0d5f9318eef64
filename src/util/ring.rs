//! # ByteRing - Fixed-Capacity Decoded Byte Buffer
//!
//! Ring buffer holding bytes produced by the receive reconstructor until the
//! consumer reads them. Storage is reserved once at construction and never
//! grows.
//!
//! One slot is sacrificed so that "full" (`next(head) == tail`) and "empty"
//! (`head == tail`) are distinguishable without a separate counter; a ring of
//! capacity `n` therefore holds at most `n - 1` bytes.
//!
//! ## Usage
//!
//! ```rust
//! use softuart_rs::util::ByteRing;
//!
//! let mut ring = ByteRing::try_with_capacity(4).unwrap();
//! assert!(ring.push(0x41));
//! assert_eq!(ring.peek(), Some(0x41));
//! assert_eq!(ring.pop(), Some(0x41));
//! assert_eq!(ring.pop(), None);
//! ```

use std::collections::TryReserveError;

/// Fixed-capacity byte ring with one sacrificed slot
#[derive(Debug, Clone)]
pub struct ByteRing {
    slots: Box<[u8]>,
    head: usize,
    tail: usize,
}

impl ByteRing {
    /// Reserve a ring of `capacity` slots, failing instead of aborting when
    /// memory is short. Capacities below 2 are raised to 2.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let capacity = capacity.max(2);
        let mut storage = Vec::new();
        storage.try_reserve_exact(capacity)?;
        storage.resize(capacity, 0);
        Ok(Self {
            slots: storage.into_boxed_slice(),
            head: 0,
            tail: 0,
        })
    }

    /// Number of slots, including the sacrificed one
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes waiting to be read
    pub fn len(&self) -> usize {
        if self.head >= self.tail {
            self.head - self.tail
        } else {
            self.head + self.slots.len() - self.tail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.next(self.head) == self.tail
    }

    /// Append a byte; returns `false` and drops it when full
    pub fn push(&mut self, byte: u8) -> bool {
        let next = self.next(self.head);
        if next == self.tail {
            return false;
        }
        self.slots[self.head] = byte;
        self.head = next;
        true
    }

    /// Remove and return the oldest byte
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.tail = self.next(self.tail);
        Some(byte)
    }

    /// Oldest byte without removing it
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.tail])
        }
    }

    /// Discard all buffered bytes
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }
}
