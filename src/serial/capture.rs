//! # Edge Capture
//!
//! Interrupt-context producer side of the receive path. On every edge of the
//! rx pin the handler reads the cycle counter and the pin level, packs both
//! into one 32-bit word and appends it to a lock-free single-producer /
//! single-consumer ring. The foreground reconstructor drains the ring.
//!
//! ## Word layout
//!
//! ```text
//! bit 31..1  cycle counter (bit 0 of the counter is discarded)
//! bit 0      inverted raw pin level (0 = high, 1 = low)
//! ```
//!
//! Losing one cycle of timestamp precision is irrelevant next to bit periods
//! of hundreds to thousands of cycles.
//!
//! ## Ordering
//!
//! Only the interrupt advances `head`; only the foreground advances `tail`.
//! A slot is written before `head` is released and read before `tail` is
//! released, so each side's acquire load of the other index makes the slot
//! contents visible.

use super::registry::EdgeSink;
use crate::hal::Platform;
use std::collections::TryReserveError;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// One captured edge: timestamp with the raw level folded into bit 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent(u32);

impl EdgeEvent {
    /// Pack a cycle count and the raw electrical level seen on the pin
    pub fn capture(cycle: u32, raw_high: bool) -> Self {
        EdgeEvent((cycle | 1) ^ raw_high as u32)
    }

    /// Pack a logical level (mark = `true`), undoing line inversion
    pub fn from_logical(cycle: u32, mark: bool, invert: bool) -> Self {
        Self::capture(cycle, mark ^ invert)
    }

    pub fn from_word(word: u32) -> Self {
        EdgeEvent(word)
    }

    pub fn word(self) -> u32 {
        self.0
    }

    /// Capture time, off by at most one cycle
    pub fn timestamp(self) -> u32 {
        self.0
    }

    /// Electrical level after the edge
    pub fn raw_high(self) -> bool {
        self.0 & 1 == 0
    }

    /// Logical level after the edge (`true` = mark)
    pub fn mark(self, invert: bool) -> bool {
        self.raw_high() ^ invert
    }
}

/// Lock-free SPSC ring of packed edge words
#[derive(Debug)]
pub struct EdgeRing {
    slots: Box<[AtomicU32]>,
    head: AtomicUsize,
    tail: AtomicUsize,
    overflow: AtomicBool,
}

impl EdgeRing {
    /// Reserve `capacity` slots (one is sacrificed); raised to at least 2
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let capacity = capacity.max(2);
        let mut storage = Vec::new();
        storage.try_reserve_exact(capacity)?;
        storage.extend((0..capacity).map(|_| AtomicU32::new(0)));
        Ok(Self {
            slots: storage.into_boxed_slice(),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflow: AtomicBool::new(false),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Producer side. Drops the event and raises the overflow flag when full.
    pub fn push(&self, event: EdgeEvent) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) % self.slots.len();
        if next == self.tail.load(Ordering::Acquire) {
            self.overflow.store(true, Ordering::Release);
            return false;
        }
        self.slots[head].store(event.word(), Ordering::Relaxed);
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side. Oldest event, in capture order.
    pub fn pop(&self) -> Option<EdgeEvent> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let word = self.slots[tail].load(Ordering::Relaxed);
        self.tail.store((tail + 1) % self.slots.len(), Ordering::Release);
        Some(EdgeEvent::from_word(word))
    }

    /// Events waiting for the consumer
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (head + self.slots.len() - tail) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Consumer side. Drop everything queued so far.
    pub fn discard_all(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Read and clear the producer's overflow flag
    pub fn take_overflow(&self) -> bool {
        self.overflow.swap(false, Ordering::AcqRel)
    }
}

/// Interrupt-side state of one receiving instance
pub struct EdgeCapture<P: Platform> {
    platform: Arc<P>,
    pin: u8,
    ring: EdgeRing,
}

impl<P: Platform> EdgeCapture<P> {
    pub fn new(platform: Arc<P>, pin: u8, ring: EdgeRing) -> Self {
        Self {
            platform,
            pin,
            ring,
        }
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn ring(&self) -> &EdgeRing {
        &self.ring
    }
}

impl<P: Platform> EdgeSink for EdgeCapture<P> {
    fn on_edge(&self) {
        let cycle = self.platform.cycle_count();
        let high = self.platform.read_level(self.pin);
        self.ring.push(EdgeEvent::capture(cycle, high));
    }
}
