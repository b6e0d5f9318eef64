//! # Receive Reconstructor
//!
//! Turns the stream of captured edges back into bytes. Each edge says "from
//! this cycle on, the line was at this level"; the time since the previous
//! edge says how many bit periods the previous level lasted. Bits are sampled
//! at their centre: half a bit period is subtracted from every interval, so an
//! edge landing anywhere within half a bit of a boundary counts for that
//! boundary.
//!
//! ## Cursor
//!
//! ```text
//! IDLE (8) --start edge (space)--> START (-1) --> 0 .. 7 data bits --> IDLE
//! ```
//!
//! The cursor counts the last completed data bit. When an interval spans more
//! than one bit period, the bits with no edge of their own ("hidden" bits)
//! repeat the last received level. Data arrives LSB first, so each new bit is
//! shifted in at the top of the accumulator.
//!
//! ## Missing stop edge
//!
//! If the final data bits and the stop bit share the idle (mark) level, no
//! edge ever closes the byte. [`RxDecoder::stop_edge_due`] synthesises the
//! missing mark edge once enough time has passed for the stop bit to have
//! been sent.

use super::capture::EdgeEvent;
use crate::constants::{DATA_BITS, FRAME_BITS, IDLE_REBASE_CYCLES};
use crate::util::ByteRing;

/// Cursor value while waiting for a start bit
pub const IDLE: i32 = DATA_BITS;

/// Cursor value after a start bit, before data bit 0
pub const START: i32 = -1;

/// What happened to one edge fed to the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOutcome {
    /// Bytes completed by this edge
    pub stored: u8,
    /// Bytes completed but dropped because the byte ring was full
    pub dropped: u8,
    /// Edge came less than half a bit after the previous one and was ignored
    pub spurious: bool,
}

/// Bit/byte reconstruction state machine
#[derive(Debug, Clone)]
pub struct RxDecoder {
    bit_cycles: u32,
    invert: bool,
    cursor: i32,
    accumulator: u32,
    last_cycle: u32,
}

impl RxDecoder {
    pub fn new(bit_cycles: u32, invert: bool) -> Self {
        Self {
            bit_cycles: bit_cycles.max(1),
            invert,
            cursor: IDLE,
            accumulator: 0,
            last_cycle: 0,
        }
    }

    pub fn bit_cycles(&self) -> u32 {
        self.bit_cycles
    }

    pub fn set_bit_cycles(&mut self, bit_cycles: u32) {
        self.bit_cycles = bit_cycles.max(1);
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn cursor(&self) -> i32 {
        self.cursor
    }

    pub fn is_idle(&self) -> bool {
        self.cursor == IDLE
    }

    pub fn last_cycle(&self) -> u32 {
        self.last_cycle
    }

    /// Drop any partially received byte and wait for a new start bit.
    ///
    /// The line counts as idle for a long time before `now`, so a start edge
    /// arriving right away is accepted.
    pub fn reset(&mut self, now: u32) {
        self.cursor = IDLE;
        self.accumulator = 0;
        self.last_cycle = now.wrapping_sub(IDLE_REBASE_CYCLES);
    }

    /// Feed one edge, storing any completed byte into `bytes`
    pub fn decode(&mut self, event: EdgeEvent, bytes: &mut ByteRing) -> DecodeOutcome {
        let mut outcome = DecodeOutcome::default();
        let bit = self.bit_cycles as i32;
        let mark = event.mark(self.invert);
        let stamp = event.timestamp();

        let mut cycles = (stamp.wrapping_sub(self.last_cycle) as i32).saturating_sub(bit / 2);
        if cycles < 0 {
            outcome.spurious = true;
            return outcome;
        }
        self.last_cycle = stamp;

        loop {
            if (START..DATA_BITS - 1).contains(&self.cursor) {
                if cycles >= bit {
                    let hidden = (cycles / bit).min(DATA_BITS - 1 - self.cursor);
                    let repeat_mark = self.accumulator & 0x80 != 0;
                    self.accumulator >>= hidden;
                    if repeat_mark {
                        self.accumulator |= (0xff << (DATA_BITS - hidden)) & 0xff;
                    }
                    self.cursor += hidden;
                    cycles -= hidden * bit;
                }
                if self.cursor < DATA_BITS - 1 {
                    self.cursor += 1;
                    cycles -= bit;
                    self.accumulator >>= 1;
                    if mark {
                        self.accumulator |= 0x80;
                    }
                }
            } else if self.cursor == DATA_BITS - 1 {
                self.cursor = IDLE;
                cycles -= bit;
                if bytes.push(self.accumulator as u8) {
                    outcome.stored += 1;
                } else {
                    outcome.dropped += 1;
                }
                // hidden-bit fill reads bit 7, so it must start from zero
                self.accumulator = 0;
            } else {
                if !mark {
                    self.cursor = START;
                }
                break;
            }

            if cycles < 0 {
                break;
            }
        }

        outcome
    }

    /// Synthesised mark edge closing a byte whose stop edge never came.
    ///
    /// Returns `None` while idle, before any data bit, or while the stop bit
    /// could still be in flight at `now`.
    pub fn stop_edge_due(&self, now: u32) -> Option<EdgeEvent> {
        if !(0..DATA_BITS).contains(&self.cursor) {
            return None;
        }
        let expected = (FRAME_BITS - self.cursor) as u32 * self.bit_cycles;
        if now.wrapping_sub(self.last_cycle) < expected {
            return None;
        }
        Some(EdgeEvent::from_logical(
            self.last_cycle.wrapping_add(expected),
            true,
            self.invert,
        ))
    }

    /// Keep an idle cursor's reference within reach of the next edge.
    ///
    /// Call only when no edges are queued.
    pub fn rebase_idle(&mut self, now: u32) {
        if self.is_idle() && now.wrapping_sub(self.last_cycle) > IDLE_REBASE_CYCLES {
            self.last_cycle = now.wrapping_sub(IDLE_REBASE_CYCLES);
        }
    }
}
