//! # Transmit Engine
//!
//! Bytes are framed as start (space), 8 data bits LSB first, stop (mark), with
//! line inversion applied. Consecutive bits of the same level are merged into
//! a single [`LevelHold`], so the pin changes only when the level actually
//! changes and a run of identical bits costs one wait.
//!
//! Holds are executed against a running cycle-counter deadline rather than
//! per-hold delays, so scheduling jitter in one hold does not accumulate into
//! the next. Long waits sleep first and finish with a short spin on the
//! counter.

use crate::config::TxDrive;
use crate::constants::FRAME_BITS;
use crate::hal::{Direction, Platform, Pull};

/// One stretch of constant line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelHold {
    /// Electrical level, inversion already applied
    pub high: bool,
    pub cycles: u32,
}

/// Iterator over the coalesced holds that transmit `data`
#[derive(Debug, Clone)]
pub struct HoldPlanner<'a> {
    data: &'a [u8],
    bit_cycles: u32,
    invert: bool,
    byte: usize,
    bit: i32,
    pending: Option<LevelHold>,
}

impl<'a> HoldPlanner<'a> {
    pub fn new(data: &'a [u8], bit_cycles: u32, invert: bool) -> Self {
        Self {
            data,
            bit_cycles,
            invert,
            byte: 0,
            bit: 0,
            pending: None,
        }
    }

    /// Logical level of frame bit `bit` of `byte` (0 = start, 9 = stop)
    fn frame_mark(byte: u8, bit: i32) -> bool {
        match bit {
            0 => false,
            1..=8 => (byte >> (bit - 1)) & 1 == 1,
            _ => true,
        }
    }
}

impl Iterator for HoldPlanner<'_> {
    type Item = LevelHold;

    fn next(&mut self) -> Option<LevelHold> {
        while let Some(&byte) = self.data.get(self.byte) {
            let high = Self::frame_mark(byte, self.bit) ^ self.invert;
            self.bit += 1;
            if self.bit == FRAME_BITS {
                self.bit = 0;
                self.byte += 1;
            }

            match self.pending.as_mut() {
                Some(hold) if hold.high == high => hold.cycles += self.bit_cycles,
                _ => {
                    let flushed = self.pending.replace(LevelHold {
                        high,
                        cycles: self.bit_cycles,
                    });
                    if flushed.is_some() {
                        return flushed;
                    }
                }
            }
        }

        // the last hold of the last byte never waits for a successor
        self.pending.take()
    }
}

/// Put a transmit pin into its idle state
pub(crate) fn prepare_line<P: Platform>(platform: &P, pin: u8, idle_high: bool, drive: TxDrive) {
    match drive {
        TxDrive::PushPull => {
            platform.write_level(pin, idle_high);
            platform.set_direction(pin, Direction::Output);
        }
        TxDrive::PullUpRelease => {
            platform.write_level(pin, false);
            platform.set_pull(pin, Pull::Up);
            platform.set_direction(
                pin,
                if idle_high {
                    Direction::Input
                } else {
                    Direction::Output
                },
            );
        }
    }
}

/// Change the level of a pin already prepared with [`prepare_line`]
pub(crate) fn drive_line<P: Platform>(platform: &P, pin: u8, high: bool, drive: TxDrive) {
    match drive {
        TxDrive::PushPull => platform.write_level(pin, high),
        TxDrive::PullUpRelease if high => platform.set_direction(pin, Direction::Input),
        TxDrive::PullUpRelease => platform.set_direction(pin, Direction::Output),
    }
}

/// Deadline-driven bit transmitter
#[derive(Debug, Clone)]
pub struct TxEngine {
    bit_cycles: u32,
    invert: bool,
    drive: TxDrive,
    interrupts_during_tx: bool,
}

impl TxEngine {
    pub fn new(bit_cycles: u32, invert: bool, drive: TxDrive) -> Self {
        Self {
            bit_cycles,
            invert,
            drive,
            interrupts_during_tx: true,
        }
    }

    pub fn bit_cycles(&self) -> u32 {
        self.bit_cycles
    }

    pub fn set_bit_cycles(&mut self, bit_cycles: u32) {
        self.bit_cycles = bit_cycles;
    }

    pub fn drive(&self) -> TxDrive {
        self.drive
    }

    pub fn interrupts_during_tx(&self) -> bool {
        self.interrupts_during_tx
    }

    /// When disabled, interrupts are masked while bits are timed, except
    /// during the coarse sleep of long holds
    pub fn set_interrupts_during_tx(&mut self, enabled: bool) {
        self.interrupts_during_tx = enabled;
    }

    /// Mark level of the line
    pub fn idle_high(&self) -> bool {
        !self.invert
    }

    pub fn plan<'a>(&self, data: &'a [u8]) -> HoldPlanner<'a> {
        HoldPlanner::new(data, self.bit_cycles, self.invert)
    }

    /// Clock `data` out on `pin`; always runs to completion
    pub fn transmit<P: Platform>(&self, platform: &P, pin: u8, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        drive_line(platform, pin, self.idle_high(), self.drive);

        if !self.interrupts_during_tx {
            platform.disable_interrupts();
        }
        let mut deadline = platform.cycle_count();
        for hold in self.plan(data) {
            drive_line(platform, pin, hold.high, self.drive);
            deadline = deadline.wrapping_add(hold.cycles);
            self.wait_until(platform, deadline);
        }
        if !self.interrupts_during_tx {
            platform.enable_interrupts();
        }

        data.len()
    }

    fn wait_until<P: Platform>(&self, platform: &P, deadline: u32) {
        let mhz = (platform.cycles_per_second() / 1_000_000).max(1) as i32;
        let micros = deadline.wrapping_sub(platform.cycle_count()) as i32 / mhz;

        if micros > 1 {
            if !self.interrupts_during_tx {
                platform.enable_interrupts();
            }
            platform.delay_micros(micros as u32 - 1);
            if !self.interrupts_during_tx {
                platform.disable_interrupts();
            }
        }

        while deadline.wrapping_sub(platform.cycle_count()) as i32 > 1 {
            std::hint::spin_loop();
        }
    }
}
