//! Simulated GPIO platform for testing
//!
//! This module provides an in-process [`Platform`] that can be used to run
//! software serial instances without hardware. Pins can be wired together into
//! nets, edge interrupts fire synchronously on the caller's stack when a net
//! changes level, and the cycle counter advances on every read and on every
//! sleep, so busy-wait loops terminate.
//!
//! Net level resolution:
//! - any driver (output pin or injected level) present: wired-AND of drivers
//! - otherwise high if any member has a pull-up
//! - otherwise the last resolved level
//!
//! While interrupts are disabled, edges are remembered once per pin and the
//! handlers run when interrupts are re-enabled, like a hardware pending flag.

use super::{Direction, HalError, IsrHandler, Platform, Pull};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct PinState {
    direction: Direction,
    pull: Pull,
    out_level: bool,
    injected: Option<bool>,
    handler: Option<IsrHandler>,
}

impl Default for PinState {
    fn default() -> Self {
        Self {
            direction: Direction::Input,
            pull: Pull::None,
            out_level: false,
            injected: None,
            handler: None,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    pins: HashMap<u8, PinState>,
    /// Groups of wired pins; unconnected pins form their own net
    nets: Vec<Vec<u8>>,
    /// Last resolved level per net, keyed by the net's lowest pin
    levels: HashMap<u8, bool>,
    pending: Vec<(u8, IsrHandler)>,
    irq_masked: bool,
    history: HashMap<u8, Vec<(u32, bool)>>,
}

impl SimState {
    fn net_of(&self, pin: u8) -> Vec<u8> {
        self.nets
            .iter()
            .find(|net| net.contains(&pin))
            .cloned()
            .unwrap_or_else(|| vec![pin])
    }

    fn net_key(net: &[u8]) -> u8 {
        net.iter().copied().min().unwrap_or_default()
    }

    fn resolve(&self, net: &[u8]) -> bool {
        let mut drivers = net.iter().filter_map(|p| {
            let state = self.pins.get(p)?;
            match (state.injected, state.direction) {
                (Some(level), _) => Some(level),
                (None, Direction::Output) => Some(state.out_level),
                (None, Direction::Input) => None,
            }
        });

        if let Some(first) = drivers.next() {
            return drivers.fold(first, |acc, level| acc && level);
        }

        let pulled_up = net
            .iter()
            .any(|p| self.pins.get(p).map(|s| s.pull == Pull::Up).unwrap_or(false));
        if pulled_up {
            return true;
        }

        self.levels.get(&Self::net_key(net)).copied().unwrap_or(false)
    }
}

/// In-process GPIO/interrupt/cycle-counter simulation
#[derive(Debug)]
pub struct SimPlatform {
    state: Mutex<SimState>,
    clock: AtomicU32,
    cycles_per_second: u32,
    cycles_per_read: u32,
    valid_pins: Option<HashSet<u8>>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        SimPlatformBuilder::new().build()
    }
}

impl SimPlatform {
    /// Create a simulated 80 MHz platform with every pin valid
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder for a customised platform
    pub fn builder() -> SimPlatformBuilder {
        SimPlatformBuilder::new()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not wedge every other user of the platform.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wire two pins together so they share a level
    pub fn connect(&self, a: u8, b: u8) {
        self.mutate(a, |state| {
            let net_a = state.net_of(a);
            let net_b = state.net_of(b);
            if net_a.contains(&b) {
                return;
            }
            state.nets.retain(|net| !net.contains(&a) && !net.contains(&b));
            let mut merged = net_a;
            merged.extend(net_b);
            state.nets.push(merged);
        });
    }

    /// Drive a pin from outside the device under test
    pub fn set_level(&self, pin: u8, high: bool) {
        self.mutate(pin, |state| {
            state.pins.entry(pin).or_default().injected = Some(high);
        });
    }

    /// Stop driving a pin from outside
    pub fn release(&self, pin: u8) {
        self.mutate(pin, |state| {
            state.pins.entry(pin).or_default().injected = None;
        });
    }

    /// Advance the cycle counter without reading it
    pub fn advance(&self, cycles: u32) {
        self.clock.fetch_add(cycles, Ordering::SeqCst);
    }

    /// Current counter value without the per-read advance
    pub fn now(&self) -> u32 {
        self.clock.load(Ordering::SeqCst)
    }

    /// Level changes seen on `pin`'s net, as (cycle, level)
    pub fn transitions(&self, pin: u8) -> Vec<(u32, bool)> {
        self.lock().history.get(&pin).cloned().unwrap_or_default()
    }

    /// Forget the recorded level history
    pub fn clear_transitions(&self) {
        self.lock().history.clear();
    }

    /// Whether an edge handler is attached to `pin`
    pub fn has_interrupt(&self, pin: u8) -> bool {
        self.lock()
            .pins
            .get(&pin)
            .map(|s| s.handler.is_some())
            .unwrap_or(false)
    }

    /// Configured direction of `pin`
    pub fn direction(&self, pin: u8) -> Direction {
        self.lock()
            .pins
            .get(&pin)
            .map(|s| s.direction)
            .unwrap_or(Direction::Input)
    }

    /// Whether interrupts are currently masked
    pub fn interrupts_masked(&self) -> bool {
        self.lock().irq_masked
    }

    /// Apply a change to the net containing `pin` and fire edge handlers if
    /// the resolved level changed.
    fn mutate<F>(&self, pin: u8, change: F)
    where
        F: FnOnce(&mut SimState),
    {
        let fire = {
            let mut state = self.lock();
            let before_net = state.net_of(pin);
            let before = state.resolve(&before_net);
            change(&mut state);
            let net = state.net_of(pin);
            let after = state.resolve(&net);
            let key = SimState::net_key(&net);
            let previous = state.levels.insert(key, after);
            if before_net.len() != net.len() && previous != Some(after) {
                // A merge re-resolves the joined net; treat it as a level change.
                self.record_edge(&mut state, &net, after)
            } else if before != after {
                self.record_edge(&mut state, &net, after)
            } else {
                Vec::new()
            }
        };

        for handler in fire {
            handler();
        }
    }

    fn record_edge(&self, state: &mut SimState, net: &[u8], level: bool) -> Vec<IsrHandler> {
        let now = self.now();
        let mut fire = Vec::new();
        for p in net {
            state.history.entry(*p).or_default().push((now, level));
            let handler = state.pins.get(p).and_then(|s| s.handler);
            if let Some(handler) = handler {
                if state.irq_masked {
                    if !state.pending.iter().any(|(pending, _)| pending == p) {
                        state.pending.push((*p, handler));
                    }
                } else {
                    fire.push(handler);
                }
            }
        }
        fire
    }
}

impl Platform for SimPlatform {
    fn is_valid_pin(&self, pin: u8) -> bool {
        self.valid_pins
            .as_ref()
            .map(|valid| valid.contains(&pin))
            .unwrap_or(true)
    }

    fn set_direction(&self, pin: u8, direction: Direction) {
        self.mutate(pin, |state| {
            state.pins.entry(pin).or_default().direction = direction;
        });
    }

    fn set_pull(&self, pin: u8, pull: Pull) {
        self.mutate(pin, |state| {
            state.pins.entry(pin).or_default().pull = pull;
        });
    }

    fn write_level(&self, pin: u8, high: bool) {
        self.mutate(pin, |state| {
            state.pins.entry(pin).or_default().out_level = high;
        });
    }

    fn read_level(&self, pin: u8) -> bool {
        let state = self.lock();
        let net = state.net_of(pin);
        state.resolve(&net)
    }

    fn attach_edge_interrupt(&self, pin: u8, handler: IsrHandler) -> Result<(), HalError> {
        if !self.is_valid_pin(pin) {
            return Err(HalError::InterruptAttach {
                pin,
                reason: "pin not interrupt capable".to_string(),
            });
        }
        self.lock().pins.entry(pin).or_default().handler = Some(handler);
        Ok(())
    }

    fn detach_interrupt(&self, pin: u8) {
        let mut state = self.lock();
        state.pins.entry(pin).or_default().handler = None;
        state.pending.retain(|(p, _)| *p != pin);
    }

    fn cycle_count(&self) -> u32 {
        self.clock
            .fetch_add(self.cycles_per_read, Ordering::SeqCst)
            .wrapping_add(self.cycles_per_read)
    }

    fn cycles_per_second(&self) -> u32 {
        self.cycles_per_second
    }

    fn delay_micros(&self, micros: u32) {
        self.advance(micros.wrapping_mul(self.cycles_per_second / 1_000_000));
    }

    fn disable_interrupts(&self) {
        self.lock().irq_masked = true;
    }

    fn enable_interrupts(&self) {
        let pending = {
            let mut state = self.lock();
            state.irq_masked = false;
            std::mem::take(&mut state.pending)
        };
        for (_, handler) in pending {
            handler();
        }
    }

    fn yield_now(&self, budget_micros: u32) {
        self.delay_micros(budget_micros);
    }
}

/// Builder for [`SimPlatform`]
///
/// # Examples
///
/// ```rust
/// use softuart_rs::hal::SimPlatform;
///
/// let sim = SimPlatform::builder()
///     .cycles_per_second(160_000_000)
///     .cycles_per_read(2)
///     .start_cycle(0xFFFF_0000)
///     .build();
/// assert_eq!(sim.now(), 0xFFFF_0000);
/// ```
#[derive(Debug, Clone)]
pub struct SimPlatformBuilder {
    cycles_per_second: u32,
    cycles_per_read: u32,
    start_cycle: u32,
    valid_pins: Option<HashSet<u8>>,
}

impl Default for SimPlatformBuilder {
    fn default() -> Self {
        Self {
            cycles_per_second: 80_000_000,
            cycles_per_read: 4,
            start_cycle: 1_000_000,
            valid_pins: None,
        }
    }
}

impl SimPlatformBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cycle counter rate; at least 1 MHz so microsecond sleeps advance the clock
    pub fn cycles_per_second(mut self, hz: u32) -> Self {
        self.cycles_per_second = hz.max(1_000_000);
        self
    }

    /// Cycles the counter advances on every read
    pub fn cycles_per_read(mut self, cycles: u32) -> Self {
        self.cycles_per_read = cycles.max(1);
        self
    }

    /// Initial counter value, e.g. close to 2^32 to exercise wraparound
    pub fn start_cycle(mut self, cycle: u32) -> Self {
        self.start_cycle = cycle;
        self
    }

    /// Restrict usable pins; all pins are valid by default
    pub fn valid_pins(mut self, pins: &[u8]) -> Self {
        self.valid_pins = Some(pins.iter().copied().collect());
        self
    }

    pub fn build(self) -> SimPlatform {
        SimPlatform {
            state: Mutex::new(SimState::default()),
            clock: AtomicU32::new(self.start_cycle),
            cycles_per_second: self.cycles_per_second,
            cycles_per_read: self.cycles_per_read,
            valid_pins: self.valid_pins,
        }
    }
}
