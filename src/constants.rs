//! Software Serial Constants
//!
//! Framing, sizing and timing constants shared by the receive and transmit paths.
//! Framing is fixed at 8 data bits, no parity, 1 stop bit.

/// Data bits per frame, sent least-significant bit first
pub const DATA_BITS: i32 = 8;

/// Bit periods in a complete frame (start + 8 data + stop)
pub const FRAME_BITS: i32 = DATA_BITS + 2;

/// Number of concurrently live instances the trampoline table supports.
///
/// ESP8266 exposes ten interrupt-capable GPIOs usable for this, ESP32 twenty-two.
#[cfg(not(feature = "esp32"))]
pub const MAX_INSTANCES: usize = 10;

#[cfg(feature = "esp32")]
pub const MAX_INSTANCES: usize = 22;

/// Default decoded byte buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 64;

/// Edge buffer slots per decoded byte slot when not configured explicitly
pub const ISR_BUFFER_FACTOR: usize = 10;

/// Default line speed
pub const DEFAULT_BAUD: u32 = 9600;

/// Bit periods `available()` may yield for before declaring "no data"
pub const AVAILABLE_YIELD_BITS: u32 = 20;

/// Maximum distance kept between an idle cursor's last edge and now.
///
/// Half of the signed 32-bit range, so a subsequent edge always yields a
/// positive interval.
pub const IDLE_REBASE_CYCLES: u32 = 1 << 30;

/// Overflow warnings allowed per throttle window
pub const OVERFLOW_LOG_CAP: u32 = 3;

/// Overflow warning throttle window in milliseconds
pub const OVERFLOW_LOG_WINDOW_MS: u64 = 1000;
