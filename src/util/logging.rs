//! # Rate-Limited Logging
//!
//! A saturated serial line can report overflow on every poll. [`LogThrottle`]
//! caps how many of those warnings reach the log per time window.
//!
//! ```rust
//! use softuart_rs::util::LogThrottle;
//!
//! let mut throttle = LogThrottle::new(1000, 2);
//! assert!(throttle.allow());
//! assert!(throttle.allow());
//! assert!(!throttle.allow());
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Messages seen in the current window
    count: u32,
    /// Messages refused since the last allowed one
    suppressed: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires).
    ///
    /// When a new window opens after messages were refused, the refused
    /// count is logged once and the tally cleared.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0).as_millis() as u64 > self.window_ms {
            self.t0 = now;
            self.count = 0;
            let suppressed = std::mem::take(&mut self.suppressed);
            if suppressed > 0 {
                log::warn!("{suppressed} similar message(s) suppressed");
            }
        }

        self.count += 1;
        if self.count <= self.cap {
            true
        } else {
            self.suppressed = self.suppressed.saturating_add(1);
            false
        }
    }

    /// Number of refused messages since the last call, resetting the tally
    pub fn take_suppressed(&mut self) -> u32 {
        std::mem::take(&mut self.suppressed)
    }

    /// Reset the throttle (start new window immediately)
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
        self.suppressed = 0;
    }
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_basic() {
        let mut throttle = LogThrottle::new(60_000, 3);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());

        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.take_suppressed(), 2);
        assert_eq!(throttle.take_suppressed(), 0);
    }

    #[test]
    fn test_log_throttle_reset() {
        let mut throttle = LogThrottle::new(60_000, 1);
        assert!(throttle.allow());
        assert!(!throttle.allow());

        throttle.reset();
        assert!(throttle.allow());
        assert!(!throttle.allow());
    }

    #[test]
    fn test_window_expiry() {
        let mut throttle = LogThrottle::new(0, 1);
        assert!(throttle.allow());
        std::thread::sleep(std::time::Duration::from_millis(2));
        assert!(throttle.allow());
    }

    #[test]
    fn test_new_window_reports_and_clears_suppressed() {
        let mut throttle = LogThrottle::new(1, 1);
        assert!(throttle.allow());
        assert!(!throttle.allow());
        assert!(!throttle.allow());

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(throttle.allow());
        assert_eq!(throttle.take_suppressed(), 0);
    }
}
