//! Time management utilities

use std::time::Instant;

/// Monotonic clock abstraction used by frame statistics.
///
/// Implementations report elapsed wall-clock seconds since some fixed
/// origin. The origin itself does not matter; only differences are used.
pub trait TimeSource {
    /// Seconds elapsed since the clock's origin
    fn seconds_since_start(&self) -> f32;
}

/// Monotonic clock backed by [`std::time::Instant`]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock whose origin is the moment of construction
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemClock {
    fn seconds_since_start(&self) -> f32 {
        self.origin.elapsed().as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.seconds_since_start();
        let b = clock.seconds_since_start();
        assert!(b >= a);
    }
}
