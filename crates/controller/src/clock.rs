//! Process-uptime clock for the control loop.

use std::time::Instant;

use greenhouse_core::{Clock, Millis};

/// Milliseconds since the controller started, wrapping at `u32::MAX`.
pub(crate) struct MonotonicClock {
    started_at: Instant,
}

impl MonotonicClock {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        // Truncation is the wrap.
        self.started_at.elapsed().as_millis() as Millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_near_zero_and_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = clock.now_ms();
        assert!(a < 1_000);
        assert!(b >= a + 5);
    }
}
