//! Minimum-interval gate.

use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// Admits at most one action per interval; everything inside the window is
/// dropped, not queued.
///
/// Used for mute-control activations and navigation starts, where replaying
/// a suppressed action later would be worse than losing it.
#[derive(Debug)]
pub struct MinInterval {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl MinInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// True when the action may run now; records the acquisition.
    pub fn try_acquire(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Clears the gate so the next acquisition succeeds immediately.
    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_acquisition_inside_window_is_dropped() {
        let gate = MinInterval::new(Duration::from_millis(800));
        assert!(gate.try_acquire());
        advance(Duration::from_millis(200)).await;
        assert!(!gate.try_acquire());
        advance(Duration::from_millis(700)).await;
        assert!(gate.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_reopens_the_gate() {
        let gate = MinInterval::new(Duration::from_millis(300));
        assert!(gate.try_acquire());
        gate.reset();
        assert!(gate.try_acquire());
    }
}
