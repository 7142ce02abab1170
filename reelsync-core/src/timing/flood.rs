//! Keyed flood gate for noisy repeated actions.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::time::{Duration, Instant};

/// Admits at most `burst` occurrences of a key per window.
///
/// Mute sync can fire the same correction path many times per second when
/// the host page fights back; the gate keeps the logs and the outbound
/// actions bounded without suppressing distinct keys.
#[derive(Debug)]
pub struct FloodGate {
    window: Duration,
    burst: u32,
    buckets: Mutex<HashMap<String, Bucket>>,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

impl FloodGate {
    pub fn new(window: Duration, burst: u32) -> Self {
        Self {
            window,
            burst: burst.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// True when this occurrence fits in the key's current window.
    pub fn allow(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            window_start: now,
            count: 0,
        });
        if now.duration_since(bucket.window_start) >= self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }
        if bucket.count >= self.burst {
            return false;
        }
        bucket.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_limit_applies_per_key() {
        let gate = FloodGate::new(Duration::from_secs(10), 2);
        assert!(gate.allow("sync"));
        assert!(gate.allow("sync"));
        assert!(!gate.allow("sync"));
        assert!(gate.allow("other"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_rollover_resets_the_count() {
        let gate = FloodGate::new(Duration::from_secs(10), 1);
        assert!(gate.allow("sync"));
        assert!(!gate.allow("sync"));
        advance(Duration::from_secs(11)).await;
        assert!(gate.allow("sync"));
    }
}
