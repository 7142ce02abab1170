use parking_lot::Mutex;
use tokio::time::{Duration, Instant, sleep};

use crate::tuning::EngineTuning;

/// Records the most recent local keyup so store notifications can be
/// correlated with the hotkey that caused them.
///
/// Store changes carry no origin. A change landing right after a local
/// keyup is this tab's own adjustment echoed back and should hit the
/// videos immediately; a change with no witness is another tab's doing
/// and waits out the poll schedule before applying.
#[derive(Debug, Default)]
pub struct HotkeyWitness {
    last_keyup: Mutex<Option<Instant>>,
}

impl HotkeyWitness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        *self.last_keyup.lock() = Some(Instant::now());
    }

    pub fn seen_within(&self, window: Duration) -> bool {
        self.last_keyup
            .lock()
            .is_some_and(|at| at.elapsed() < window)
    }
}

/// Waits for a hotkey witness to show up, polling on the configured
/// cadence. Returns whether one appeared; either way the caller proceeds
/// to apply afterwards, re-checking state at apply time.
pub async fn await_witness(witness: &HotkeyWitness, tuning: &EngineTuning) -> bool {
    if witness.seen_within(tuning.hotkey_witness_window) {
        return true;
    }
    for _ in 0..tuning.correlation_poll_attempts {
        sleep(tuning.correlation_poll_interval).await;
        if witness.seen_within(tuning.hotkey_witness_window) {
            return true;
        }
    }
    false
}
