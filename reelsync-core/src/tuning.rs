//! Timing and threshold knobs for the whole engine.
//!
//! Every debounce window, cooldown, retry offset, and detection threshold
//! lives here so behavior under racy host pages can be tuned (and tested)
//! in one place. The defaults are the shipped behavior; none of them are a
//! wire contract.

use std::time::Duration;

use reelsync_model::values::MIN_SIGNIFICANT_DELTA;

use crate::timing::RetrySchedule;

/// Engine-wide tuning values.
#[derive(Debug, Clone)]
pub struct EngineTuning {
    /// Minimum volume/rate difference that counts as a real change.
    pub min_significant_delta: f64,
    /// Trailing-edge window coalescing volume/rate event bursts.
    pub change_debounce: Duration,
    /// Minimum spacing between outbound host mute-control activations.
    pub mute_action_interval: Duration,
    /// Cadence of the per-video mute-state poll.
    pub mute_poll_interval: Duration,
    /// Per-video ceiling after which the mute poll stops for good.
    pub mute_poll_ceiling: Duration,
    /// Delay between a host mute-control click and state inference, giving
    /// the host page time to flip its own UI.
    pub host_click_settle: Duration,
    /// Minimum spacing between navigation starts. Requests inside the
    /// window are dropped, not queued.
    pub navigation_interval: Duration,
    /// Delay after a navigation before the debounce state resets and
    /// settings re-apply to the current video.
    pub navigation_settle: Duration,
    /// How recent a local keyup must be to claim a store change as this
    /// tab's own hotkey.
    pub hotkey_witness_window: Duration,
    /// Poll cadence while waiting for a hotkey witness to show up.
    pub correlation_poll_interval: Duration,
    /// Poll count before a store change is applied without a witness.
    pub correlation_poll_attempts: u32,
    /// Cadence of the fallback page rescan.
    pub rescan_interval: Duration,
    /// Offsets at which settings re-apply after video initialization,
    /// covering late host-side resets.
    pub apply_schedule: RetrySchedule,
    /// Offsets at which a forced unmute re-asserts itself while the host
    /// keeps re-muting.
    pub unmute_schedule: RetrySchedule,
    /// Minimum rendered height for a video to count as a visible player.
    pub visible_min_height: f64,
    /// Ancestor-walk ceiling for the proximity mute matcher.
    pub max_ancestor_walk: usize,
    /// Companion window size.
    pub companion_width: u32,
    /// Companion window size.
    pub companion_height: u32,
    /// Identical noisy actions admitted per flood window.
    pub flood_burst: u32,
    /// Flood gate window.
    pub flood_window: Duration,
    /// Delay between telemetry counter bumps and the store write that
    /// persists them.
    pub telemetry_flush_debounce: Duration,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            min_significant_delta: MIN_SIGNIFICANT_DELTA,
            change_debounce: Duration::from_millis(150),
            mute_action_interval: Duration::from_millis(300),
            mute_poll_interval: Duration::from_millis(500),
            mute_poll_ceiling: Duration::from_secs(30),
            host_click_settle: Duration::from_millis(150),
            navigation_interval: Duration::from_millis(800),
            navigation_settle: Duration::from_millis(700),
            hotkey_witness_window: Duration::from_millis(500),
            correlation_poll_interval: Duration::from_millis(25),
            correlation_poll_attempts: 20,
            rescan_interval: Duration::from_millis(1000),
            apply_schedule: RetrySchedule::at_offsets_ms([0, 50, 150, 500]),
            unmute_schedule: RetrySchedule::at_offsets_ms([
                100, 300, 600, 1000,
            ]),
            visible_min_height: 100.0,
            max_ancestor_walk: 15,
            companion_width: 360,
            companion_height: 640,
            flood_burst: 8,
            flood_window: Duration::from_secs(10),
            telemetry_flush_debounce: Duration::from_millis(1000),
        }
    }
}
