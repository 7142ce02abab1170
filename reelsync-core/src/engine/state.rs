use reelsync_model::{PlaybackRate, PreferenceSet, Volume};
use tokio::time::{Duration, Instant};

/// Session-scoped reconciliation state.
///
/// Holds what the engine currently believes volume and rate should be, and
/// the bookkeeping needed to tell local activity from remote. One instance
/// per page context, reset only when the context is torn down.
#[derive(Debug, Clone)]
pub struct ReconciledState {
    /// Volume picked up from user activity this session. Takes priority
    /// over the stored preference.
    pub session_volume: Option<Volume>,
    /// Playback rate picked up from user activity this session.
    pub session_rate: Option<PlaybackRate>,
    /// Latest resolved preferences, refreshed on every store notification.
    pub preferences: PreferenceSet,
    /// Whether a user gesture has sanctioned audible playback. Starts
    /// false and only ever rises; forced unmuting stays off until it does.
    global_mute_unlocked: bool,
    /// When this context last changed the volume, for telling a store
    /// echo or a racing remote write from genuinely new input.
    pub last_local_volume_change: Option<Instant>,
    /// When this context last changed the rate.
    pub last_local_rate_change: Option<Instant>,
}

impl Default for ReconciledState {
    fn default() -> Self {
        Self {
            session_volume: None,
            session_rate: None,
            preferences: PreferenceSet::default(),
            global_mute_unlocked: false,
            last_local_volume_change: None,
            last_local_rate_change: None,
        }
    }
}

impl ReconciledState {
    /// Volume that should be on every video right now: session memory
    /// first, the stored preference when remembering is on, full volume
    /// as the last resort.
    pub fn volume_to_apply(&self) -> Volume {
        if let Some(volume) = self.session_volume {
            return volume;
        }
        if self.preferences.remember_volume {
            return self.preferences.volume_level;
        }
        Volume::FULL
    }

    /// Rate that should be on every video right now, same fallback order
    /// as [`Self::volume_to_apply`].
    pub fn rate_to_apply(&self) -> PlaybackRate {
        if let Some(rate) = self.session_rate {
            return rate;
        }
        if self.preferences.remember_rate {
            return self.preferences.playback_rate;
        }
        PlaybackRate::NORMAL
    }

    pub fn global_mute_unlocked(&self) -> bool {
        self.global_mute_unlocked
    }

    /// Marks audible playback as sanctioned. Monotonic: nothing in a
    /// session ever locks it again.
    pub fn unlock_global_mute(&mut self) {
        self.global_mute_unlocked = true;
    }

    pub fn note_local_volume(&mut self, volume: Volume) {
        self.session_volume = Some(volume);
        self.last_local_volume_change = Some(Instant::now());
    }

    pub fn note_local_rate(&mut self, rate: PlaybackRate) {
        self.session_rate = Some(rate);
        self.last_local_rate_change = Some(Instant::now());
    }

    pub fn volume_changed_within(&self, window: Duration) -> bool {
        self.last_local_volume_change
            .is_some_and(|at| at.elapsed() < window)
    }

    pub fn rate_changed_within(&self, window: Duration) -> bool {
        self.last_local_rate_change
            .is_some_and(|at| at.elapsed() < window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_falls_back_memory_then_preference_then_full() {
        let mut state = ReconciledState::default();
        assert_eq!(state.volume_to_apply(), Volume::FULL);

        state.preferences.volume_level = Volume::new(0.6);
        assert_eq!(state.volume_to_apply().value(), 0.6);

        state.preferences.remember_volume = false;
        assert_eq!(state.volume_to_apply(), Volume::FULL);

        state.session_volume = Some(Volume::new(0.3));
        assert_eq!(state.volume_to_apply().value(), 0.3);
    }

    #[test]
    fn rate_falls_back_memory_then_preference_then_normal() {
        let mut state = ReconciledState::default();
        assert_eq!(state.rate_to_apply(), PlaybackRate::NORMAL);

        state.preferences.playback_rate = PlaybackRate::new(1.5);
        assert_eq!(state.rate_to_apply().value(), 1.5);

        state.session_rate = Some(PlaybackRate::new(2.0));
        assert_eq!(state.rate_to_apply().value(), 2.0);
    }

    #[test]
    fn mute_unlock_is_monotonic() {
        let mut state = ReconciledState::default();
        assert!(!state.global_mute_unlocked());
        state.unlock_global_mute();
        state.unlock_global_mute();
        assert!(state.global_mute_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn local_change_window_expires() {
        let mut state = ReconciledState::default();
        state.note_local_volume(Volume::new(0.5));
        assert!(state.volume_changed_within(Duration::from_millis(150)));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(!state.volume_changed_within(Duration::from_millis(150)));
    }
}
