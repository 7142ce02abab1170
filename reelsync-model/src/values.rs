//! Clamped playback value types.
//!
//! Volume and playback rate travel through video events, the preference
//! store, and cross-tab notifications; the types here guarantee they are
//! finite and in range no matter which source they came from.

/// Minimum difference before two playback values count as distinct.
///
/// Sliders and host scripts emit float jitter well below this; changes
/// smaller than the threshold are ignored by reconciliation.
pub const MIN_SIGNIFICANT_DELTA: f64 = 0.01;

/// Audio volume, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Volume(f64);

impl Volume {
    /// Full volume, the hard fallback when nothing is stored.
    pub const FULL: Volume = Volume(1.0);

    /// Clamps into `[0.0, 1.0]`. Non-finite input falls back to full volume.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Volume(value.clamp(0.0, 1.0))
        } else {
            Volume::FULL
        }
    }

    /// Accepts only finite input, clamped into range.
    pub fn try_new(value: f64) -> Option<Self> {
        value.is_finite().then(|| Volume(value.clamp(0.0, 1.0)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Adds `delta` (may be negative), saturating at the range bounds.
    pub fn stepped(self, delta: f64) -> Self {
        Volume::new(self.0 + delta)
    }

    /// True when the values differ by at least `min_delta`.
    pub fn differs_from(&self, other: Volume, min_delta: f64) -> bool {
        (self.0 - other.0).abs() >= min_delta
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<f64> for Volume {
    fn from(value: f64) -> Self {
        Volume::new(value)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::FULL
    }
}

/// Playback rate, always within the persistence range `[1/256, 32]`.
///
/// Interactive stepping uses the tighter `[0.0625, 16]` range; everything a
/// hotkey can produce stays inside what a store write may carry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlaybackRate(f64);

impl PlaybackRate {
    /// Lower bound accepted for persistence.
    pub const MIN: f64 = 1.0 / 256.0;
    /// Upper bound accepted for persistence.
    pub const MAX: f64 = 32.0;
    /// Lower bound reachable through interactive stepping.
    pub const MIN_INTERACTIVE: f64 = 0.0625;
    /// Upper bound reachable through interactive stepping.
    pub const MAX_INTERACTIVE: f64 = 16.0;

    /// Normal speed.
    pub const NORMAL: PlaybackRate = PlaybackRate(1.0);

    /// Clamps into the persistence range. Non-finite input falls back to
    /// normal speed.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            PlaybackRate(value.clamp(Self::MIN, Self::MAX))
        } else {
            PlaybackRate::NORMAL
        }
    }

    /// Accepts only finite input, clamped into the persistence range.
    pub fn try_new(value: f64) -> Option<Self> {
        value
            .is_finite()
            .then(|| PlaybackRate(value.clamp(Self::MIN, Self::MAX)))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Adds `delta` and clamps into the interactive range.
    pub fn stepped(self, delta: f64) -> Self {
        PlaybackRate(
            (self.0 + delta).clamp(Self::MIN_INTERACTIVE, Self::MAX_INTERACTIVE),
        )
    }

    /// Rounds to the nearest multiple of `step`, staying in the interactive
    /// range. A non-positive step leaves the value unchanged.
    pub fn snapped_to(self, step: f64) -> Self {
        if step <= 0.0 || !step.is_finite() {
            return self;
        }
        let snapped = (self.0 / step).round() * step;
        PlaybackRate(snapped.clamp(Self::MIN_INTERACTIVE, Self::MAX_INTERACTIVE))
    }

    /// True when the values differ by at least `min_delta`.
    pub fn differs_from(&self, other: PlaybackRate, min_delta: f64) -> bool {
        (self.0 - other.0).abs() >= min_delta
    }
}

impl std::fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl From<f64> for PlaybackRate {
    fn from(value: f64) -> Self {
        PlaybackRate::new(value)
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        PlaybackRate::NORMAL
    }
}
