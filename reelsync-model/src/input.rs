//! Keyboard surface input types.

/// Keys the engine binds. Anything else arrives as [`Key::Other`] and is
/// ignored without logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    /// Mute toggle.
    M,
    /// Custom picture-in-picture toggle.
    P,
    /// Quick-volume digit, `0`..=`9`.
    Digit(u8),
    Other(String),
}

impl Key {
    /// Quick-volume mapping: digit `d` selects `d * 10%` volume.
    pub fn quick_volume(&self) -> Option<f64> {
        match self {
            Key::Digit(d) if *d <= 9 => Some(f64::from(*d) / 10.0),
            _ => None,
        }
    }
}

/// One keyboard event as the page surface reports it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
    /// Focus was inside an input, textarea, or content-editable element.
    /// Every binding is suppressed for these events.
    pub from_editable: bool,
    /// The event fired inside the companion picture-in-picture window,
    /// where bare arrow keys navigate instead of passing through to the
    /// host page.
    pub from_companion: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        KeyInput {
            key,
            ctrl: false,
            alt: false,
            meta: false,
            from_editable: false,
            from_companion: false,
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn in_editable(mut self) -> Self {
        self.from_editable = true;
        self
    }

    pub fn in_companion(mut self) -> Self {
        self.from_companion = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_map_to_tenths() {
        assert_eq!(Key::Digit(0).quick_volume(), Some(0.0));
        assert_eq!(Key::Digit(9).quick_volume(), Some(0.9));
        assert_eq!(Key::M.quick_volume(), None);
    }
}
