//! Feed-level session features: reel navigation, the floating companion
//! player, and the keyboard surface driving both.

mod keyboard;
mod navigation;
mod pip;

pub use keyboard::KeyboardControls;
pub use navigation::Navigator;
pub use pip::{PipManager, RelocationToken};
