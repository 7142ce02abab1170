//! In-memory fakes for every port, used by the crate's own tests and
//! exported behind the `test-utils` feature for embedder test suites.
//!
//! The fakes are deliberately simple state holders with inspection
//! methods; anything resembling host behavior (swallowed unmutes, failing
//! window opens) is opt-in per instance.

mod control;
mod notices;
mod page;
mod pip;
mod video;

use crate::ports::ControlCandidate;

pub use control::FakeControl;
pub use notices::FakeNotices;
pub use page::FakePage;
pub use pip::{FakeCompanionWindow, FakePip};
pub use video::FakeVideo;

/// Candidate shaped like the host's real mute button markup.
pub fn mute_button_candidate(
    control: &FakeControl,
    accessible_name: &str,
    icon_view_box: Option<&str>,
) -> ControlCandidate {
    ControlCandidate {
        control: control.as_host_control(),
        accessible_name: Some(accessible_name.to_string()),
        icon_label: None,
        icon_view_box: icon_view_box.map(str::to_string),
        bounds: None,
        ancestor_depth: 1,
    }
}
