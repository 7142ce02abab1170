use std::sync::Arc;

use reelsync_model::Rect;
use tracing::trace;

use crate::ports::{ControlCandidate, HostControl};

/// Mute state of the host's own player UI, as far as it can be read off
/// the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMuteState {
    Muted,
    Unmuted,
    /// The control was found but nothing on it reveals its state.
    Unknown,
}

/// Which strategy in the chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    AccessibleName,
    IconLabel,
    ViewBox,
    Proximity,
}

/// A located mute control with whatever state could be inferred.
#[derive(Clone)]
pub struct MatchedControl {
    pub control: Arc<dyn HostControl>,
    pub state: HostMuteState,
    pub matched_by: MatcherKind,
}

impl std::fmt::Debug for MatchedControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchedControl")
            .field("state", &self.state)
            .field("matched_by", &self.matched_by)
            .finish_non_exhaustive()
    }
}

/// Signatures the matcher chain looks for, as data so a host markup change
/// means a config edit rather than new code.
///
/// The defaults encode the host's current markup: the mute button carries
/// an accessible name, its icon carries a state label, and the two icon
/// variants ship with distinct view boxes.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Accessible-name substrings identifying the mute button itself.
    pub accessible_names: Vec<String>,
    /// Icon-label substrings present only while muted.
    pub muted_icon_labels: Vec<String>,
    /// Icon view boxes used by the muted icon variant.
    pub muted_view_boxes: Vec<String>,
    /// Icon view boxes used by the unmuted icon variant.
    pub unmuted_view_boxes: Vec<String>,
    /// How far up the tree the proximity fallback may walk.
    pub max_ancestor_walk: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            accessible_names: vec!["Toggle audio".to_string()],
            muted_icon_labels: vec!["Audio is muted".to_string()],
            muted_view_boxes: vec!["0 0 48 48".to_string()],
            unmuted_view_boxes: vec!["0 0 24 24".to_string()],
            max_ancestor_walk: 15,
        }
    }
}

/// Ordered mute-control location strategies. The first strategy that
/// yields a candidate wins; within a strategy the first candidate wins,
/// candidates arriving innermost first.
#[derive(Debug, Clone, Default)]
pub struct MatcherChain {
    config: MatcherConfig,
}

impl MatcherChain {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Runs the chain over one video's candidates.
    pub fn locate(
        &self,
        candidates: &[ControlCandidate],
        video_bounds: Option<Rect>,
    ) -> Option<MatchedControl> {
        if let Some(found) = self.by_accessible_name(candidates) {
            return Some(found);
        }
        if let Some(found) = self.by_icon_label(candidates) {
            return Some(found);
        }
        if let Some(found) = self.by_view_box(candidates) {
            return Some(found);
        }
        self.by_proximity(candidates, video_bounds)
    }

    fn by_accessible_name(
        &self,
        candidates: &[ControlCandidate],
    ) -> Option<MatchedControl> {
        candidates
            .iter()
            .find(|c| {
                c.accessible_name.as_deref().is_some_and(|name| {
                    self.config
                        .accessible_names
                        .iter()
                        .any(|needle| name.contains(needle.as_str()))
                })
            })
            .map(|c| {
                trace!("mute control matched by accessible name");
                MatchedControl {
                    control: Arc::clone(&c.control),
                    state: self.infer_state(c),
                    matched_by: MatcherKind::AccessibleName,
                }
            })
    }

    fn by_icon_label(&self, candidates: &[ControlCandidate]) -> Option<MatchedControl> {
        candidates
            .iter()
            .find(|c| {
                c.icon_label.as_deref().is_some_and(|label| {
                    self.config
                        .muted_icon_labels
                        .iter()
                        .any(|needle| label.contains(needle.as_str()))
                })
            })
            .map(|c| {
                trace!("mute control matched by icon label");
                MatchedControl {
                    control: Arc::clone(&c.control),
                    state: HostMuteState::Muted,
                    matched_by: MatcherKind::IconLabel,
                }
            })
    }

    fn by_view_box(&self, candidates: &[ControlCandidate]) -> Option<MatchedControl> {
        for candidate in candidates {
            let Some(view_box) = candidate.icon_view_box.as_deref() else {
                continue;
            };
            let state = if self.config.muted_view_boxes.iter().any(|v| v == view_box) {
                HostMuteState::Muted
            } else if self.config.unmuted_view_boxes.iter().any(|v| v == view_box) {
                HostMuteState::Unmuted
            } else {
                continue;
            };
            trace!(view_box, "mute control matched by icon view box");
            return Some(MatchedControl {
                control: Arc::clone(&candidate.control),
                state,
                matched_by: MatcherKind::ViewBox,
            });
        }
        None
    }

    /// Last resort: the candidate nearest the video, within the ancestor
    /// walk ceiling. Its state cannot be read, only its position argues
    /// for it.
    fn by_proximity(
        &self,
        candidates: &[ControlCandidate],
        video_bounds: Option<Rect>,
    ) -> Option<MatchedControl> {
        let video_bounds = video_bounds?;
        candidates
            .iter()
            .filter(|c| c.ancestor_depth <= self.config.max_ancestor_walk)
            .filter_map(|c| {
                let bounds = c.bounds?;
                Some((c, bounds.center_distance_to(&video_bounds)))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(c, _)| {
                trace!("mute control matched by proximity");
                MatchedControl {
                    control: Arc::clone(&c.control),
                    state: HostMuteState::Unknown,
                    matched_by: MatcherKind::Proximity,
                }
            })
    }

    fn infer_state(&self, candidate: &ControlCandidate) -> HostMuteState {
        if candidate.icon_label.as_deref().is_some_and(|label| {
            self.config
                .muted_icon_labels
                .iter()
                .any(|needle| label.contains(needle.as_str()))
        }) {
            return HostMuteState::Muted;
        }
        if let Some(view_box) = candidate.icon_view_box.as_deref() {
            if self.config.muted_view_boxes.iter().any(|v| v == view_box) {
                return HostMuteState::Muted;
            }
            if self.config.unmuted_view_boxes.iter().any(|v| v == view_box) {
                return HostMuteState::Unmuted;
            }
        }
        HostMuteState::Unknown
    }
}
