use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reelsync_model::{Rect, VideoId};

use crate::error::Result;
use crate::ports::{VideoSurface, WindowId};

/// A clickable control on the host page, usually a button.
pub trait HostControl: Send + Sync {
    /// Simulates a user activation of the control.
    fn activate(&self) -> Result<()>;
}

/// One candidate element considered by the mute control matcher chain,
/// described by the attributes the matchers inspect.
#[derive(Clone)]
pub struct ControlCandidate {
    pub control: Arc<dyn HostControl>,
    /// Accessible name of the element (`aria-label` or equivalent).
    pub accessible_name: Option<String>,
    /// Accessible label of an icon inside the element.
    pub icon_label: Option<String>,
    /// View-box declaration of an icon inside the element.
    pub icon_view_box: Option<String>,
    /// Layout box of the element, when rendered.
    pub bounds: Option<Rect>,
    /// How many ancestors separate the element from the video it was
    /// collected for. Zero for the video's own container.
    pub ancestor_depth: usize,
}

impl fmt::Debug for ControlCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlCandidate")
            .field("accessible_name", &self.accessible_name)
            .field("icon_label", &self.icon_label)
            .field("icon_view_box", &self.icon_view_box)
            .field("bounds", &self.bounds)
            .field("ancestor_depth", &self.ancestor_depth)
            .finish_non_exhaustive()
    }
}

/// Direction of a feed navigation scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Next,
    Previous,
}

/// A scrollable element on the page, described by the properties the
/// navigation container resolution inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollContainer {
    /// Embedder-minted handle, valid until the next `scroll_containers`
    /// call.
    pub id: u64,
    /// Whether the element declares vertical scroll snapping.
    pub vertical_snap: bool,
    /// Whether the element can actually scroll (content overflows).
    pub scrollable: bool,
    /// Whether a feed video sits inside the element.
    pub contains_video: bool,
}

/// An opaque restore destination captured before a video is moved out of
/// the page, remembering its parent, following sibling, and inline style.
///
/// Minted and interpreted only by the embedder; the engine just holds it
/// inside a relocation token until restore time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePoint {
    raw: u64,
}

impl RestorePoint {
    pub fn new(raw: u64) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }
}

/// The host document as the engine sees it.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Every feed video currently in the document, wrapped or not.
    fn discover_videos(&self) -> Vec<Arc<dyn VideoSurface>>;

    /// Current viewport box.
    fn viewport(&self) -> Rect;

    /// Elements near the given video worth testing as its mute control,
    /// ordered innermost first.
    fn mute_control_candidates(&self, video: VideoId) -> Vec<ControlCandidate>;

    /// Scrollable elements on the page, ordered by document position.
    fn scroll_containers(&self) -> Vec<ScrollContainer>;

    /// Scrolls one viewport height within the given container, or within
    /// the document when no container is given.
    async fn scroll_container(
        &self,
        container: Option<u64>,
        direction: ScrollDirection,
    ) -> Result<()>;

    /// Engages or releases the page visibility spoof that reports the tab
    /// as visible and focused regardless of its real state.
    fn set_visibility_override(&self, engaged: bool);

    /// Removes any host overlay capturing pointer events over the video so
    /// its native controls become reachable.
    fn release_overlay_capture(&self, video: VideoId);

    /// Moves the video element into the given companion window and returns
    /// the point to restore it to later.
    async fn move_video_into_window(
        &self,
        video: VideoId,
        window: WindowId,
    ) -> Result<RestorePoint>;

    /// Puts a previously moved video back where it was captured from.
    async fn restore_video(&self, video: VideoId, point: RestorePoint) -> Result<()>;
}
