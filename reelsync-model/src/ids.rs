use uuid::Uuid;

/// Engine-side identity for a discovered video element.
///
/// The id belongs to the handle, not the DOM node: if the host page detaches
/// an element and a later rescan finds it again, the element keeps its
/// marker attribute and the registry keeps the original handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoId(Uuid);

impl VideoId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        VideoId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        VideoId(id)
    }
}
