//! Event and command types crossing the embedder boundary.

use std::fmt;
use std::sync::Arc;

use reelsync_model::{KeyInput, VideoId};

use crate::ports::VideoSurface;

/// Page activity forwarded by the embedder into [`crate::SyncContext`].
///
/// Events carry observed facts, never requests. Requests arrive as
/// [`Command`]s instead.
#[derive(Clone)]
pub enum PageEvent {
    /// Videos were added to or removed from the document.
    VideosMutated,
    /// The document's real visibility changed.
    VisibilityChanged { visible: bool },
    /// The page is being unloaded or put into the back/forward cache.
    PageHide,
    /// A video's volume or muted property changed, by any actor.
    VideoVolumeChanged {
        video: Arc<dyn VideoSurface>,
        volume: f64,
        muted: bool,
    },
    /// A video's playback rate changed, by any actor.
    VideoRateChanged {
        video: Arc<dyn VideoSurface>,
        rate: f64,
    },
    /// The user activated a host mute control that the mute sync had
    /// matched earlier.
    HostMuteClicked { video: VideoId },
    KeyDown { input: KeyInput },
    KeyUp { input: KeyInput },
    /// A video entered the platform's standard PiP window.
    StandardPipEntered { video: VideoId },
    /// The companion window was closed outside the engine, usually by the
    /// user.
    CompanionClosed,
}

impl fmt::Debug for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VideosMutated => write!(f, "VideosMutated"),
            Self::VisibilityChanged { visible } => {
                write!(f, "VisibilityChanged {{ visible: {visible} }}")
            }
            Self::PageHide => write!(f, "PageHide"),
            Self::VideoVolumeChanged { video, volume, muted } => write!(
                f,
                "VideoVolumeChanged {{ video: {}, volume: {volume}, muted: {muted} }}",
                video.id()
            ),
            Self::VideoRateChanged { video, rate } => write!(
                f,
                "VideoRateChanged {{ video: {}, rate: {rate} }}",
                video.id()
            ),
            Self::HostMuteClicked { video } => {
                write!(f, "HostMuteClicked {{ video: {video} }}")
            }
            Self::KeyDown { input } => write!(f, "KeyDown {{ input: {input:?} }}"),
            Self::KeyUp { input } => write!(f, "KeyUp {{ input: {input:?} }}"),
            Self::StandardPipEntered { video } => {
                write!(f, "StandardPipEntered {{ video: {video} }}")
            }
            Self::CompanionClosed => write!(f, "CompanionClosed"),
        }
    }
}

/// A request from the embedder, usually relayed from the extension popup
/// or a browser command shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextReel,
    PreviousReel,
    /// Adjust volume by the configured step, positive or negative sign.
    VolumeStep { up: bool },
    /// Adjust playback rate by the configured step.
    RateStep { up: bool },
    RateReset,
    TogglePictureInPicture,
}

/// Synchronous acknowledgement returned for every [`Command`] before any
/// spawned work runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAck {
    /// The command was accepted and its work scheduled.
    Accepted,
    /// The command was dropped by a rate gate or because no video is
    /// available to act on.
    Dropped,
}
