use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::mute::MuteSync;
use crate::registry::VideoHandle;

/// Watches one video's muted flag for flips no event reported.
///
/// Host scripts and direct user interaction both change `muted` without
/// anything the embedder can observe, so each adopted video gets polled
/// for a bounded settling window. An observed unmute counts as a user
/// gesture and lifts the global lock; an observed re-mute on a sanctioned
/// session gets fought back.
pub(super) async fn poll_mute_state(sync: MuteSync, handle: Arc<VideoHandle>) {
    let started = Instant::now();
    loop {
        sleep(sync.tuning.mute_poll_interval).await;
        if started.elapsed() >= sync.tuning.mute_poll_ceiling {
            trace!(video = %handle.id(), "mute poll reached its ceiling");
            break;
        }
        if !handle.is_connected() {
            break;
        }

        let muted = handle.surface().muted();
        if muted == handle.last_observed_muted() {
            continue;
        }
        handle.note_muted(muted);
        debug!(video = %handle.id(), muted, "mute flip observed by poll");

        if muted {
            if sync.engine.global_mute_unlocked() {
                sync.spawn_force_unmute(Arc::clone(&handle));
            }
        } else {
            sync.engine.unlock_global_mute();
            sync.telemetry.count("muteSync.userUnmute");
            sync.sync_all_to(false, Some(handle.id()));
        }
    }
}
