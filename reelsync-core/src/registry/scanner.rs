use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, trace};

use crate::ports::PageSurface;
use crate::registry::{VideoHandle, VideoRegistry};

/// Sweeps the page for feed videos and adopts them into the registry.
///
/// Mutation events drive most discovery; the periodic rescan exists because
/// the host sometimes swaps video elements without firing a mutation the
/// embedder can observe.
pub struct VideoScanner {
    page: Arc<dyn PageSurface>,
    registry: Arc<VideoRegistry>,
}

impl fmt::Debug for VideoScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoScanner").finish_non_exhaustive()
    }
}

impl VideoScanner {
    pub fn new(page: Arc<dyn PageSurface>, registry: Arc<VideoRegistry>) -> Self {
        Self { page, registry }
    }

    /// One full sweep. Returns how many videos were newly adopted.
    pub fn scan(&self) -> usize {
        let mut adopted = 0;
        for surface in self.page.discover_videos() {
            let (handle, is_new) = self.registry.adopt(surface);
            if is_new {
                self.reveal_controls(&handle);
                adopted += 1;
            }
        }
        let pruned = self.registry.prune();
        if adopted > 0 || pruned > 0 {
            debug!(adopted, pruned, tracked = self.registry.len(), "scan finished");
        } else {
            trace!(tracked = self.registry.len(), "scan found nothing new");
        }
        adopted
    }

    /// Periodic rescan loop. The returned handle is aborted on shutdown.
    pub fn spawn_rescan(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                sleep(interval).await;
                self.scan();
            }
        })
    }

    /// Makes the native controls of a freshly adopted video reachable: the
    /// host hides them and floats a capture overlay above the element.
    fn reveal_controls(&self, handle: &Arc<VideoHandle>) {
        handle.surface().set_native_controls(true);
        self.page.release_overlay_capture(handle.id());
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use super::*;
    use crate::testing::{FakePage, FakeVideo};

    #[test]
    fn scan_adopts_each_video_once() {
        let page = FakePage::new();
        let video = FakeVideo::new();
        page.add_video(&video);

        let registry = Arc::new(VideoRegistry::new());
        let scanner = VideoScanner::new(page.surface(), Arc::clone(&registry));

        assert_eq!(scanner.scan(), 1);
        assert_eq!(scanner.scan(), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn scan_reveals_native_controls_on_adoption() {
        let page = FakePage::new();
        let video = FakeVideo::new();
        page.add_video(&video);

        let registry = Arc::new(VideoRegistry::new());
        let scanner = VideoScanner::new(page.surface(), Arc::clone(&registry));
        scanner.scan();

        assert!(video.native_controls_enabled());
        assert!(page.overlay_released_for(video.surface().id()));
    }

    #[test]
    fn scan_prunes_videos_gone_from_the_page() {
        let page = FakePage::new();
        let video = FakeVideo::new();
        page.add_video(&video);

        let registry = Arc::new(VideoRegistry::new());
        let scanner = VideoScanner::new(page.surface(), Arc::clone(&registry));
        scanner.scan();

        page.remove_video(&video);
        video.detach();
        scanner.scan();
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rescan_loop_picks_up_late_videos() {
        let page = FakePage::new();
        let registry = Arc::new(VideoRegistry::new());
        let scanner = Arc::new(VideoScanner::new(page.surface(), Arc::clone(&registry)));
        let task = Arc::clone(&scanner).spawn_rescan(Duration::from_secs(1));
        tokio::task::yield_now().await;

        let video = FakeVideo::new();
        page.add_video(&video);
        assert!(registry.is_empty());

        advance(Duration::from_millis(1100)).await;
        tokio::task::yield_now().await;
        assert_eq!(registry.len(), 1);

        task.abort();
    }
}
