use std::sync::Arc;

use anyhow::Result;
use reelsync_core::SyncContext;
use reelsync_core::prelude::Rect;
use reelsync_core::store::MemoryStore;
use reelsync_core::testing::{FakeNotices, FakePage, FakePip, FakeVideo};

/// One simulated browser tab: a page with its own videos and windows,
/// wired to a settings store it may share with other tabs.
pub struct TestTab {
    pub page: FakePage,
    pub pip: FakePip,
    pub notices: FakeNotices,
    pub store: MemoryStore,
    pub context: SyncContext,
}

pub async fn build_tab(store: MemoryStore) -> Result<TestTab> {
    let page = FakePage::new();
    let pip = FakePip::new();
    let notices = FakeNotices::new();
    let context = SyncContext::builder(
        page.surface(),
        Arc::new(store.clone()),
        pip.platform(),
        notices.sink(),
    )
    .app_version("2.4.0")
    .build();
    context.start().await?;
    Ok(TestTab {
        page,
        pip,
        notices,
        store,
        context,
    })
}

/// Adds a video sitting in the middle of the viewport, the active reel.
pub fn centered_video(tab: &TestTab) -> FakeVideo {
    let video = FakeVideo::new().with_bounds(Rect::new(0.0, 40.0, 400.0, 700.0));
    tab.page.add_video(&video);
    video
}
