//! Two page contexts sharing one settings store behave like browser tabs:
//! a change made in either lands on the other's videos exactly once and
//! never bounces back.

mod support;

use std::time::Duration;

use anyhow::Result;
use reelsync_core::prelude::{Key, KeyInput, SettingsStore, StoreKey};
use reelsync_core::store::MemoryStore;
use reelsync_core::{Command, PageEvent};
use tokio::time::sleep;

use support::{TestTab, build_tab, centered_video};

async fn two_tabs() -> Result<(TestTab, TestTab)> {
    let store = MemoryStore::new();
    let tab_a = build_tab(store.clone()).await?;
    let tab_b = build_tab(store).await?;
    Ok((tab_a, tab_b))
}

#[tokio::test(start_paused = true)]
async fn rate_change_in_one_tab_reaches_the_other() -> Result<()> {
    let (tab_a, tab_b) = two_tabs().await?;
    let video_a = centered_video(&tab_a);
    let video_b = centered_video(&tab_b);
    tab_a.context.handle_event(PageEvent::VideosMutated);
    tab_b.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(10)).await;

    for _ in 0..4 {
        tab_a.context.handle_command(Command::RateStep { up: true });
    }
    assert_eq!(video_a.playback_rate(), 1.5);
    assert_eq!(video_b.playback_rate(), 1.0);

    // Debounced persist in one tab, correlation wait in the other.
    sleep(Duration::from_millis(800)).await;
    assert_eq!(video_b.playback_rate(), 1.5);
    assert_eq!(tab_b.context.engine().rate_to_apply().value(), 1.5);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn volume_burst_persists_once_and_converges() -> Result<()> {
    let (tab_a, tab_b) = two_tabs().await?;
    let video_a = centered_video(&tab_a);
    let video_b = centered_video(&tab_b);
    tab_a.context.handle_event(PageEvent::VideosMutated);
    tab_b.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(10)).await;

    let mut changes = tab_a.store.subscribe();
    for volume in [0.3, 0.35, 0.4] {
        tab_a.context.handle_event(PageEvent::VideoVolumeChanged {
            video: video_a.surface(),
            volume,
            muted: false,
        });
    }
    sleep(Duration::from_millis(800)).await;

    let mut volume_writes = 0;
    while let Ok(change) = changes.try_recv() {
        if change.touches(StoreKey::VolumeLevel) {
            volume_writes += 1;
        }
    }
    assert_eq!(volume_writes, 1, "a burst lands as a single store write");
    assert_eq!(video_b.volume(), 0.4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn applied_changes_do_not_ping_pong() -> Result<()> {
    let (tab_a, tab_b) = two_tabs().await?;
    let _video_a = centered_video(&tab_a);
    let video_b = centered_video(&tab_b);
    tab_a.context.handle_event(PageEvent::VideosMutated);
    tab_b.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(10)).await;

    let mut changes = tab_a.store.subscribe();
    tab_a.context.handle_event(PageEvent::KeyDown {
        input: KeyInput::plain(Key::ArrowDown).with_ctrl(),
    });
    tab_a.context.handle_event(PageEvent::KeyUp {
        input: KeyInput::plain(Key::ArrowDown).with_ctrl(),
    });
    sleep(Duration::from_millis(700)).await;
    assert!((video_b.volume() - 0.9).abs() < 1e-6);

    // The receiving tab notices its own player change, as a real page
    // would; convergence must not write the same value back.
    tab_b.context.handle_event(PageEvent::VideoVolumeChanged {
        video: video_b.surface(),
        volume: video_b.volume(),
        muted: false,
    });
    sleep(Duration::from_secs(5)).await;

    let mut volume_writes = 0;
    while let Ok(change) = changes.try_recv() {
        if change.touches(StoreKey::VolumeLevel) {
            volume_writes += 1;
        }
    }
    assert_eq!(volume_writes, 1, "convergence must not echo store writes");
    Ok(())
}
