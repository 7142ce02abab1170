//! Feed-session behavior through the public surface: adoption applying
//! stored settings, navigation pacing, forced unmutes, and the companion
//! window lifecycle.

mod support;

use std::time::Duration;

use anyhow::Result;
use reelsync_core::prelude::{Key, KeyInput, Rect, SettingsStore, StoreDelta, StoreKey};
use reelsync_core::store::MemoryStore;
use reelsync_core::testing::FakeVideo;
use reelsync_core::{Command, CommandAck, PageEvent};
use tokio::time::sleep;

use support::{build_tab, centered_video};

#[tokio::test(start_paused = true)]
async fn fresh_feed_picks_up_the_stored_volume() -> Result<()> {
    let store = MemoryStore::new();
    store
        .write(StoreDelta::new().with(StoreKey::VolumeLevel, 0.4))
        .await?;
    let tab = build_tab(store).await?;

    let video = centered_video(&tab);
    tab.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(600)).await;

    assert_eq!(video.volume(), 0.4);
    assert!(video.native_controls_enabled());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rapid_navigation_collapses_to_one_scroll() -> Result<()> {
    let tab = build_tab(MemoryStore::new()).await?;

    assert_eq!(
        tab.context.handle_command(Command::NextReel),
        CommandAck::Accepted
    );
    assert_eq!(
        tab.context.handle_command(Command::NextReel),
        CommandAck::Dropped
    );
    sleep(Duration::from_millis(50)).await;

    assert_eq!(tab.page.scrolls().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn companion_window_restores_the_video_when_closed_by_the_user() -> Result<()> {
    let tab = build_tab(MemoryStore::new()).await?;
    let video = centered_video(&tab);
    tab.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(10)).await;
    let id = video.surface().id();

    assert_eq!(
        tab.context.handle_command(Command::TogglePictureInPicture),
        CommandAck::Accepted
    );
    sleep(Duration::from_millis(10)).await;
    assert!(tab.context.pip().is_open());
    assert!(tab.page.visibility_overridden());

    // The user closes the floating window directly.
    tab.context.handle_event(PageEvent::CompanionClosed);
    sleep(Duration::from_millis(10)).await;

    assert!(!tab.context.pip().is_open());
    assert_eq!(tab.page.restore_count(id), 1);
    assert!(!tab.page.visibility_overridden());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn advancing_the_feed_unmutes_the_next_reel_after_audio_intent() -> Result<()> {
    let tab = build_tab(MemoryStore::new()).await?;
    let first = centered_video(&tab);
    let second = FakeVideo::new()
        .start_muted()
        .with_bounds(Rect::new(0.0, 840.0, 400.0, 700.0));
    tab.page.add_video(&second);
    tab.context.handle_event(PageEvent::VideosMutated);
    sleep(Duration::from_millis(10)).await;
    assert!(second.is_muted(), "off-screen reel starts muted");

    // Raising the volume is an audible-playback gesture; the player echo
    // carries muted=false and sanctions audio for the session.
    tab.context.handle_event(PageEvent::KeyDown {
        input: KeyInput::plain(Key::ArrowUp).with_ctrl(),
    });
    tab.context.handle_event(PageEvent::VideoVolumeChanged {
        video: first.surface(),
        volume: first.volume(),
        muted: false,
    });
    assert!(tab.context.engine().global_mute_unlocked());

    // The feed advances one reel.
    first.set_bounds(Some(Rect::new(0.0, -860.0, 400.0, 700.0)));
    second.set_bounds(Some(Rect::new(0.0, 40.0, 400.0, 700.0)));
    assert_eq!(
        tab.context.handle_command(Command::NextReel),
        CommandAck::Accepted
    );
    sleep(Duration::from_millis(1000)).await;

    assert!(!second.is_muted(), "the new active reel must come up audible");
    Ok(())
}
