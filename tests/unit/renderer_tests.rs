/*!
 * Renderer adapter tests: lazy creation, idempotence, stutter masking
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use substream::playback::{PlaybackSurface, StaticSurface};
use substream::renderer::{RendererAdapter, RendererFactory, RendererOptions};
use substream::subtitle_store::SubtitleStore;

use crate::common::mock_render::{RenderLog, recording_factory};

fn adapter_with_log() -> (RendererAdapter, Arc<RenderLog>) {
    let log = RenderLog::new();
    let surface = StaticSurface::new(640, 480, 24.0);
    let store = SubtitleStore::shared("default header\n\n".to_string());
    let adapter = RendererAdapter::new(
        recording_factory(log.clone()),
        surface,
        store,
        "fallback.woff2".to_string(),
    );
    (adapter, log)
}

/// ensure_created is idempotent: one backend per session
#[test]
fn test_ensure_created_withRepeatedCalls_shouldCreateOnce() {
    let (mut adapter, log) = adapter_with_log();
    assert!(adapter.ensure_created().unwrap());
    assert!(!adapter.ensure_created().unwrap());
    assert!(!adapter.ensure_created().unwrap());
    assert_eq!(log.created_count(), 1);
}

/// Creation composes the current track into the backend options
#[test]
fn test_ensure_created_shouldHandComposedContentToFactory() {
    let (mut adapter, log) = adapter_with_log();
    adapter.ensure_created().unwrap();
    assert_eq!(log.last_load().unwrap(), "default header\n\n");
}

/// Playback is paused across creation and resumed after, masking backend
/// initialization stutter
#[test]
fn test_ensure_created_withRunningPlayback_shouldPauseAcrossCreation() {
    let log = RenderLog::new();
    let surface = StaticSurface::new(640, 480, 24.0);
    let store = SubtitleStore::shared("h\n\n".to_string());

    let paused_during = Arc::new(AtomicBool::new(false));
    let seen = paused_during.clone();
    let observer = surface.clone();
    let inner = recording_factory(log.clone());
    let factory: RendererFactory = Box::new(move |options: &RendererOptions| {
        seen.store(observer.is_paused(), Ordering::SeqCst);
        inner(options)
    });
    let mut adapter = RendererAdapter::new(factory, surface.clone(), store, String::new());

    adapter.ensure_created().unwrap();
    assert!(paused_during.load(Ordering::SeqCst));
    assert!(!surface.is_paused());
}

/// A surface already paused by the user stays paused after creation
#[test]
fn test_ensure_created_withPausedPlayback_shouldNotResume() {
    let log = RenderLog::new();
    let surface = StaticSurface::new(640, 480, 24.0);
    surface.pause();
    let store = SubtitleStore::shared("h\n\n".to_string());
    let mut adapter = RendererAdapter::new(
        recording_factory(log.clone()),
        surface.clone(),
        store,
        String::new(),
    );
    adapter.ensure_created().unwrap();
    assert!(surface.is_paused());
}

/// destroy frees the backend and blocks re-creation until reset
#[test]
fn test_destroy_shouldFreeBackendAndRejectRecreation() {
    let (mut adapter, log) = adapter_with_log();
    adapter.ensure_created().unwrap();
    adapter.destroy();
    assert_eq!(log.freed_count(), 1);
    assert!(adapter.ensure_created().is_err());
    adapter.reset();
    assert!(adapter.ensure_created().unwrap());
    assert_eq!(log.created_count(), 2);
}
