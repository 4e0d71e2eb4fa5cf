/*!
 * End-to-end tests for the three-phase acquisition protocol: quick probe,
 * live streaming tee, authoritative full re-parse.
 */

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use substream::acquisition::{ParseOrchestrator, Phase};
use substream::app_config::Config;
use substream::demux::mock::{MockDemuxer, ScriptedEvent, native_track, scripted_cue};
use substream::demux::DemuxEvent;
use substream::playback::StaticSurface;
use substream::renderer::RendererAdapter;
use substream::subtitle_store::{FontAttachment, Selection, SharedStore, SubtitleStore};
use substream::track_selector::TrackSelector;
use substream::transport::MemorySource;

use crate::common::mock_render::{RenderLog, recording_factory};

struct Pipeline {
    store: SharedStore,
    log: Arc<RenderLog>,
    orchestrator: ParseOrchestrator,
    surface: Arc<StaticSurface>,
}

fn pipeline() -> Pipeline {
    let config = Arc::new(Config::default());
    let store = SubtitleStore::shared(config.default_header());
    let surface = StaticSurface::new(640, 480, 24.0);
    let log = RenderLog::new();
    let renderer = RendererAdapter::shared(
        recording_factory(log.clone()),
        surface.clone(),
        store.clone(),
        config.fallback_font.clone(),
    );
    let selector = TrackSelector::new(store.clone(), renderer.clone(), 10);
    let orchestrator = ParseOrchestrator::new(
        config,
        store.clone(),
        selector,
        renderer,
        surface.clone(),
    );
    Pipeline {
        store,
        log,
        orchestrator,
        surface,
    }
}

async fn wait_for_phase(rx: &mut tokio::sync::watch::Receiver<Phase>, phase: Phase) {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| *p == phase))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", phase))
        .unwrap();
}

/// The full protocol: probe confirms presence, the tee extracts cues while
/// the file downloads, the re-parse supersedes tee gaps, and overlapping
/// windows never duplicate a cue.
#[tokio::test]
async fn test_pipeline_withChunkedDelivery_shouldRunAllThreePhases() {
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 100,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        scripted_cue(200, 1, 0, "first"),
        scripted_cue(400, 1, 2000, "second"),
        // past every live window: only the full re-parse can see this one
        scripted_cue(950, 1, 9000, "late"),
    ]));
    let source = MemorySource::new(1000);
    let p = pipeline();
    let handle = p
        .orchestrator
        .start(Arc::new(source.clone()), demuxer.clone());
    let mut phase = handle.phase();

    wait_for_phase(&mut phase, Phase::Probing).await;
    // deliver the probe window (first half of the file)
    source.push(Bytes::from(vec![0u8; 500]));
    wait_for_phase(&mut phase, Phase::Streaming).await;

    // the tee only sees bytes delivered after it attached
    source.push(Bytes::from(vec![0u8; 400]));
    source.push(Bytes::from(vec![0u8; 100]));
    source.finish();

    wait_for_phase(&mut phase, Phase::Parsed).await;
    handle.join().await;

    let store = p.store.read();
    assert!(store.is_parsed());
    assert!(store.has_track(1));
    // three distinct cues, each possibly observed by several phases
    assert_eq!(store.cue_count(1), 3);
    // probe, streaming tee, full re-parse
    assert_eq!(demuxer.session_count(), 3);
    // the renderer was lazily created exactly once, on the first cue
    assert_eq!(p.log.created_count(), 1);
}

/// A zero-track probe short-circuits: no streaming, no re-parse
#[tokio::test]
async fn test_pipeline_withZeroTracks_shouldStopAfterProbe() {
    let demuxer = Arc::new(MockDemuxer::empty());
    let source = MemorySource::complete_from(vec![0u8; 100]);
    let p = pipeline();
    let handle = p.orchestrator.start(Arc::new(source), demuxer.clone());
    let mut phase = handle.phase();

    wait_for_phase(&mut phase, Phase::NoSubtitles).await;
    handle.join().await;

    assert!(p.store.read().is_parsed());
    assert!(p.store.read().track_list().is_empty());
    assert_eq!(demuxer.session_count(), 1);
    assert_eq!(p.log.created_count(), 0);
}

/// A fully downloaded source skips the streaming phase entirely
#[tokio::test]
async fn test_pipeline_withCompleteSource_shouldSkipStreaming() {
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        scripted_cue(20, 1, 0, "only"),
    ]));
    let source = MemorySource::complete_from(vec![0u8; 200]);
    let p = pipeline();
    let handle = p.orchestrator.start(Arc::new(source), demuxer.clone());
    let mut phase = handle.phase();

    wait_for_phase(&mut phase, Phase::Parsed).await;
    handle.join().await;

    // probe and re-parse only
    assert_eq!(demuxer.session_count(), 2);
    assert_eq!(p.store.read().cue_count(1), 1);
}

/// Streaming always ends before the re-parse begins: the phase sequence
/// never shows FullReparse while Streaming is still the observed state
#[tokio::test]
async fn test_pipeline_phaseOrder_shouldDestroyTeeBeforeReparse() {
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        scripted_cue(20, 1, 0, "a"),
    ]));
    let source = MemorySource::new(100);
    let p = pipeline();
    let handle = p
        .orchestrator
        .start(Arc::new(source.clone()), demuxer.clone());
    let mut phase = handle.phase();

    source.push(Bytes::from(vec![0u8; 50]));
    wait_for_phase(&mut phase, Phase::Streaming).await;
    source.push(Bytes::from(vec![0u8; 50]));
    source.finish();
    wait_for_phase(&mut phase, Phase::Parsed).await;
    handle.join().await;

    // every phase ran exactly one session; the tee was released on the
    // completion signal before the re-parse session spawned
    assert_eq!(demuxer.session_count(), 3);
}

/// Malformed container data halts acquisition silently without touching
/// already stored state
#[tokio::test]
async fn test_pipeline_withMalformedContainer_shouldHaltSilently() {
    let demuxer = Arc::new(MockDemuxer::malformed_after(10));
    let source = MemorySource::complete_from(vec![0u8; 100]);
    let p = pipeline();
    let handle = p.orchestrator.start(Arc::new(source), demuxer.clone());

    handle.join().await;
    assert!(!p.store.read().is_parsed());
    assert_eq!(p.log.created_count(), 0);
}

/// Embedded font attachments are collected, non-font attachments skipped
#[tokio::test]
async fn test_pipeline_withAttachments_shouldKeepOnlyFonts() {
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 5,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Attachment(FontAttachment {
                mimetype: "application/x-truetype-font".to_string(),
                data: Bytes::from_static(b"font bytes"),
            }),
        },
        ScriptedEvent {
            offset: 15,
            event: DemuxEvent::Attachment(FontAttachment {
                mimetype: "image/png".to_string(),
                data: Bytes::from_static(b"cover art"),
            }),
        },
        scripted_cue(20, 1, 0, "a"),
    ]));
    let source = MemorySource::complete_from(vec![0u8; 100]);
    let p = pipeline();
    let handle = p.orchestrator.start(Arc::new(source), demuxer.clone());
    let mut phase = handle.phase();

    wait_for_phase(&mut phase, Phase::Parsed).await;
    handle.join().await;

    let store = p.store.read();
    assert_eq!(store.fonts().len(), 1);
    assert_eq!(store.fonts()[0].mimetype, "application/x-truetype-font");
}

/// The first discovered track is auto-selected and cue arrivals on it
/// refresh the renderer through the debounced selector
#[tokio::test]
async fn test_pipeline_withCurrentTrackCues_shouldRefreshRenderer() {
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(7, "eng")]),
        },
        scripted_cue(20, 7, 0, "visible"),
    ]));
    let source = MemorySource::complete_from(vec![0u8; 100]);
    let p = pipeline();
    let handle = p.orchestrator.start(Arc::new(source), demuxer.clone());
    let mut phase = handle.phase();
    wait_for_phase(&mut phase, Phase::Parsed).await;
    handle.join().await;

    assert_eq!(p.store.read().current(), Selection::Track(7));
    // give the 10ms debounce a chance to fire
    tokio::time::sleep(Duration::from_millis(50)).await;
    let last = p.log.last_load().unwrap();
    assert!(last.contains("visible"));
    drop(p.surface);
}
