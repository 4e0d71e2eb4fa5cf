/*!
 * Session lifecycle tests: reset on new file load, full release on cleanup
 */

use std::sync::Arc;
use std::time::Duration;

use substream::acquisition::Phase;
use substream::app_config::Config;
use substream::demux::DemuxEvent;
use substream::demux::mock::{MockDemuxer, ScriptedEvent, native_track, scripted_cue};
use substream::playback::StaticSurface;
use substream::session::{ExternalSubtitleFile, PlaybackSession};
use substream::subtitle_store::Selection;
use substream::transport::MemorySource;

use crate::common::SAMPLE_SRT;
use crate::common::mock_render::{RenderLog, recording_factory};

fn session() -> (PlaybackSession, Arc<RenderLog>) {
    let log = RenderLog::new();
    let surface = StaticSurface::new(640, 480, 24.0);
    let mut config = Config::default();
    config.debounce_ms = 10;
    let session = PlaybackSession::new(config, surface, recording_factory(log.clone()));
    (session, log)
}

fn scripted_demuxer() -> Arc<MockDemuxer> {
    Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        scripted_cue(20, 1, 0, "hello"),
    ]))
}

async fn wait_parsed(session: &PlaybackSession) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if session.is_parsed() && session.phase() == Phase::Parsed {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("acquisition did not finish");
}

/// Loading media populates the session through the acquisition pipeline
#[tokio::test]
async fn test_load_media_shouldPopulateStore() {
    let (mut session, log) = session();
    let source = MemorySource::complete_from(vec![0u8; 100]);
    session.load_media(Arc::new(source), scripted_demuxer());
    wait_parsed(&session).await;

    assert_eq!(session.track_list().len(), 1);
    assert_eq!(session.current(), Selection::Track(1));
    assert_eq!(session.store().read().cue_count(1), 1);
    assert_eq!(log.created_count(), 1);
}

/// Cleanup releases every structure: headers, cues, fonts, selection,
/// renderer backend and the acquisition task
#[tokio::test]
async fn test_cleanup_shouldReleaseEverything() {
    let (mut session, log) = session();
    let source = MemorySource::complete_from(vec![0u8; 100]);
    session.load_media(Arc::new(source), scripted_demuxer());
    wait_parsed(&session).await;

    session.cleanup();
    let store = session.store();
    let store = store.read();
    assert!(store.track_list().is_empty());
    assert!(store.fonts().is_empty());
    assert!(!store.is_parsed());
    assert_eq!(store.current(), Selection::Off);
    assert_eq!(log.freed_count(), 1);
}

/// A second load starts from a clean slate and a fresh renderer
#[tokio::test]
async fn test_load_media_twice_shouldResetBetweenFiles() {
    let (mut session, log) = session();
    session.load_media(
        Arc::new(MemorySource::complete_from(vec![0u8; 100])),
        scripted_demuxer(),
    );
    wait_parsed(&session).await;

    let second = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(5, "jpn")]),
        },
        scripted_cue(20, 5, 0, "second file"),
    ]));
    session.load_media(Arc::new(MemorySource::complete_from(vec![0u8; 100])), second);
    wait_parsed(&session).await;

    let tracks = session.track_list();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].0.number, 5);
    assert_eq!(session.current(), Selection::Track(5));
    // one backend per file: the first was freed, a second was created
    assert_eq!(log.freed_count(), 1);
    assert_eq!(log.created_count(), 2);
}

/// External files attached to a session being acquired take authority:
/// later container cues no longer land
#[tokio::test]
async fn test_attach_external_whileAcquiring_shouldTakeAuthority() {
    let (mut session, _log) = session();
    let source = MemorySource::new(1000);
    let demuxer = Arc::new(MockDemuxer::new(vec![
        ScriptedEvent {
            offset: 10,
            event: DemuxEvent::Tracks(vec![native_track(1, "eng")]),
        },
        scripted_cue(600, 1, 0, "container cue"),
    ]));
    session.load_media(Arc::new(source.clone()), demuxer);

    session.attach_external_files(
        "movie.mkv",
        vec![ExternalSubtitleFile {
            name: "movie.srt".to_string(),
            content: SAMPLE_SRT.to_string(),
        }],
    );
    assert!(session.is_parsed());

    // deliver the container anyway; its cue must not land
    source.push(bytes::Bytes::from(vec![0u8; 1000]));
    source.finish();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.store().read().cue_count(1), 0);
    assert_eq!(session.store().read().cue_count(0), 3);
}
