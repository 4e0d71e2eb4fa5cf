/*!
 * External subtitle file workflow: discovery naming, normalization, and
 * attachment into the same structure container tracks use.
 */

use std::sync::Arc;
use std::time::Duration;

use substream::app_config::Config;
use substream::playback::StaticSurface;
use substream::session::{ExternalSubtitleFile, PlaybackSession};
use substream::subtitle_store::{Selection, TrackKind};

use crate::common::mock_render::{RenderLog, recording_factory};
use crate::common::{SAMPLE_ASS, SAMPLE_SRT};

fn session() -> (PlaybackSession, Arc<RenderLog>) {
    let log = RenderLog::new();
    let surface = StaticSurface::new(640, 480, 24.0);
    let mut config = Config::default();
    config.debounce_ms = 10;
    let session = PlaybackSession::new(config, surface, recording_factory(log.clone()));
    (session, log)
}

/// Converted files join the store exactly like container tracks: numbered
/// by file order, first one selected, session authoritative at once
#[tokio::test]
async fn test_attach_withSrtFile_shouldConvertAndSelect() {
    let (session, log) = session();
    session.attach_external_files(
        "Show.S01E01.mkv",
        vec![ExternalSubtitleFile {
            name: "Show.S01E01.English.srt".to_string(),
            content: SAMPLE_SRT.to_string(),
        }],
    );

    assert!(session.is_parsed());
    assert_eq!(session.current(), Selection::Track(0));
    let tracks = session.track_list();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].0.kind, TrackKind::Srt);
    assert_eq!(tracks[0].1, "English");
    assert_eq!(session.store().read().cue_count(0), 3);

    // renderer created eagerly for external files; debounced refresh loads
    // the converted content
    assert_eq!(log.created_count(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let last = log.last_load().unwrap();
    assert!(last.contains("Dialogue: 0,0:00:01.00,0:00:04.00,Default,,0,0,0,,This is a test subtitle."));
    assert!(last.contains("{\\i1}multiple{\\i0}"));
}

/// Native files pass through whole as the track header
#[tokio::test]
async fn test_attach_withNativeFile_shouldUseFileAsHeader() {
    let (session, _log) = session();
    session.attach_external_files(
        "movie.mkv",
        vec![ExternalSubtitleFile {
            name: "movie.ssa".to_string(),
            content: SAMPLE_ASS.to_string(),
        }],
    );
    let store = session.store();
    let store = store.read();
    assert_eq!(store.header(0).unwrap().header, SAMPLE_ASS);
    assert_eq!(store.cue_count(0), 0);
}

/// Several files become several tracks, numbered by order
#[tokio::test]
async fn test_attach_withMultipleFiles_shouldNumberByOrder() {
    let (session, _log) = session();
    session.attach_external_files(
        "movie.mkv",
        vec![
            ExternalSubtitleFile {
                name: "movie.English.srt".to_string(),
                content: SAMPLE_SRT.to_string(),
            },
            ExternalSubtitleFile {
                name: "movie.German.srt".to_string(),
                content: SAMPLE_SRT.to_string(),
            },
        ],
    );
    let tracks = session.track_list();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].0.number, 0);
    assert_eq!(tracks[1].0.number, 1);
    assert_eq!(tracks[0].1, "English");
    assert_eq!(tracks[1].1, "German");
    assert_eq!(session.current(), Selection::Track(0));
}

/// The documented conversion example from end to end
#[tokio::test]
async fn test_attach_withBoldMarkup_shouldEmitOverridePair() {
    let (session, _log) = session();
    session.attach_external_files(
        "clip.mkv",
        vec![ExternalSubtitleFile {
            name: "clip.srt".to_string(),
            content: "1\n00:00:01,000 --> 00:00:03,500\nHello <b>world</b>".to_string(),
        }],
    );
    let store = session.store();
    let composed = store.read().compose(Selection::Track(0));
    assert!(composed.contains("Dialogue: 0,0:00:01.00,0:00:03.50,Default,,0,0,0,,Hello {\\b1}world{\\b0}"));
}
