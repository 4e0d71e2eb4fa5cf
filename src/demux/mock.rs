/*!
 * Scripted mock demuxer for testing.
 *
 * A `MockDemuxer` replays a fixed event script against the bytes a session
 * actually receives: each event is tagged with the byte offset at which the
 * demuxer would have decoded it, so a bounded probe read only surfaces the
 * early part of the script while a whole-file pass surfaces everything.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::dialogue::CueEvent;
use crate::errors::DemuxError;
use crate::subtitle_store::TrackKind;
use crate::transport::ByteStream;

use super::{DemuxEvent, DemuxSession, Demuxer, TrackDescriptor};

/// An event paired with the byte offset that reveals it
#[derive(Debug, Clone)]
pub struct ScriptedEvent {
    /// Number of input bytes that must be consumed before this event fires
    pub offset: u64,
    /// The event to emit
    pub event: DemuxEvent,
}

/// Demuxer replaying a scripted event timeline
#[derive(Debug, Clone)]
pub struct MockDemuxer {
    script: Vec<ScriptedEvent>,
    /// Emit `Finish` when the input stream ends
    finish_on_end: bool,
    sessions: Arc<AtomicUsize>,
}

impl MockDemuxer {
    /// Create a mock from a scripted timeline
    pub fn new(script: Vec<ScriptedEvent>) -> Self {
        MockDemuxer {
            script,
            finish_on_end: true,
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A demuxer whose discovery reports no subtitle tracks at all
    pub fn empty() -> Self {
        MockDemuxer::new(vec![ScriptedEvent {
            offset: 0,
            event: DemuxEvent::Tracks(Vec::new()),
        }])
    }

    /// A demuxer that fails with malformed data after `offset` bytes
    pub fn malformed_after(offset: u64) -> Self {
        MockDemuxer::new(vec![ScriptedEvent {
            offset,
            event: DemuxEvent::Error(Arc::new(DemuxError::Malformed(
                "unexpected element id".to_string(),
            ))),
        }])
    }

    /// Do not emit `Finish` at end of input (models a tee that just stops)
    pub fn without_finish(mut self) -> Self {
        self.finish_on_end = false;
        self
    }

    /// Number of sessions spawned so far
    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

impl Demuxer for MockDemuxer {
    fn spawn(&self, mut input: ByteStream) -> DemuxSession {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let script = self.script.clone();
        let finish_on_end = self.finish_on_end;
        tokio::spawn(async move {
            let mut consumed = 0u64;
            let mut cursor = 0usize;
            while let Some(chunk) = input.recv().await {
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                consumed += chunk.len() as u64;
                while cursor < script.len() && script[cursor].offset <= consumed {
                    let event = script[cursor].event.clone();
                    cursor += 1;
                    if flag.load(Ordering::SeqCst) || tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            // input exhausted: events beyond the delivered bytes never fire
            if finish_on_end && !flag.load(Ordering::SeqCst) {
                let _ = tx.send(DemuxEvent::Finish).await;
            }
        });
        DemuxSession::new(rx, cancelled)
    }
}

/// Convenience: a plain native track descriptor
pub fn native_track(number: u64, language: &str) -> TrackDescriptor {
    TrackDescriptor {
        number,
        kind: TrackKind::Ass,
        language: Some(language.to_string()),
        name: None,
        header: "[V4+ Styles]\nStyle: Default,Native\n[Events]\n\n".to_string(),
    }
}

/// Convenience: a scripted cue event
pub fn scripted_cue(offset: u64, track: u64, time_ms: u64, text: &str) -> ScriptedEvent {
    ScriptedEvent {
        offset,
        event: DemuxEvent::Cue {
            track,
            cue: CueEvent::timed(time_ms, 2000, text),
        },
    }
}
