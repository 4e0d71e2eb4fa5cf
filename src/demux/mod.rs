/*!
 * Container demuxer capability interface.
 *
 * Byte-level container parsing is an external concern. The pipeline only
 * consumes typed events: a one-time track discovery, repeated cue events,
 * embedded attachments, and a completion marker. Events travel over an
 * explicit channel so the orchestrator's phase transitions stay observable
 * and testable.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use crate::dialogue::CueEvent;
use crate::errors::DemuxError;
use crate::subtitle_store::{FontAttachment, TrackKind};
use crate::transport::ByteStream;

pub mod mock;

/// One track from the discovery event
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    /// Stable track id within the container
    pub number: u64,
    /// Codec/dialect label
    pub kind: TrackKind,
    /// Declared language, if any
    pub language: Option<String>,
    /// Declared human label, if any
    pub name: Option<String>,
    /// Style/script preamble text, usable as-is for native tracks
    pub header: String,
}

/// Typed events a demux session emits while consuming its byte stream
#[derive(Debug, Clone)]
pub enum DemuxEvent {
    /// One-time discovery of zero or more subtitle tracks
    Tracks(Vec<TrackDescriptor>),
    /// One decoded subtitle cue
    Cue { track: u64, cue: CueEvent },
    /// An embedded attachment (fonts among other payloads)
    Attachment(FontAttachment),
    /// The entire input was consumed
    Finish,
    /// Parsing cannot continue
    Error(Arc<DemuxError>),
}

/// A demuxer capability: spawns parsing sessions over byte streams
pub trait Demuxer: Send + Sync + Debug {
    /// Start a session consuming `input` and emitting events as bytes allow
    fn spawn(&self, input: ByteStream) -> DemuxSession;
}

/// Handle to one running demux session.
///
/// `destroy` is synchronous from the caller's perspective: after it returns
/// no further events can be observed, which is what lets the orchestrator
/// uphold its single-writer rule across phase handoffs.
pub struct DemuxSession {
    events: mpsc::Receiver<DemuxEvent>,
    cancelled: Arc<AtomicBool>,
}

impl DemuxSession {
    /// Wrap a session around its event feed and cancel flag
    pub fn new(events: mpsc::Receiver<DemuxEvent>, cancelled: Arc<AtomicBool>) -> Self {
        DemuxSession { events, cancelled }
    }

    /// Next event, or None once the session ends
    pub async fn next_event(&mut self) -> Option<DemuxEvent> {
        self.events.recv().await
    }

    /// Stop the session. No events are accepted after this returns.
    pub fn destroy(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.events.close();
    }
}

impl Drop for DemuxSession {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
