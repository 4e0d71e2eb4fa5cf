use log::{debug, info, warn};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::demux::{DemuxEvent, Demuxer, TrackDescriptor};
use crate::dialogue::format_timestamp_short;
use crate::playback::PlaybackSurface;
use crate::renderer::SharedRenderer;
use crate::subtitle_store::{FontAttachment, Selection, SharedStore, TrackHeader};
use crate::track_selector::TrackSelector;
use crate::transport::MediaSource;

/// Parse orchestrator.
///
/// Acquires track headers and cue lines from a container byte stream across
/// three temporal phases. At most one demux session writes into the store at
/// any moment: each phase destroys its session before the next one starts,
/// and destroying a session accepts no further events.

/// Attachment mimetypes stored as embedded fonts
const FONT_MIMETYPES: [&str; 3] = [
    "application/x-truetype-font",
    "application/font-woff",
    "application/vnd.ms-opentype",
];

/// Acquisition phase, observable through the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No stream attached yet
    Idle,
    /// Bounded prefix read answering "are there subtitle tracks at all"
    Probing,
    /// Live tee of the playback stream while the file downloads
    Streaming,
    /// Authoritative whole-file pass after transport completion
    FullReparse,
    /// Terminal: the container has no subtitle tracks
    NoSubtitles,
    /// Terminal: the store is authoritative
    Parsed,
}

/// Handle to a running acquisition
pub struct AcquisitionHandle {
    task: JoinHandle<()>,
    phase: watch::Receiver<Phase>,
}

impl AcquisitionHandle {
    /// Observe phase transitions
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Current phase snapshot
    pub fn current_phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Wait for acquisition to stop on its own
    pub async fn join(self) {
        let _ = self.task.await;
    }

    /// Abort the acquisition task (session teardown)
    pub fn destroy(self) {
        self.task.abort();
    }
}

/// Drives the three-phase protocol against one media source
pub struct ParseOrchestrator {
    config: Arc<Config>,
    store: SharedStore,
    selector: TrackSelector,
    renderer: SharedRenderer,
    surface: Arc<dyn PlaybackSurface>,
}

impl ParseOrchestrator {
    pub fn new(
        config: Arc<Config>,
        store: SharedStore,
        selector: TrackSelector,
        renderer: SharedRenderer,
        surface: Arc<dyn PlaybackSurface>,
    ) -> Self {
        ParseOrchestrator {
            config,
            store,
            selector,
            renderer,
            surface,
        }
    }

    /// Start acquisition as a background task
    pub fn start(
        self,
        source: Arc<dyn MediaSource>,
        demuxer: Arc<dyn Demuxer>,
    ) -> AcquisitionHandle {
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);
        let task = tokio::spawn(async move {
            self.run(source, demuxer, phase_tx).await;
        });
        AcquisitionHandle {
            task,
            phase: phase_rx,
        }
    }

    async fn run(
        self,
        source: Arc<dyn MediaSource>,
        demuxer: Arc<dyn Demuxer>,
        phase: watch::Sender<Phase>,
    ) {
        let started = Instant::now();
        info!("Subtitle acquisition started");

        if !self.probe(&source, &demuxer, &phase).await {
            return;
        }

        self.stream_tee(&source, &demuxer, &phase).await;
        self.full_reparse(&source, &demuxer, &phase).await;

        info!(
            "Subtitle acquisition finished in {}",
            format_timestamp_short(started.elapsed().as_millis() as u64)
        );
    }

    /// Quick advisory: demux a bounded prefix just to decide whether any
    /// subtitle content exists. The probe is released the moment either
    /// terminal condition is met; it is never the source of truth.
    async fn probe(
        &self,
        source: &Arc<dyn MediaSource>,
        demuxer: &Arc<dyn Demuxer>,
        phase: &watch::Sender<Phase>,
    ) -> bool {
        let _ = phase.send(Phase::Probing);
        let probe_end = source.len() / self.config.probe_divisor;
        let mut session = demuxer.spawn(source.read_range(0, probe_end));
        debug!("Probing first {} bytes for subtitle tracks", probe_end);

        let mut saw_tracks = false;
        loop {
            match session.next_event().await {
                Some(DemuxEvent::Tracks(descriptors)) if descriptors.is_empty() => {
                    session.destroy();
                    self.store.write().mark_parsed();
                    let _ = phase.send(Phase::NoSubtitles);
                    info!("No subtitle tracks in container");
                    return false;
                }
                Some(DemuxEvent::Tracks(descriptors)) => {
                    saw_tracks = true;
                    self.register_tracks(descriptors);
                }
                Some(DemuxEvent::Cue { track, cue }) => {
                    // subtitle presence confirmed, the live phases take over
                    self.store_cue(track, &cue);
                    session.destroy();
                    return true;
                }
                Some(DemuxEvent::Attachment(attachment)) => self.store_attachment(attachment),
                Some(DemuxEvent::Error(err)) => {
                    warn!("Probe failed on malformed container data: {}", err);
                    session.destroy();
                    return false;
                }
                Some(DemuxEvent::Finish) | None => {
                    session.destroy();
                    if saw_tracks {
                        // prefix held headers but no cue yet; still worth streaming
                        return true;
                    }
                    self.store.write().mark_parsed();
                    let _ = phase.send(Phase::NoSubtitles);
                    info!("Probe found no subtitle content");
                    return false;
                }
            }
        }
    }

    /// Decode subtitles live from the bytes flowing to playback, so captions
    /// appear before the download completes. Runs until the transport
    /// signals full availability, then hands over to the full re-parse.
    async fn stream_tee(
        &self,
        source: &Arc<dyn MediaSource>,
        demuxer: &Arc<dyn Demuxer>,
        phase: &watch::Sender<Phase>,
    ) {
        let mut completion = source.completion();
        if *completion.borrow() {
            return;
        }
        let _ = phase.send(Phase::Streaming);
        let mut session = demuxer.spawn(source.tee());
        debug!("Streaming tee attached");

        loop {
            tokio::select! {
                event = session.next_event() => {
                    match event {
                        Some(event) => {
                            if self.apply_event(event).is_break() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                changed = completion.changed() => {
                    if changed.is_err() || *completion.borrow() {
                        break;
                    }
                }
            }
        }
        // the streaming writer must be gone before the re-parse writes
        session.destroy();
        debug!("Streaming tee released");
    }

    /// Authoritative whole-file pass superseding any gaps the tee produced
    /// under out-of-order piece delivery.
    async fn full_reparse(
        &self,
        source: &Arc<dyn MediaSource>,
        demuxer: &Arc<dyn Demuxer>,
        phase: &watch::Sender<Phase>,
    ) {
        let mut completion = source.completion();
        while !*completion.borrow() {
            if completion.changed().await.is_err() {
                return;
            }
        }

        let _ = phase.send(Phase::FullReparse);
        let mut session = demuxer.spawn(source.read_range(0, source.len()));
        info!("Full subtitle re-parse started");

        loop {
            match session.next_event().await {
                Some(DemuxEvent::Tracks(descriptors)) if descriptors.is_empty() => break,
                Some(DemuxEvent::Finish) | None => break,
                Some(event) => {
                    if self.apply_event(event).is_break() {
                        session.destroy();
                        return;
                    }
                }
            }
        }
        session.destroy();

        self.store.write().mark_parsed();
        let _ = phase.send(Phase::Parsed);
        // final refresh so the renderer sees the authoritative cue set
        self.selector.refresh();
        if !self.surface.is_paused() {
            // mask the renderer rebuild stutter
            self.surface.pause();
            self.surface.resume();
        }
    }

    /// Dispatch one demux event into the store. Break halts the phase.
    fn apply_event(&self, event: DemuxEvent) -> ControlFlow<()> {
        match event {
            DemuxEvent::Tracks(descriptors) => {
                if descriptors.is_empty() {
                    self.store.write().mark_parsed();
                    return ControlFlow::Break(());
                }
                self.register_tracks(descriptors);
            }
            DemuxEvent::Cue { track, cue } => self.store_cue(track, &cue),
            DemuxEvent::Attachment(attachment) => {
                // attachments sit at the head of the container; the probe
                // already collected them, re-collecting would duplicate
                debug!("Ignoring attachment {} outside probe", attachment.mimetype);
            }
            DemuxEvent::Finish => return ControlFlow::Break(()),
            DemuxEvent::Error(err) => {
                // malformed data never interrupts playback; stop this phase
                warn!("Demuxer halted: {}", err);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn register_tracks(&self, descriptors: Vec<TrackDescriptor>) {
        let mut store = self.store.write();
        for descriptor in descriptors {
            let header = TrackHeader {
                number: descriptor.number,
                kind: descriptor.kind,
                language: descriptor.language,
                name: descriptor.name,
                header: descriptor.header,
            };
            store.register_track(header);
        }
    }

    /// Store one cue and keep the visible side of the pipeline in sync:
    /// the renderer is lazily created on the first cue, and a cue landing
    /// on the current track refreshes the selector.
    fn store_cue(&self, track: u64, cue: &crate::dialogue::CueEvent) {
        if self.store.read().is_parsed() {
            // an authoritative cue set already exists (e.g. external files)
            return;
        }
        if let Err(err) = self.renderer.lock().ensure_created() {
            warn!("Renderer creation failed: {}", err);
        }
        let (inserted, is_current) = {
            let mut store = self.store.write();
            let native = store
                .header(track)
                .map(|header| header.kind.is_native())
                .unwrap_or(false);
            let inserted = store.append_cue(track, cue.to_dialogue_line(native));
            (inserted, store.current() == Selection::Track(track))
        };
        if inserted && is_current {
            self.selector.refresh();
        }
    }

    fn store_attachment(&self, attachment: FontAttachment) {
        if !FONT_MIMETYPES.contains(&attachment.mimetype.as_str()) {
            debug!("Skipping non-font attachment {}", attachment.mimetype);
            return;
        }
        self.renderer.lock().add_font(&attachment);
        self.store.write().add_font(attachment);
    }
}
