use log::{info, warn};
use std::sync::Arc;

use crate::acquisition::{AcquisitionHandle, ParseOrchestrator, Phase};
use crate::app_config::Config;
use crate::burn_in::BurnIn;
use crate::demux::Demuxer;
use crate::file_utils::FileManager;
use crate::playback::PlaybackSurface;
use crate::renderer::{RendererAdapter, RendererFactory, SharedRenderer};
use crate::subtitle_convert::{NormalizedFile, normalize_file};
use crate::subtitle_store::{Selection, SharedStore, SubtitleStore, TrackHeader, TrackKind};
use crate::track_selector::TrackSelector;
use crate::transport::MediaSource;

/// One playback session.
///
/// Owns the store, selector, renderer adapter and the acquisition task for
/// exactly one loaded file. Every structure is created on file load and
/// fully released on cleanup; nothing is reused across files.

/// An externally supplied subtitle file, already read into memory
#[derive(Debug, Clone)]
pub struct ExternalSubtitleFile {
    /// File name, used for dialect detection and label derivation
    pub name: String,
    /// Decoded file body
    pub content: String,
}

pub struct PlaybackSession {
    config: Arc<Config>,
    store: SharedStore,
    renderer: SharedRenderer,
    selector: TrackSelector,
    surface: Arc<dyn PlaybackSurface>,
    acquisition: Option<AcquisitionHandle>,
}

impl PlaybackSession {
    /// Create a session bound to a playback surface and renderer factory
    pub fn new(
        config: Config,
        surface: Arc<dyn PlaybackSurface>,
        renderer_factory: RendererFactory,
    ) -> Self {
        let config = Arc::new(config);
        let store = SubtitleStore::shared(config.default_header());
        let renderer = RendererAdapter::shared(
            renderer_factory,
            surface.clone(),
            store.clone(),
            config.fallback_font.clone(),
        );
        let selector = TrackSelector::new(store.clone(), renderer.clone(), config.debounce_ms);
        PlaybackSession {
            config,
            store,
            renderer,
            selector,
            surface,
            acquisition: None,
        }
    }

    /// Begin acquiring subtitles from a container byte source. Any state
    /// from a previously loaded file is released first.
    pub fn load_media(&mut self, source: Arc<dyn MediaSource>, demuxer: Arc<dyn Demuxer>) {
        self.cleanup();
        self.renderer.lock().reset();
        info!("Loading media, {} bytes", source.len());
        let orchestrator = ParseOrchestrator::new(
            self.config.clone(),
            self.store.clone(),
            self.selector.clone(),
            self.renderer.clone(),
            self.surface.clone(),
        );
        self.acquisition = Some(orchestrator.start(source, demuxer));
    }

    /// Attach external subtitle files found next to the video. The session
    /// becomes authoritative immediately: container acquisition, if any,
    /// stops writing. Tracks are numbered by file order.
    pub fn attach_external_files(&self, video_name: &str, files: Vec<ExternalSubtitleFile>) {
        if files.is_empty() {
            return;
        }
        {
            let mut store = self.store.write();
            store.mark_parsed();
            store.select(Selection::Track(0));
        }
        for (index, file) in files.into_iter().enumerate() {
            let number = index as u64;
            let kind = file
                .name
                .rsplit_once('.')
                .map(|(_, ext)| TrackKind::from_label(ext))
                .unwrap_or(TrackKind::Other(String::new()));
            let label = FileManager::derive_display_name(video_name, &file.name);
            {
                let mut store = self.store.write();
                store.register_track(TrackHeader {
                    number,
                    kind,
                    language: if label.is_empty() { None } else { Some(label) },
                    name: None,
                    header: self.config.default_header(),
                });
            }
            match normalize_file(&file.name, &file.content) {
                NormalizedFile::Header(header) => {
                    self.store.write().set_header(number, header);
                }
                NormalizedFile::Dialogue(lines) => {
                    let mut store = self.store.write();
                    for line in lines {
                        store.append_cue(number, line);
                    }
                }
            }
            if self.store.read().current() == Selection::Track(number) {
                self.selector.refresh();
            }
        }
        if let Err(err) = self.renderer.lock().ensure_created() {
            warn!("Renderer creation failed: {}", err);
        }
    }

    /// Request a track change from the UI layer (debounced)
    pub fn select_track(&self, selection: Selection) {
        self.selector.select(selection);
    }

    /// Current selection
    pub fn current(&self) -> Selection {
        self.selector.current()
    }

    /// Discovered tracks with their display labels, for a selection control
    pub fn track_list(&self) -> Vec<(TrackHeader, String)> {
        let store = self.store.read();
        store
            .track_list()
            .into_iter()
            .map(|track| {
                let label = store
                    .display_label(track.number)
                    .unwrap_or_else(|| track.number.to_string());
                (track, label)
            })
            .collect()
    }

    /// Whether acquisition reached its terminal authoritative state
    pub fn is_parsed(&self) -> bool {
        self.store.read().is_parsed()
    }

    /// Current acquisition phase, `Idle` when nothing is loaded
    pub fn phase(&self) -> Phase {
        self.acquisition
            .as_ref()
            .map_or(Phase::Idle, AcquisitionHandle::current_phase)
    }

    /// Start a burn-in compositor over this session's renderer
    pub fn burn_in(&self, no_subs: bool) -> BurnIn {
        BurnIn::start(self.surface.clone(), self.renderer.clone(), no_subs)
    }

    /// Shared store handle, mainly for tests and embedders
    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    /// Release everything this session holds: acquisition task, pending
    /// selector wake, renderer backend, headers, cues and fonts.
    pub fn cleanup(&mut self) {
        if let Some(handle) = self.acquisition.take() {
            handle.destroy();
        }
        self.selector.cancel_pending();
        self.renderer.lock().destroy();
        self.store.write().reset();
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}
