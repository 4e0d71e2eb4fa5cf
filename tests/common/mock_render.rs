/*!
 * Recording renderer backend for tests.
 *
 * Implements the external rendering capability with a shared call log so
 * tests can assert creation counts, loaded track content and teardown.
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use substream::playback::Frame;
use substream::renderer::{RendererBackend, RendererFactory, RendererOptions};
use substream::subtitle_store::FontAttachment;

/// Shared record of everything the backend was asked to do
#[derive(Default)]
pub struct RenderLog {
    /// Number of backend instances created
    pub created: AtomicUsize,
    /// Number of backend instances freed
    pub freed: AtomicUsize,
    /// Number of fonts registered
    pub fonts: AtomicUsize,
    /// Every `set_track` payload, in call order (creation content included)
    pub track_loads: Mutex<Vec<String>>,
}

impl RenderLog {
    pub fn new() -> Arc<Self> {
        Arc::new(RenderLog::default())
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn freed_count(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.track_loads.lock().len()
    }

    pub fn last_load(&self) -> Option<String> {
        self.track_loads.lock().last().cloned()
    }
}

struct RecordingBackend {
    log: Arc<RenderLog>,
    overlay: Option<Frame>,
}

impl RendererBackend for RecordingBackend {
    fn set_track(&mut self, content: &str) {
        self.log.track_loads.lock().push(content.to_string());
    }

    fn add_font(&mut self, _font: &FontAttachment) {
        self.log.fonts.fetch_add(1, Ordering::SeqCst);
    }

    fn frame(&mut self, _time_ms: u64) -> Option<Frame> {
        self.overlay.clone()
    }

    fn free(&mut self) {
        self.log.freed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory producing recording backends without a visual overlay
pub fn recording_factory(log: Arc<RenderLog>) -> RendererFactory {
    factory_with_overlay(log, None)
}

/// Factory whose backends render a fixed overlay frame
pub fn factory_with_overlay(log: Arc<RenderLog>, overlay: Option<Frame>) -> RendererFactory {
    Box::new(move |options: &RendererOptions| {
        log.created.fetch_add(1, Ordering::SeqCst);
        log.track_loads.lock().push(options.content.clone());
        log.fonts.fetch_add(options.fonts.len(), Ordering::SeqCst);
        Ok(Box::new(RecordingBackend {
            log: log.clone(),
            overlay: overlay.clone(),
        }))
    })
}
