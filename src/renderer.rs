use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::errors::RenderError;
use crate::playback::{Frame, PlaybackSurface};
use crate::subtitle_store::{FontAttachment, SharedStore};

/// Renderer adapter.
///
/// Owns exactly one instance of an external rendering capability bound to
/// the video surface. Rendering does not start until there is something to
/// show: `ensure_created` is the explicit guard checked on every
/// cue-arrival event.

/// Shared handle to the adapter
pub type SharedRenderer = Arc<Mutex<RendererAdapter>>;

/// Options handed to the backend factory on creation
pub struct RendererOptions {
    /// Composed header (and cues) for the current track
    pub content: String,
    /// Embedded fonts extracted so far
    pub fonts: Vec<FontAttachment>,
    /// Font used when a track references one the container lacks
    pub fallback_font: String,
    /// Frame rate the backend should target
    pub target_fps: f64,
}

/// The external rendering capability
pub trait RendererBackend: Send {
    /// Replace the loaded track content
    fn set_track(&mut self, content: &str);

    /// Register an embedded font
    fn add_font(&mut self, font: &FontAttachment);

    /// Overlay raster for the given playback time
    fn frame(&mut self, time_ms: u64) -> Option<Frame>;

    /// Release backend resources
    fn free(&mut self);
}

/// Factory instantiating the backend against the live surface
pub type RendererFactory =
    Box<dyn Fn(&RendererOptions) -> Result<Box<dyn RendererBackend>, RenderError> + Send + Sync>;

/// Adapter owning at most one backend instance per session
pub struct RendererAdapter {
    factory: RendererFactory,
    backend: Option<Box<dyn RendererBackend>>,
    surface: Arc<dyn PlaybackSurface>,
    store: SharedStore,
    fallback_font: String,
    destroyed: bool,
}

impl RendererAdapter {
    /// Create an adapter; no backend exists until the first cue arrives
    pub fn new(
        factory: RendererFactory,
        surface: Arc<dyn PlaybackSurface>,
        store: SharedStore,
        fallback_font: String,
    ) -> Self {
        RendererAdapter {
            factory,
            backend: None,
            surface,
            store,
            fallback_font,
            destroyed: false,
        }
    }

    /// Shared handle around a fresh adapter
    pub fn shared(
        factory: RendererFactory,
        surface: Arc<dyn PlaybackSurface>,
        store: SharedStore,
        fallback_font: String,
    ) -> SharedRenderer {
        Arc::new(Mutex::new(RendererAdapter::new(
            factory,
            surface,
            store,
            fallback_font,
        )))
    }

    /// Lazily instantiate the backend. Idempotent; returns true only on the
    /// call that actually created it. Some backends stutter briefly on
    /// (re)initialization, so playback is paused across creation and resumed
    /// after when it was running.
    pub fn ensure_created(&mut self) -> Result<bool, RenderError> {
        if self.destroyed {
            return Err(RenderError::Destroyed);
        }
        if self.backend.is_some() {
            return Ok(false);
        }
        let (content, fonts) = {
            let store = self.store.read();
            (store.compose(store.current()), store.fonts().to_vec())
        };
        let options = RendererOptions {
            content,
            fonts,
            fallback_font: self.fallback_font.clone(),
            target_fps: self.surface.frame_rate(),
        };
        let mask_stutter = !self.surface.is_paused();
        if mask_stutter {
            self.surface.pause();
        }
        let backend = (self.factory)(&options)?;
        self.backend = Some(backend);
        if mask_stutter {
            self.surface.resume();
        }
        debug!("Subtitle renderer created");
        Ok(true)
    }

    /// Whether a backend instance currently exists
    pub fn is_created(&self) -> bool {
        self.backend.is_some()
    }

    /// Load composed track content into the backend, if one exists
    pub fn set_track(&mut self, content: &str) {
        if let Some(backend) = self.backend.as_mut() {
            backend.set_track(content);
        }
    }

    /// Forward a newly extracted font to the backend, if one exists
    pub fn add_font(&mut self, font: &FontAttachment) {
        if let Some(backend) = self.backend.as_mut() {
            backend.add_font(font);
        }
    }

    /// Current overlay raster, None when no backend exists yet
    pub fn overlay_frame(&mut self, time_ms: u64) -> Option<Frame> {
        self.backend.as_mut().and_then(|backend| backend.frame(time_ms))
    }

    /// Destroy the backend. Subsequent `ensure_created` calls fail.
    pub fn destroy(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.free();
        }
        if !self.destroyed {
            self.destroyed = true;
            debug!("Subtitle renderer destroyed");
        }
    }

    /// Allow a fresh backend after a session reset
    pub fn reset(&mut self) {
        if self.backend.is_some() {
            warn!("Resetting renderer adapter with a live backend");
            self.destroy();
        }
        self.destroyed = false;
    }
}

impl Drop for RendererAdapter {
    fn drop(&mut self) {
        self.destroy();
    }
}
