use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::renderer::SharedRenderer;
use crate::subtitle_store::{Selection, SharedStore};

/// Debounced track selection.
///
/// A selection change does not rebuild the rendering surface immediately:
/// a pending-request slot holds only the latest request and a single wake
/// is scheduled. Rapid changes inside the window collapse into one rebuild
/// for the most recent request.
#[derive(Clone)]
pub struct TrackSelector {
    store: SharedStore,
    renderer: SharedRenderer,
    pending: Arc<Mutex<Option<Selection>>>,
    debounce: Duration,
}

impl TrackSelector {
    /// Create a selector over the session's store and renderer
    pub fn new(store: SharedStore, renderer: SharedRenderer, debounce_ms: u64) -> Self {
        TrackSelector {
            store,
            renderer,
            pending: Arc::new(Mutex::new(None)),
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    /// Request a selection change. The store's `current` updates at once so
    /// incoming cues land on the right track; the renderer rebuild waits out
    /// the debounce window and honors only the latest request.
    pub fn select(&self, selection: Selection) {
        self.store.write().select(selection);
        self.schedule(selection);
    }

    /// Re-apply the current selection, refreshing the renderer with newly
    /// accumulated cues. Shares the debounce window with `select`, which
    /// caps rebuild frequency while cues stream in.
    pub fn refresh(&self) {
        let current = self.store.read().current();
        self.schedule(current);
    }

    /// Current selection as seen by the UI layer
    pub fn current(&self) -> Selection {
        self.store.read().current()
    }

    /// Drop any pending rebuild (session teardown)
    pub fn cancel_pending(&self) {
        self.pending.lock().take();
    }

    fn schedule(&self, selection: Selection) {
        let mut pending = self.pending.lock();
        let already_scheduled = pending.is_some();
        *pending = Some(selection);
        drop(pending);
        if already_scheduled {
            // the scheduled wake will pick up the newer request
            return;
        }
        let store = self.store.clone();
        let renderer = self.renderer.clone();
        let pending = self.pending.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(selection) = pending.lock().take() else {
                return;
            };
            debug!("Applying track selection {:?}", selection);
            let content = store.read().compose(selection);
            let mut renderer = renderer.lock();
            if renderer.is_created() {
                renderer.set_track(&content);
            }
        });
    }
}
