use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::playback::{Frame, PlaybackSurface};
use crate::renderer::SharedRenderer;

/// Burn-in compositor.
///
/// Produces a capturable stream whose pixels already contain the rendered
/// subtitle overlay, for consumers (remote casting, picture-in-picture
/// fallbacks) that cannot display the overlay themselves. The loop rides the
/// surface's frame-callback primitive when it has one and otherwise falls
/// back to a fixed-interval timer at half the detected frame period.

/// Handle to a running compositor
pub struct BurnIn {
    frames: watch::Receiver<Option<Frame>>,
    task: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl BurnIn {
    /// Start compositing. With `no_subs` the overlay draw is skipped and the
    /// stream carries bare video frames.
    pub fn start(
        surface: Arc<dyn PlaybackSurface>,
        renderer: SharedRenderer,
        no_subs: bool,
    ) -> BurnIn {
        let (tx, rx) = watch::channel(None);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let task = tokio::spawn(async move {
            let (width, height) = surface.dimensions();
            let mut canvas = vec![0u8; (width as usize) * (height as usize) * 4];
            match surface.frame_signal() {
                Some(mut signal) => {
                    debug!("Burn-in loop riding frame callbacks");
                    while signal.changed().await.is_ok() {
                        if flag.load(Ordering::SeqCst) {
                            return;
                        }
                        composite(&surface, &renderer, no_subs, &mut canvas, width, height, &tx);
                    }
                }
                None => {
                    let period = Duration::from_secs_f64(0.5 / surface.frame_rate().max(1.0));
                    debug!("Burn-in loop on {:?} interval fallback", period);
                    let mut interval = tokio::time::interval(period);
                    loop {
                        interval.tick().await;
                        if flag.load(Ordering::SeqCst) {
                            return;
                        }
                        composite(&surface, &renderer, no_subs, &mut canvas, width, height, &tx);
                    }
                }
            }
        });
        BurnIn {
            frames: rx,
            task,
            cancelled,
        }
    }

    /// The capturable stream: latest composited frame per tick
    pub fn frames(&self) -> watch::Receiver<Option<Frame>> {
        self.frames.clone()
    }

    /// Cancel the loop and release the off-screen surface. No draw happens
    /// after this returns.
    pub fn destroy(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// One tick: draw the current video frame, then the overlay on top
#[allow(clippy::too_many_arguments)]
fn composite(
    surface: &Arc<dyn PlaybackSurface>,
    renderer: &SharedRenderer,
    no_subs: bool,
    canvas: &mut [u8],
    width: u32,
    height: u32,
    tx: &watch::Sender<Option<Frame>>,
) {
    if let Some(frame) = surface.current_frame() {
        draw_frame(canvas, width, height, &frame);
    }
    if !no_subs {
        // tolerate the renderer not existing yet: frame only
        let overlay = renderer.lock().overlay_frame(surface.current_time_ms());
        if let Some(overlay) = overlay {
            blend_overlay(canvas, width, height, &overlay);
        }
    }
    let _ = tx.send(Some(Frame {
        width,
        height,
        data: bytes::Bytes::copy_from_slice(canvas),
    }));
}

/// Copy a frame onto the canvas, nearest-neighbor scaled when sizes differ
fn draw_frame(canvas: &mut [u8], width: u32, height: u32, frame: &Frame) {
    if frame.width == width && frame.height == height {
        let len = canvas.len().min(frame.data.len());
        canvas[..len].copy_from_slice(&frame.data[..len]);
        return;
    }
    for y in 0..height {
        let src_y = (y as u64 * frame.height as u64 / height as u64) as u32;
        for x in 0..width {
            let src_x = (x as u64 * frame.width as u64 / width as u64) as u32;
            let src = ((src_y * frame.width + src_x) * 4) as usize;
            let dst = ((y * width + x) * 4) as usize;
            if src + 4 <= frame.data.len() && dst + 4 <= canvas.len() {
                canvas[dst..dst + 4].copy_from_slice(&frame.data[src..src + 4]);
            }
        }
    }
}

/// Alpha-blend an overlay onto the canvas at canvas resolution
fn blend_overlay(canvas: &mut [u8], width: u32, height: u32, overlay: &Frame) {
    for y in 0..height {
        let src_y = (y as u64 * overlay.height as u64 / height as u64) as u32;
        for x in 0..width {
            let src_x = (x as u64 * overlay.width as u64 / width as u64) as u32;
            let src = ((src_y * overlay.width + src_x) * 4) as usize;
            let dst = ((y * width + x) * 4) as usize;
            if src + 4 > overlay.data.len() || dst + 4 > canvas.len() {
                continue;
            }
            let alpha = overlay.data[src + 3] as u32;
            if alpha == 0 {
                continue;
            }
            let inv = 255 - alpha;
            for channel in 0..3 {
                let over = overlay.data[src + channel] as u32;
                let under = canvas[dst + channel] as u32;
                canvas[dst + channel] = ((over * alpha + under * inv) / 255) as u8;
            }
            canvas[dst + 3] = 255;
        }
    }
}
