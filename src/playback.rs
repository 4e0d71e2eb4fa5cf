use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::watch;

/// Playback surface capability.
///
/// The video element itself is external; the pipeline consumes current
/// playback time, frame dimensions, pause/resume, the decoded frame, and a
/// per-frame callback primitive when the surface has one.

/// One raster frame, RGBA8 at `width` x `height`
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Bytes,
}

impl Frame {
    /// A solid-color frame, mostly useful for tests and simulations
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Frame {
            width,
            height,
            data: Bytes::from(data),
        }
    }
}

/// The playback surface the pipeline is attached to
pub trait PlaybackSurface: Send + Sync {
    /// Current playback position in milliseconds
    fn current_time_ms(&self) -> u64;

    /// Native frame dimensions
    fn dimensions(&self) -> (u32, u32);

    /// Detected frame rate
    fn frame_rate(&self) -> f64;

    /// Pause playback
    fn pause(&self);

    /// Resume playback
    fn resume(&self);

    /// Whether playback is currently paused
    fn is_paused(&self) -> bool;

    /// Current decoded video frame at native resolution
    fn current_frame(&self) -> Option<Frame>;

    /// Per-frame callback primitive: a signal ticking once per presented
    /// frame. None when the surface cannot provide one, in which case
    /// consumers fall back to a fixed-interval timer.
    fn frame_signal(&self) -> Option<watch::Receiver<u64>>;
}

/// A controllable surface for tests and headless runs: fixed dimensions, a
/// settable current frame, and an optional manual frame signal.
pub struct StaticSurface {
    width: u32,
    height: u32,
    fps: f64,
    time_ms: AtomicU64,
    paused: AtomicBool,
    frame: Mutex<Option<Frame>>,
    ticker: Option<watch::Sender<u64>>,
}

impl StaticSurface {
    /// Surface without a frame-callback primitive (timer fallback path)
    pub fn new(width: u32, height: u32, fps: f64) -> Arc<Self> {
        Arc::new(StaticSurface {
            width,
            height,
            fps,
            time_ms: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            frame: Mutex::new(Some(Frame::solid(width, height, [0, 0, 0, 255]))),
            ticker: None,
        })
    }

    /// Surface with a manual frame-callback primitive
    pub fn with_frame_signal(width: u32, height: u32, fps: f64) -> Arc<Self> {
        let (ticker, _) = watch::channel(0);
        Arc::new(StaticSurface {
            width,
            height,
            fps,
            time_ms: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            frame: Mutex::new(Some(Frame::solid(width, height, [0, 0, 0, 255]))),
            ticker: Some(ticker),
        })
    }

    /// Replace the decoded frame
    pub fn set_frame(&self, frame: Frame) {
        *self.frame.lock() = Some(frame);
    }

    /// Advance playback time
    pub fn set_time_ms(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Fire the frame-callback primitive once
    pub fn tick_frame(&self, sequence: u64) {
        if let Some(ticker) = &self.ticker {
            let _ = ticker.send(sequence);
        }
    }
}

impl PlaybackSurface for StaticSurface {
    fn current_time_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn current_frame(&self) -> Option<Frame> {
        self.frame.lock().clone()
    }

    fn frame_signal(&self) -> Option<watch::Receiver<u64>> {
        self.ticker.as_ref().map(|t| t.subscribe())
    }
}
