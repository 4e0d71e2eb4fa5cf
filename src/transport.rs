use bytes::Bytes;
use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};

/// Byte-source capability interface.
///
/// The transport delivers a file incrementally and without ordering
/// guarantees. This module only models the byte-readable view the pipeline
/// consumes: partial-range reads, a live tee of bytes flowing to playback,
/// and a completion signal. Piece selection and swarm logic live elsewhere.

/// Chunked byte stream handed to a demux session
pub type ByteStream = mpsc::Receiver<Bytes>;

/// Chunk size for file-backed range reads
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// A byte-readable view of one media file
pub trait MediaSource: Send + Sync {
    /// Total file length in bytes
    fn len(&self) -> u64;

    /// True for a zero-length file
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signal that flips to true when the file is fully downloaded
    fn completion(&self) -> watch::Receiver<bool>;

    /// Stream the byte range `[start, end)` as it becomes available
    fn read_range(&self, start: u64, end: u64) -> ByteStream;

    /// Splice a duplicate reader onto bytes already flowing to playback.
    /// Only bytes delivered after the splice are observed.
    fn tee(&self) -> ByteStream;
}

/// A fully available local file. Completion is immediate; `tee` replays the
/// whole file, which matches playback reading it front to back.
pub struct FileSource {
    path: PathBuf,
    length: u64,
    complete: watch::Sender<bool>,
}

impl FileSource {
    /// Open a local file as a media source
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let length = std::fs::metadata(&path)?.len();
        let (complete, _) = watch::channel(true);
        Ok(FileSource { path, length, complete })
    }
}

impl MediaSource for FileSource {
    fn len(&self) -> u64 {
        self.length
    }

    fn completion(&self) -> watch::Receiver<bool> {
        self.complete.subscribe()
    }

    fn read_range(&self, start: u64, end: u64) -> ByteStream {
        let (tx, rx) = mpsc::channel(16);
        let path = self.path.clone();
        let end = end.min(self.length);
        tokio::spawn(async move {
            let mut file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(err) => {
                    debug!("Range read failed to open {}: {}", path.display(), err);
                    return;
                }
            };
            if file.seek(std::io::SeekFrom::Start(start)).await.is_err() {
                return;
            }
            let mut remaining = end.saturating_sub(start);
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            while remaining > 0 {
                let want = remaining.min(READ_CHUNK_SIZE as u64) as usize;
                match file.read(&mut buf[..want]).await {
                    Ok(0) => break,
                    Ok(n) => {
                        remaining -= n as u64;
                        if tx.send(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            // reader was destroyed, stop quietly
                            break;
                        }
                    }
                    Err(err) => {
                        debug!("Range read failed on {}: {}", path.display(), err);
                        break;
                    }
                }
            }
        });
        rx
    }

    fn tee(&self) -> ByteStream {
        self.read_range(0, self.length)
    }
}

/// An in-memory source fed chunk by chunk, for tests and simulations of a
/// partially delivered file. Range readers block until their bytes arrive;
/// tees observe only bytes pushed after the splice.
#[derive(Clone)]
pub struct MemorySource {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    length: u64,
    data: Mutex<Vec<u8>>,
    tees: Mutex<Vec<mpsc::Sender<Bytes>>>,
    complete: watch::Sender<bool>,
    arrived: watch::Sender<u64>,
}

impl MemorySource {
    /// Create a source that will eventually hold `length` bytes
    pub fn new(length: u64) -> Self {
        let (complete, _) = watch::channel(false);
        let (arrived, _) = watch::channel(0);
        MemorySource {
            inner: Arc::new(MemoryInner {
                length,
                data: Mutex::new(Vec::new()),
                tees: Mutex::new(Vec::new()),
                complete,
                arrived,
            }),
        }
    }

    /// A source whose bytes are all present up front
    pub fn complete_from(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let source = MemorySource::new(data.len() as u64);
        source.push(Bytes::from(data));
        source.finish();
        source
    }

    /// Append the next delivered chunk and forward it to live tees
    pub fn push(&self, chunk: Bytes) {
        {
            let mut data = self.inner.data.lock();
            data.extend_from_slice(&chunk);
            let _ = self.inner.arrived.send(data.len() as u64);
        }
        let mut tees = self.inner.tees.lock();
        tees.retain(|tx| tx.try_send(chunk.clone()).is_ok());
    }

    /// Signal full download
    pub fn finish(&self) {
        let _ = self.inner.complete.send(true);
    }

    /// Bytes delivered so far
    pub fn available(&self) -> u64 {
        self.inner.data.lock().len() as u64
    }
}

impl MediaSource for MemorySource {
    fn len(&self) -> u64 {
        self.inner.length
    }

    fn completion(&self) -> watch::Receiver<bool> {
        self.inner.complete.subscribe()
    }

    fn read_range(&self, start: u64, end: u64) -> ByteStream {
        let (tx, rx) = mpsc::channel(16);
        let inner = self.inner.clone();
        let end = end.min(self.inner.length);
        tokio::spawn(async move {
            let mut offset = start;
            let mut arrived = inner.arrived.subscribe();
            let mut complete = inner.complete.subscribe();
            while offset < end {
                let chunk = {
                    let data = inner.data.lock();
                    let have = data.len() as u64;
                    if have > offset {
                        let upto = have.min(end) as usize;
                        Some(Bytes::copy_from_slice(&data[offset as usize..upto]))
                    } else {
                        None
                    }
                };
                match chunk {
                    Some(chunk) => {
                        offset += chunk.len() as u64;
                        if tx.send(chunk).await.is_err() {
                            return;
                        }
                    }
                    None => {
                        if *complete.borrow() {
                            // no more bytes are coming
                            return;
                        }
                        tokio::select! {
                            changed = arrived.changed() => {
                                if changed.is_err() {
                                    return;
                                }
                            }
                            _ = complete.changed() => {}
                        }
                    }
                }
            }
        });
        rx
    }

    fn tee(&self) -> ByteStream {
        let (tx, rx) = mpsc::channel(64);
        self.inner.tees.lock().push(tx);
        rx
    }
}
