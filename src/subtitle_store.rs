use log::debug;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;

/// Cue store and session-wide subtitle state.
///
/// The store is the only structure written from multiple call sites (probe,
/// streaming tee, full re-parse, format normalizer). All writes are
/// append-only or idempotent inserts, so interleaved readers always observe
/// a consistent snapshot behind the lock.

/// Shared handle to the session's subtitle state
pub type SharedStore = Arc<RwLock<SubtitleStore>>;

/// Subtitle dialect of a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackKind {
    /// Native internal markup, header usable as-is
    Ass,
    /// Legacy native markup, treated like `Ass`
    Ssa,
    /// Converted from the SubRip dialect
    Srt,
    /// Converted from the WebVTT dialect
    Vtt,
    /// Anything else the demuxer labels
    Other(String),
}

impl TrackKind {
    /// Parse a demuxer codec/extension label
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "ass" => TrackKind::Ass,
            "ssa" => TrackKind::Ssa,
            "srt" | "subrip" => TrackKind::Srt,
            "vtt" | "webvtt" => TrackKind::Vtt,
            other => TrackKind::Other(other.to_string()),
        }
    }

    /// Whether cues of this kind already carry internal markup
    pub fn is_native(&self) -> bool {
        matches!(self, TrackKind::Ass | TrackKind::Ssa)
    }
}

/// One discovered subtitle track
#[derive(Debug, Clone)]
pub struct TrackHeader {
    /// Stable track id, unique within a session
    pub number: u64,
    /// Dialect tag
    pub kind: TrackKind,
    /// Best-effort language label
    pub language: Option<String>,
    /// Optional human label
    pub name: Option<String>,
    /// Script preamble fed to the renderer. Starts as the session default
    /// for non-native tracks and is overwritten once authoritative content
    /// is known.
    pub header: String,
}

/// Current selection state. `Off` renders the empty default header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Off,
    Track(u64),
}

/// An embedded font asset extracted from the container
#[derive(Debug, Clone)]
pub struct FontAttachment {
    /// Declared mimetype
    pub mimetype: String,
    /// Raw font bytes
    pub data: Bytes,
}

/// Insertion-ordered cue collection deduplicated by exact line equality
#[derive(Debug, Default)]
struct CueSet {
    lines: Vec<String>,
    seen: HashSet<String>,
}

impl CueSet {
    /// Insert a line unless an equal one is already present
    fn insert(&mut self, line: String) -> bool {
        if self.seen.contains(&line) {
            return false;
        }
        self.seen.insert(line.clone());
        self.lines.push(line);
        true
    }

    fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Per-session subtitle state: headers, cue collections, fonts, selection
#[derive(Debug)]
pub struct SubtitleStore {
    headers: HashMap<u64, TrackHeader>,
    tracks: HashMap<u64, CueSet>,
    fonts: Vec<FontAttachment>,
    current: Option<Selection>,
    parsed: bool,
    default_header: String,
}

impl SubtitleStore {
    /// Create an empty store for a new playback session
    pub fn new(default_header: String) -> Self {
        SubtitleStore {
            headers: HashMap::new(),
            tracks: HashMap::new(),
            fonts: Vec::new(),
            current: None,
            parsed: false,
            default_header,
        }
    }

    /// Create a shared handle around a fresh store
    pub fn shared(default_header: String) -> SharedStore {
        Arc::new(RwLock::new(SubtitleStore::new(default_header)))
    }

    /// Register a discovered track. A no-op when the number already exists.
    /// Non-native headers are replaced with the session default preamble.
    /// The first track registered before any explicit selection becomes the
    /// current track.
    pub fn register_track(&mut self, mut header: TrackHeader) -> bool {
        if self.headers.contains_key(&header.number) {
            return false;
        }
        if !header.kind.is_native() {
            header.header = self.default_header.clone();
        }
        if self.current.is_none() {
            self.current = Some(Selection::Track(header.number));
        }
        debug!(
            "Registered subtitle track {} ({:?}, language {:?})",
            header.number, header.kind, header.language
        );
        self.tracks.insert(header.number, CueSet::default());
        self.headers.insert(header.number, header);
        true
    }

    /// Append one formatted dialogue line. Inserts only when an equal line
    /// is not already present; re-parsing the same byte range is a normal
    /// occurrence and must stay idempotent.
    pub fn append_cue(&mut self, track_number: u64, line: String) -> bool {
        match self.tracks.get_mut(&track_number) {
            Some(cues) => cues.insert(line),
            None => {
                debug!("Dropping cue for unregistered track {}", track_number);
                false
            }
        }
    }

    /// Overwrite a track's header once authoritative content is known
    /// (native style header, or a fully read converted file)
    pub fn set_header(&mut self, track_number: u64, header: String) {
        if let Some(track) = self.headers.get_mut(&track_number) {
            track.header = header;
        }
    }

    /// Store an embedded font asset. Append-only.
    pub fn add_font(&mut self, font: FontAttachment) {
        self.fonts.push(font);
    }

    /// Extracted font assets, in discovery order
    pub fn fonts(&self) -> &[FontAttachment] {
        &self.fonts
    }

    /// Number of cues currently held for a track
    pub fn cue_count(&self, track_number: u64) -> usize {
        self.tracks.get(&track_number).map_or(0, CueSet::len)
    }

    /// Header for one track
    pub fn header(&self, track_number: u64) -> Option<&TrackHeader> {
        self.headers.get(&track_number)
    }

    /// All discovered tracks ordered by number, for the UI selection control
    pub fn track_list(&self) -> Vec<TrackHeader> {
        let mut list: Vec<TrackHeader> = self.headers.values().cloned().collect();
        list.sort_by_key(|t| t.number);
        list
    }

    /// True once a track with this number has been registered
    pub fn has_track(&self, track_number: u64) -> bool {
        self.headers.contains_key(&track_number)
    }

    /// Current selection, `Off` when nothing was ever selected
    pub fn current(&self) -> Selection {
        self.current.unwrap_or(Selection::Off)
    }

    /// Record an explicit selection
    pub fn select(&mut self, selection: Selection) {
        self.current = Some(selection);
    }

    /// Whether acquisition reached its terminal authoritative state
    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// Mark acquisition as terminally complete
    pub fn mark_parsed(&mut self) {
        self.parsed = true;
    }

    /// Compose the renderer payload for a selection: the track's header with
    /// its final newline dropped, followed by its cue lines. `Off` and
    /// unknown tracks yield the default empty-style header.
    pub fn compose(&self, selection: Selection) -> String {
        if let Selection::Track(number) = selection {
            if let Some(track) = self.headers.get(&number) {
                let cues = self
                    .tracks
                    .get(&number)
                    .map(|set| set.lines.join("\n"))
                    .unwrap_or_default();
                let header = &track.header;
                let trimmed = &header[..header.len().saturating_sub(1)];
                return format!("{}{}", trimmed, cues);
            }
        }
        self.default_header.clone()
    }

    /// The session default script preamble
    pub fn default_header(&self) -> &str {
        &self.default_header
    }

    /// Release every header, cue collection and font and return the store to
    /// its initial state. Used on every new file load.
    pub fn reset(&mut self) {
        self.headers.clear();
        self.tracks.clear();
        self.fonts.clear();
        self.current = None;
        self.parsed = false;
    }

    /// Display label for a track, mirroring what a selection control shows.
    /// Unlabeled tracks are presumed English only while no other track in
    /// the session claims English; a human name is appended after a dash.
    pub fn display_label(&self, track_number: u64) -> Option<String> {
        let track = self.headers.get(&track_number)?;
        let session_has_english = self.headers.values().any(|t| {
            matches!(t.language.as_deref(), Some("eng") | Some("en"))
        });
        let language = match track.language.as_deref() {
            Some(code) => language_name(code),
            None if !session_has_english => "English".to_string(),
            None => format!("{:?}", track.kind).to_lowercase(),
        };
        match &track.name {
            Some(name) => Some(format!("{} - {}", language, name)),
            None => Some(language),
        }
    }
}

/// Resolve an ISO 639 code to its English name, falling back to the code
fn language_name(code: &str) -> String {
    isolang::Language::from_639_1(code)
        .or_else(|| isolang::Language::from_639_3(code))
        .map(|lang| lang.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}


#[cfg(test)]
impl SubtitleStore {
    /// Test helper: snapshot clone for label assertions
    fn clone_for_label_test(&self) -> SubtitleStore {
        SubtitleStore {
            headers: self.headers.clone(),
            tracks: HashMap::new(),
            fonts: Vec::new(),
            current: self.current,
            parsed: self.parsed,
            default_header: self.default_header.clone(),
        }
    }
}
