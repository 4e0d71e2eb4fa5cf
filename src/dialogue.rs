use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Internal dialogue markup helpers.
/// Every cue, whatever its origin, ends up as a single `Dialogue:` line in
/// this module's format before it is stored.

/// HTML-like inline tag, opening or closing, with optional attributes
static INLINE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([A-Za-z]+)[^>]*>").unwrap()
});

/// One timed subtitle event as emitted by a demuxer capability.
///
/// Timing is absolute milliseconds from the start of the media. Style fields
/// mirror the ASS event columns and default to the values the renderer
/// expects when a container leaves them unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CueEvent {
    /// Start time in ms
    pub time_ms: u64,
    /// Duration in ms
    pub duration_ms: u64,
    /// Render layer
    pub layer: u32,
    /// Style name, empty means `Default`
    pub style: String,
    /// Speaker name field
    pub name: String,
    /// Left margin override
    pub margin_l: String,
    /// Right margin override
    pub margin_r: String,
    /// Vertical margin override
    pub margin_v: String,
    /// Transition effect field
    pub effect: String,
    /// Dialogue text, possibly carrying inline markup
    pub text: String,
}

impl CueEvent {
    /// Shorthand for cues that only carry timing and text
    pub fn timed(time_ms: u64, duration_ms: u64, text: &str) -> Self {
        CueEvent {
            time_ms,
            duration_ms,
            text: text.to_string(),
            ..CueEvent::default()
        }
    }

    /// Format this event as one internal dialogue line.
    ///
    /// When `native_markup` is false the text passes through the inline tag
    /// rewrite first, turning HTML-like emphasis into override tags.
    pub fn to_dialogue_line(&self, native_markup: bool) -> String {
        let text = if native_markup {
            self.text.clone()
        } else {
            rewrite_inline_tags(&self.text)
        };
        format!(
            "Dialogue: {},{},{},{},{},{},{},{},{},{}",
            self.layer,
            format_timestamp(self.time_ms),
            format_timestamp(self.time_ms + self.duration_ms),
            if self.style.is_empty() { "Default" } else { &self.style },
            self.name,
            if self.margin_l.is_empty() { "0" } else { &self.margin_l },
            if self.margin_r.is_empty() { "0" } else { &self.margin_r },
            if self.margin_v.is_empty() { "0" } else { &self.margin_v },
            self.effect,
            text,
        )
    }
}

impl fmt::Display for CueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --> {}: {}",
            format_timestamp(self.time_ms),
            format_timestamp(self.time_ms + self.duration_ms),
            self.text
        )
    }
}

/// Format a millisecond offset in the internal `H:MM:SS.CC` convention.
/// The hour digit is not zero padded and seconds carry centisecond precision.
pub fn format_timestamp(ms: u64) -> String {
    let total_secs = ms as f64 / 1000.0;
    let hours = (total_secs / 3600.0).floor() as u64;
    let minutes = (total_secs / 60.0).floor() as u64 - hours * 60;
    let seconds = total_secs % 60.0;
    format!("{}:{:02}:{:05.2}", hours, minutes, seconds)
}

/// Compact `M:SS` / `H:MM:SS` form used for progress display
pub fn format_timestamp_short(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = total_secs / 60 - hours * 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Rewrite HTML-like inline tags into override tags: an opening tag enables
/// the corresponding style toggle, a closing tag disables it. Attributes are
/// dropped. HTML entities are unescaped afterwards.
pub fn rewrite_inline_tags(text: &str) -> String {
    let rewritten = INLINE_TAG_REGEX.replace_all(text, |caps: &regex::Captures| {
        let toggle = if &caps[1] == "/" { "0" } else { "1" };
        format!("{{\\{}{}}}", caps[2].to_lowercase(), toggle)
    });
    unescape_entities(&rewritten)
}

/// Replace HTML special entities with their renderer equivalents
fn unescape_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\\h")
}
