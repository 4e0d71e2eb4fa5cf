use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dialogue::rewrite_inline_tags;

// Format normalizer for externally supplied subtitle files.
//
// External dialects (SubRip, WebVTT and friends) are cue-split and rewritten
// into internal dialogue lines; files already in the internal dialect pass
// through whole as a script header. Downstream consumers cannot tell either
// apart from container-native tracks.

/// Block grammar: optional index line, a timerange line, free-form text
static CUE_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\d+\n)?(\S{9,12})\s?-->\s?(\S{9,12})([^\n]*)\n((?s:.*))").unwrap()
});

/// Leading portion of a timestamp up to centisecond precision
static CENTI_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*[.,]\d{2}").unwrap()
});

/// Outcome of normalizing one external subtitle file
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedFile {
    /// The file was already internal markup: whole file becomes the header
    Header(String),
    /// Converted dialects: one internal dialogue line per parsed cue block
    Dialogue(Vec<String>),
}

/// Whether a filename names a native internal-markup file
pub fn is_native_file(name: &str) -> bool {
    name.ends_with(".ass") || name.ends_with(".ssa")
}

/// Normalize an external subtitle file into Cue Store input
pub fn normalize_file(name: &str, content: &str) -> NormalizedFile {
    if is_native_file(name) {
        NormalizedFile::Header(content.to_string())
    } else {
        NormalizedFile::Dialogue(convert_blocks(content))
    }
}

/// Convert a non-native subtitle file body into internal dialogue lines.
/// Malformed blocks are skipped, not fatal.
pub fn convert_blocks(content: &str) -> Vec<String> {
    let text = content.replace('\r', "");
    let mut lines = Vec::new();
    for (index, block) in text.split("\n\n").enumerate() {
        match convert_block(block) {
            Some(line) => lines.push(line),
            None => {
                if !block.trim().is_empty() {
                    debug!("Skipping malformed cue block {}", index);
                }
            }
        }
    }
    lines
}

/// Convert one cue block, or None when it fails the grammar
fn convert_block(block: &str) -> Option<String> {
    let caps = CUE_BLOCK_REGEX.captures(block)?;
    let start = normalize_timestamp(&caps[1])?;
    let end = normalize_timestamp(&caps[2])?;
    let text = rewrite_inline_tags(caps[4].trim_end()).replace('\n', "\\N");
    Some(format!("Dialogue: 0,{},{},Default,,0,0,0,,{}", start, end, text))
}

/// Reformat a dialect timestamp to the internal `H:MM:SS.CC` convention:
/// clamp to centiseconds, give the short `MM:SS` form a zero hour, strip a
/// padded hour's leading zero, and use a dot separator.
fn normalize_timestamp(raw: &str) -> Option<String> {
    // the 9-char short form has no hour field at all
    let padded = if raw.len() == 9 {
        format!("0:{}", raw)
    } else {
        raw.to_string()
    };
    let mut ts = CENTI_PREFIX_REGEX.find(&padded)?.as_str().to_string();
    // a two-digit hour field loses its padding zero
    if ts.len() > 10 && ts.starts_with('0') {
        ts.remove(0);
    }
    Some(ts.replace(',', "."))
}
