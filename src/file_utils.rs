use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::app_config::Config;

// @module: Subtitle file discovery next to a video file

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @reads: Whole file as UTF-8 text, lossy on invalid sequences
    pub fn read_text<P: AsRef<Path>>(path: P) -> Result<String> {
        let bytes = fs::read(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // @finds: Subtitle files that belong to a video file. Files in the same
    // directory with a recognized extension; when the directory holds a
    // single video, every subtitle file matches, otherwise only files whose
    // name embeds the video name.
    pub fn find_sibling_subtitles(video_path: &Path, config: &Config) -> Vec<PathBuf> {
        let Some(dir) = video_path.parent() else {
            return Vec::new();
        };
        let video_name = video_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let video_stem = video_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let video_count = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.ends_with(".mkv") || name.ends_with(".mp4") || name.ends_with(".webm")
            })
            .count();

        let mut found: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !config.is_subtitle_file(&name) {
                    return false;
                }
                video_count <= 1 || name.contains(&video_stem) || name.contains(&video_name)
            })
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        found
    }

    // @derives: Human display name for an external subtitle track from its
    // filename, with the video name and separator punctuation stripped
    pub fn derive_display_name(video_name: &str, subtitle_name: &str) -> String {
        let video_stem = video_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(video_name);
        let stripped = if subtitle_name.contains(video_name) {
            subtitle_name.replace(video_name, "")
        } else {
            subtitle_name.replace(video_stem, "")
        };
        let without_ext = stripped
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or(stripped);
        without_ext
            .chars()
            .map(|c| if matches!(c, ',' | '.' | '_' | '-') { ' ' } else { c })
            .collect::<String>()
            .trim()
            .to_string()
    }
}
