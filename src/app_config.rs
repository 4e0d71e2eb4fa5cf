use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::Path;

/// Application configuration module
/// This module handles the pipeline configuration including loading,
/// validating and saving configuration settings.
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Style fields for the default `Style: Default,...` line of generated
    /// script headers (everything after the style name)
    #[serde(default = "default_style_fields")]
    pub default_style: String,

    /// Divisor applied to the file length to size the probe read
    /// (2 reads the first half of the file)
    #[serde(default = "default_probe_divisor")]
    pub probe_divisor: u64,

    /// Debounce delay for track selection changes, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// File extensions recognized as external subtitle files
    #[serde(default = "default_subtitle_extensions")]
    pub subtitle_extensions: Vec<String>,

    /// Font served to the renderer when a track references a missing font
    #[serde(default = "default_fallback_font")]
    pub fallback_font: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_style_fields() -> String {
    "Roboto Medium,26,&H00FFFFFF,&H000000FF,&H00020713,&H00000000,0,0,0,0,100,100,0,0,1,1.3,0,2,20,20,23,1".to_string()
}

fn default_probe_divisor() -> u64 {
    2
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_subtitle_extensions() -> Vec<String> {
    vec![
        ".srt".to_string(),
        ".vtt".to_string(),
        ".ass".to_string(),
        ".ssa".to_string(),
    ]
}

fn default_fallback_font() -> String {
    "https://fonts.gstatic.com/s/roboto/v20/KFOlCnqEu92Fr1MmEU9fBBc4.woff2".to_string()
}

impl Config {
    /// Load a configuration from a JSON file, creating a default one if the
    /// file does not exist yet
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Config::default();
            config.save_to_file(path)?;
            return Ok(config);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.probe_divisor == 0 {
            anyhow::bail!("probe_divisor must be at least 1");
        }
        if self.default_style.is_empty() {
            anyhow::bail!("default_style must not be empty");
        }
        Ok(())
    }

    /// The full default script preamble built from the configured style.
    /// Ends with an empty line after `[Events]` so dialogue lines can be
    /// appended after trimming the final newline.
    pub fn default_header(&self) -> String {
        format!(
            "[V4+ Styles]\nFormat: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\nStyle: Default,{}\n[Events]\n\n",
            self.default_style
        )
    }

    /// Check whether a filename carries one of the recognized subtitle
    /// extensions
    pub fn is_subtitle_file(&self, name: &str) -> bool {
        self.subtitle_extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_style: default_style_fields(),
            probe_divisor: default_probe_divisor(),
            debounce_ms: default_debounce_ms(),
            subtitle_extensions: default_subtitle_extensions(),
            fallback_font: default_fallback_font(),
            log_level: LogLevel::default(),
        }
    }
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
