// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use substream::app_config::Config;
use substream::file_utils::FileManager;
use substream::subtitle_convert::{NormalizedFile, normalize_file};
use substream::subtitle_store::{Selection, SubtitleStore, TrackHeader, TrackKind};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert external subtitle files into the internal script format
    Convert(ConvertArgs),

    /// List subtitle files that would attach to a video
    Inspect(InspectArgs),

    /// Generate shell completions for substream
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output file (single-file input only); defaults to the input with an
    /// .ass extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Video file to find subtitle files for
    #[arg(value_name = "VIDEO_PATH")]
    video_path: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// substream - streaming subtitle toolkit
///
/// Extracts and normalizes subtitle content for streaming playback. The
/// library drives the full acquisition pipeline; this binary exposes the
/// offline pieces: dialect conversion and sibling-file discovery.
#[derive(Parser, Debug)]
#[command(name = "substream")]
#[command(version = "1.0.0")]
#[command(about = "Streaming subtitle acquisition toolkit")]
#[command(long_about = "substream normalizes external subtitle files into the internal script
format used by the streaming playback pipeline.

EXAMPLES:
    substream convert episode.srt              # Convert one file next to itself
    substream convert subs/ -f                 # Convert a directory, overwriting
    substream inspect episode.mkv              # List attachable subtitle files
    substream completions bash > substream.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file
    doesn't exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "substream", &mut std::io::stdout());
            Ok(())
        }
        Commands::Convert(args) => run_convert(args).await,
        Commands::Inspect(args) => run_inspect(args).await,
    }
}

async fn run_convert(args: ConvertArgs) -> Result<()> {
    let config = load_config(&args.config_path, args.log_level.clone())?;

    if args.input_path.is_dir() {
        if args.output.is_some() {
            return Err(anyhow!("--output is only valid for single-file input"));
        }
        return convert_directory(&args.input_path, &config, args.force_overwrite);
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input_path.with_extension("ass"));
    convert_one(&args.input_path, &output, &config, args.force_overwrite)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Convert every recognized subtitle file under a directory
fn convert_directory(dir: &Path, config: &Config, force_overwrite: bool) -> Result<()> {
    let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| config.is_subtitle_file(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect();
    if files.is_empty() {
        warn!("No subtitle files found under {}", dir.display());
        return Ok(());
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut converted = 0usize;
    for file in &files {
        progress.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        match convert_one(file, &file.with_extension("ass"), config, force_overwrite) {
            Ok(true) => converted += 1,
            Ok(false) => {}
            Err(err) => warn!("Skipping {}: {}", file.display(), err),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();
    info!("Converted {}/{} subtitle files", converted, files.len());
    Ok(())
}

/// Convert a single file; Ok(false) means it was skipped
fn convert_one(
    input: &Path,
    output: &Path,
    config: &Config,
    force_overwrite: bool,
) -> Result<bool> {
    if FileManager::file_exists(output) && !force_overwrite {
        debug!("Output {} exists, skipping", output.display());
        return Ok(false);
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = FileManager::read_text(input)?;

    // feed the normalizer output through a store, exactly like an attached
    // external track, and write out the composed script
    let mut store = SubtitleStore::new(config.default_header());
    store.register_track(TrackHeader {
        number: 0,
        kind: name
            .rsplit_once('.')
            .map(|(_, ext)| TrackKind::from_label(ext))
            .unwrap_or(TrackKind::Other(String::new())),
        language: None,
        name: None,
        header: config.default_header(),
    });
    match normalize_file(&name, &content) {
        NormalizedFile::Header(header) => store.set_header(0, header),
        NormalizedFile::Dialogue(lines) => {
            if lines.is_empty() {
                return Err(anyhow!("no parsable cue blocks"));
            }
            for line in lines {
                store.append_cue(0, line);
            }
        }
    }
    let script = store.compose(Selection::Track(0));
    std::fs::write(output, script)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(true)
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(&args.config_path, args.log_level.clone())?;
    let video_name = args
        .video_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("VIDEO_PATH must name a file"))?;

    let found = FileManager::find_sibling_subtitles(&args.video_path, &config);
    if found.is_empty() {
        info!("No subtitle files attach to {}", video_name);
        return Ok(());
    }
    for (index, path) in found.iter().enumerate() {
        let sub_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = FileManager::derive_display_name(&video_name, &sub_name);
        println!(
            "{}: {} ({})",
            index,
            if label.is_empty() { &sub_name } else { &label },
            path.display()
        );
    }
    Ok(())
}

fn load_config(config_path: &str, log_level: Option<CliLogLevel>) -> Result<Config> {
    let config = Config::from_file(config_path)?;
    let filter = log_level
        .map(LevelFilter::from)
        .unwrap_or_else(|| config.log_level.to_level_filter());
    log::set_max_level(filter);
    Ok(config)
}
