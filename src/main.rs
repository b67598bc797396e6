// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use subtrans::app_config::{Config, LogLevel};
use subtrans::app_controller::{Controller, JobOptions};
use subtrans::language_utils;
use subtrans::providers::{Credentials, ProviderKind};
use subtrans::subtitle_processor::SubtitleFormat;

/// CLI wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Gemini,
    Kimi,
    Whisper,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Anthropic => ProviderKind::Anthropic,
            CliProvider::Gemini => ProviderKind::Gemini,
            CliProvider::Kimi => ProviderKind::Kimi,
            CliProvider::Whisper => ProviderKind::Whisper,
        }
    }
}

/// CLI wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Srt,
    Vtt,
    Ass,
}

impl From<CliOutputFormat> for SubtitleFormat {
    fn from(cli_format: CliOutputFormat) -> Self {
        match cli_format {
            CliOutputFormat::Srt => SubtitleFormat::SubRip,
            CliOutputFormat::Vtt => SubtitleFormat::WebVtt,
            CliOutputFormat::Ass => SubtitleFormat::AdvancedSubStation,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle, video or audio files
    Translate(TranslateArgs),

    /// Generate shell completions for subtrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input files or directories to process
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Translation provider to use; detected from the available API keys when omitted
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// API key for the provider (otherwise read from the provider's environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Output subtitle format; defaults to the input's format
    #[arg(long, value_enum)]
    output_format: Option<CliOutputFormat>,

    /// Directory for translated files; defaults to each input's directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Absolute stream index (as listed by ffprobe) of the subtitle stream to extract from video files
    #[arg(long, default_value_t = 0)]
    stream_index: usize,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// subtrans - timed subtitle translation with AI providers
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Translate subtitle files while keeping their timing")]
#[command(long_about = "subtrans translates SubRip, WebVTT and Advanced SubStation subtitles with AI providers.

EXAMPLES:
    subtrans translate -t es movie.srt               # Translate to Spanish
    subtrans translate -t de -p anthropic show/      # Process a directory with Anthropic
    subtrans translate -t fr --output-format vtt a.ass
    subtrans translate -t fr --stream-index 2 movie.mkv
    subtrans completions bash > subtrans.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created automatically.

PROVIDERS:
    openai    - OpenAI API (OPENAI_API_KEY)
    anthropic - Anthropic API (ANTHROPIC_API_KEY)
    gemini    - Google Gemini API (GEMINI_API_KEY)
    kimi      - Moonshot Kimi API (KIMI_API_KEY)
    whisper   - local whisper model, audio into English only")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
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
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, args: &TranslateArgs) {
    if let Some(source_language) = &args.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(provider) = args.provider {
        config.translation.provider = Some(provider.into());
    }
    if let Some(model) = &args.model {
        config.translation.model = Some(model.clone());
    }
    if let Some(api_key) = &args.api_key {
        config.translation.api_key = Some(api_key.clone());
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level.into();
    }

    // Output names use the short code when the language has one
    if let Ok(code) = language_utils::normalize_to_part1_or_part2t(&config.target_language) {
        config.target_language = code;
    }
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    if let Some(log_level) = args.log_level {
        log::set_max_level(LogLevel::from(log_level).to_level_filter());
    }

    let mut config = Config::load_or_create(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());
    debug!("Effective configuration: {:?}", config.translation.common);

    // The environment is read here and nowhere else
    let credentials = Credentials::from_env();
    let controller = Controller::from_config(config, &credentials)?;

    let options = JobOptions {
        output_dir: args.output_dir.clone(),
        output_format: args.output_format.map(Into::into),
        stream_index: args.stream_index,
        force_overwrite: args.force_overwrite,
    };

    let summary = controller.run(&args.inputs, &options).await?;
    if summary.has_failures() {
        return Err(anyhow!("{} of {} file(s) failed", summary.failed, summary.total()));
    }

    info!("Done");
    Ok(())
}
