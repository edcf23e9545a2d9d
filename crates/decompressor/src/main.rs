mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;

use decompressor_core::codec::DEFAULT_LEVEL;
use decompressor_core::{
    discover_sessions, BatchConfig, BatchMode, BatchRunner, BlobCodec, ProcessOptions,
};
use decompressor_logging::{init_tracing, LogFormat, Logger};

use crate::config::ProjectConfig;

const DEFAULT_SOURCE_DIR: &str = "./source";
const DEFAULT_OUTPUT_DIR: &str = "./output";

#[derive(Parser, Debug)]
#[command(
    name = "decompressor",
    about = "Decompression and clean-up of recorded sessions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the source directory (default: ./source)
    #[arg(short, long, global = true)]
    source: Option<PathBuf>,

    /// Path to the output folder (default: ./output)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Activate detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Exclude RRWEB data from the exported JSON
    #[arg(short = 'r', long)]
    unset_rrweb: bool,

    /// Exclude network data from the exported JSON
    #[arg(short = 'n', long)]
    unset_network: bool,

    /// Remove duplicate network entries from the exported JSON
    #[arg(short = 'd', long)]
    remove_duplicates: bool,

    /// Format and prettify the exported JSON data
    #[arg(short = 'p', long)]
    prettify_content: bool,

    /// Exclude another event category (repeatable)
    #[arg(long = "strip", value_name = "CATEGORY")]
    strip: Vec<String>,

    /// Number of files processed at the same time
    #[arg(short = 'j', long, global = true)]
    jobs: Option<usize>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    /// Append every log event as JSON to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Configuration file (default: ./decompressor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the batch summary as JSON on stdout
    #[arg(long, global = true)]
    json_output: bool,

    /// Show what would be processed without writing anything
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress exported sessions back into the archived format
    Pack {
        /// Compression level (0-10)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=10))]
        level: Option<u8>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Effective settings after merging flags, config file and defaults.
#[derive(Debug)]
struct Settings {
    source: PathBuf,
    output: PathBuf,
    verbose: bool,
    jobs: usize,
    log_format: LogFormat,
    log_file: Option<PathBuf>,
    mode: BatchMode,
}

impl Settings {
    fn resolve(cli: &Cli, config: &ProjectConfig) -> Result<Self> {
        let flag = |set: bool, file: Option<bool>| set || file.unwrap_or(false);

        let log_format = match (cli.log_format, config.log_format.as_deref()) {
            (Some(choice), _) => choice.into(),
            (None, Some(name)) => name
                .parse::<LogFormat>()
                .map_err(anyhow::Error::msg)
                .context("Invalid log_format in config")?,
            (None, None) => LogFormat::default(),
        };

        let mode = match cli.command {
            Some(Command::Pack { level }) => {
                let level = level.or(config.pack.level).unwrap_or(DEFAULT_LEVEL);
                BatchMode::Pack(BlobCodec::with_level(level))
            }
            None => {
                let mut strip_categories = config.strip.clone();
                strip_categories.extend(cli.strip.iter().cloned());
                BatchMode::Export(ProcessOptions {
                    strip_interaction_data: flag(cli.unset_rrweb, config.unset_rrweb),
                    strip_network_data: flag(cli.unset_network, config.unset_network),
                    deduplicate_network: flag(cli.remove_duplicates, config.remove_duplicates),
                    pretty_print: flag(cli.prettify_content, config.prettify_content),
                    strip_categories,
                })
            }
        };

        Ok(Self {
            source: cli
                .source
                .clone()
                .or_else(|| config.source.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR)),
            output: cli
                .output
                .clone()
                .or_else(|| config.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            verbose: flag(cli.verbose, config.verbose),
            jobs: cli.jobs.or(config.jobs).unwrap_or(1).max(1),
            log_format,
            log_file: cli.log_file.clone().or_else(|| config.log_file.clone()),
            mode,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let config = ProjectConfig::load(cli.config.as_deref(), &working_dir)?.unwrap_or_default();
    let settings = Settings::resolve(&cli, &config)?;

    init_tracing(
        if settings.verbose { "debug" } else { "warn" },
        settings.log_format,
    );

    if cli.dry_run {
        return print_dry_run(&settings);
    }

    let logger = match settings.log_file {
        Some(ref path) => Logger::with_file(settings.log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(settings.log_format),
    }
    .verbose(settings.verbose);

    let batch = BatchConfig::new(
        settings.source.clone(),
        settings.output.clone(),
        settings.mode.clone(),
    )
    .with_jobs(settings.jobs);
    let runner = BatchRunner::new(batch, Arc::new(logger));

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing sessions in progress...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let summary = runner.run().await.with_context(|| {
        format!(
            "Error in the file processing process for {}",
            settings.source.display()
        )
    })?;

    if cli.json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    std::process::exit(summary.exit_code());
}

fn print_dry_run(settings: &Settings) -> Result<()> {
    println!("{}", "=== Dry Run ===".bold());
    println!("Source: {}", settings.source.display());
    println!("Output: {}", settings.output.display());
    println!("Jobs: {}", settings.jobs);

    match &settings.mode {
        BatchMode::Export(options) => {
            println!("Mode: export");
            let strip = options.categories_to_strip();
            if strip.is_empty() {
                println!("Strip: {}", "nothing".dimmed());
            } else {
                println!("Strip: {}", strip.join(", "));
            }
            println!("Remove duplicates: {}", options.deduplicate_network);
            println!("Prettify: {}", options.pretty_print);
        }
        BatchMode::Pack(codec) => {
            println!("Mode: pack (level {})", codec.level());
        }
    }

    print_files(&settings.source)
}

fn print_files(source: &Path) -> Result<()> {
    let files = discover_sessions(source)
        .with_context(|| format!("Failed to list {}", source.display()))?;

    if files.is_empty() {
        println!("{}", "No files found.".dimmed());
        return Ok(());
    }

    println!("Files found:");
    for file in files {
        println!("   - {}", file.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("decompressor").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&parse(&[]), &ProjectConfig::default()).unwrap();
        assert_eq!(settings.source, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert_eq!(settings.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(settings.jobs, 1);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        match settings.mode {
            BatchMode::Export(options) => assert_eq!(options, ProcessOptions::default()),
            BatchMode::Pack(_) => panic!("expected export mode"),
        }
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-s", "in", "-o", "out", "-r", "-n", "-d", "-p", "-v"]);
        let settings = Settings::resolve(&cli, &ProjectConfig::default()).unwrap();

        assert_eq!(settings.source, PathBuf::from("in"));
        assert_eq!(settings.output, PathBuf::from("out"));
        assert!(settings.verbose);
        match settings.mode {
            BatchMode::Export(options) => {
                assert!(options.strip_interaction_data);
                assert!(options.strip_network_data);
                assert!(options.deduplicate_network);
                assert!(options.pretty_print);
            }
            BatchMode::Pack(_) => panic!("expected export mode"),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let config = ProjectConfig {
            source: Some(PathBuf::from("from-config")),
            output: Some(PathBuf::from("out-config")),
            remove_duplicates: Some(true),
            strip: vec!["console".to_string()],
            jobs: Some(8),
            log_format: Some("json".to_string()),
            ..Default::default()
        };
        let cli = parse(&["-s", "from-cli", "--strip", "storage", "--log-format", "compact"]);
        let settings = Settings::resolve(&cli, &config).unwrap();

        assert_eq!(settings.source, PathBuf::from("from-cli"));
        assert_eq!(settings.output, PathBuf::from("out-config"));
        assert_eq!(settings.jobs, 8);
        assert_eq!(settings.log_format, LogFormat::Compact);
        match settings.mode {
            BatchMode::Export(options) => {
                assert!(options.deduplicate_network);
                assert_eq!(options.strip_categories, vec!["console", "storage"]);
            }
            BatchMode::Pack(_) => panic!("expected export mode"),
        }
    }

    #[test]
    fn test_invalid_config_log_format() {
        let config = ProjectConfig {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(&parse(&[]), &config).is_err());
    }

    #[test]
    fn test_pack_level() {
        let cli = parse(&["pack", "-l", "9", "-s", "exported"]);
        let settings = Settings::resolve(&cli, &ProjectConfig::default()).unwrap();
        assert_eq!(settings.source, PathBuf::from("exported"));
        match settings.mode {
            BatchMode::Pack(codec) => assert_eq!(codec.level(), 9),
            BatchMode::Export(_) => panic!("expected pack mode"),
        }

        let settings = Settings::resolve(&parse(&["pack"]), &ProjectConfig::default()).unwrap();
        match settings.mode {
            BatchMode::Pack(codec) => assert_eq!(codec.level(), DEFAULT_LEVEL),
            BatchMode::Export(_) => panic!("expected pack mode"),
        }
    }

    #[test]
    fn test_jobs_at_least_one() {
        let settings = Settings::resolve(&parse(&["-j", "0"]), &ProjectConfig::default()).unwrap();
        assert_eq!(settings.jobs, 1);
    }
}
