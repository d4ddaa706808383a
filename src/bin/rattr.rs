//! `rattr` CLI binary entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use rattr::cli;
use rattr::config::{Arguments, FollowImports, FormatPath, Output, ShowWarnings, Threshold};
use rattr::error::RattrError;

/// Static effect-summary analyser for a dynamically-typed, name-scoped
/// language: what a function gets, sets, deletes, and calls.
#[derive(Parser)]
#[command(name = "rattr")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the serialized syntax tree of the file to analyse.
    target: PathBuf,

    /// How deep to follow imports: 0 = none, 1 = local, 2 = local+pip,
    /// 3 = local+pip+stdlib.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
    follow_imports: u8,

    /// Regex pattern of qualified module names to skip (repeatable).
    #[arg(long = "exclude-import")]
    exclude_import: Vec<String>,

    /// Regex pattern of callable names to skip (repeatable).
    #[arg(long = "exclude-name")]
    exclude_name: Vec<String>,

    /// Warning verbosity.
    #[arg(long, value_enum, default_value_t = WarningLevel::Default)]
    warning: WarningLevel,

    /// Treat any non-info diagnostic as a failure (threshold 0).
    #[arg(long, conflicts_with = "permissive")]
    strict: bool,

    /// Allow up to N points of badness before the run is considered failed.
    #[arg(long)]
    permissive: Option<u32>,

    /// What to print on success.
    #[arg(long, value_enum, default_value_t = StdoutKind::Results)]
    stdout: StdoutKind,

    /// Cache file location; when present, a fresh cache entry short-circuits
    /// re-analysis.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Ignore an existing cache entry and re-analyse regardless.
    #[arg(long)]
    force_refresh_cache: bool,

    /// Render `$HOME`-prefixed paths as `~/...` in diagnostics and results.
    #[arg(long)]
    collapse_home: bool,

    /// Truncate long paths in diagnostics and results.
    #[arg(long)]
    truncate_deep_paths: bool,

    /// Increase log verbosity; repeatable.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum WarningLevel {
    None,
    Local,
    Default,
    All,
}

impl From<WarningLevel> for ShowWarnings {
    fn from(level: WarningLevel) -> Self {
        match level {
            WarningLevel::None => ShowWarnings::None,
            WarningLevel::Local => ShowWarnings::Local,
            WarningLevel::Default => ShowWarnings::Default,
            WarningLevel::All => ShowWarnings::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StdoutKind {
    Stats,
    Ir,
    Results,
    Cacheable,
    Silent,
}

impl From<StdoutKind> for Output {
    fn from(kind: StdoutKind) -> Self {
        match kind {
            StdoutKind::Stats => Output::Stats,
            StdoutKind::Ir => Output::Ir,
            StdoutKind::Results => Output::Results,
            StdoutKind::Cacheable => Output::Cacheable,
            StdoutKind::Silent => Output::Silent,
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
}

fn build_arguments(cli: &Cli) -> Result<Arguments, RattrError> {
    let follow_imports = FollowImports::from_level(cli.follow_imports)
        .map_err(RattrError::invalid_arguments)?;
    let threshold = match (cli.strict, cli.permissive) {
        (true, _) => Threshold::strict(),
        (false, Some(n)) => Threshold(n),
        (false, None) => Threshold::strict(),
    };

    Ok(Arguments {
        target: cli.target.clone(),
        follow_imports,
        excluded_imports: cli.exclude_import.clone(),
        excluded_names: cli.exclude_name.clone(),
        show_warnings: cli.warning.into(),
        threshold,
        stdout: cli.stdout.into(),
        cache_file: cli.cache.clone(),
        force_refresh_cache: cli.force_refresh_cache,
        format_path: FormatPath {
            collapse_home: cli.collapse_home,
            truncate_deep_paths: cli.truncate_deep_paths,
        },
    })
}

fn error_json(error: &RattrError) -> String {
    format!(
        "{{\"status\":\"error\",\"exit_class\":{},\"message\":\"{}\"}}",
        error.exit_class().code(),
        error.to_string().replace('"', "\\\"")
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let arguments = match build_arguments(&cli) {
        Ok(arguments) => arguments,
        Err(e) => {
            eprintln!("{}", error_json(&e));
            return ExitCode::from(e.exit_class().code());
        }
    };

    match cli::run(arguments) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", error_json(&e));
            ExitCode::from(e.exit_class().code())
        }
    }
}
