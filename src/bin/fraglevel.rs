//! fraglevel
//!
//! Estimate Linux memory fragmentation from /proc/buddyinfo

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use fraglevel::{selftest, Config, EmptyZonePolicy, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fraglevel", version)]
#[command(about = "Estimate Linux memory fragmentation from /proc/buddyinfo")]
struct Args {
    /// Run the built-in self checks instead of reading the live system
    #[arg(short = 't', long)]
    test: bool,

    /// TOML config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Read this buddyinfo snapshot instead of /proc/buddyinfo
    #[arg(long, env = "FRAGLEVEL_BUDDYINFO")]
    buddyinfo: Option<PathBuf>,

    /// Output format (text, json) [default: text]
    #[arg(long)]
    format: Option<String>,

    /// Zones with no free pages (error, zero) [default: error]
    #[arg(long)]
    empty_zone: Option<String>,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Unused; any positional argument prints usage
    #[arg(hide = true)]
    extra: Vec<String>,
}

/// What a parsed command line asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Usage,
    SelfTest,
    Report,
}

impl Args {
    fn mode(&self) -> Mode {
        if !self.extra.is_empty() {
            Mode::Usage
        } else if self.test {
            Mode::SelfTest
        } else {
            Mode::Report
        }
    }
}

/// `RUST_LOG` when set, otherwise the level picked by `-v`
fn env_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn init_tracing(verbose: u8) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(verbose, rust_log.as_deref()))
        .init();
}

/// Defaults, then the config file, then command line flags
fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(path) = &args.buddyinfo {
        config = config.with_buddyinfo(path);
    }
    if let Some(format) = &args.format {
        config = config.with_format(format.parse::<OutputFormat>()?);
    }
    if let Some(policy) = &args.empty_zone {
        config = config.with_empty_zone(policy.parse::<EmptyZonePolicy>()?);
    }

    Ok(config)
}

fn run_self_test() -> ExitCode {
    let report = selftest::run();
    println!("{}", report);

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.mode() {
        Mode::Usage => {
            // Printing help only fails if stdout is gone
            let _ = Args::command().print_help();
            return ExitCode::SUCCESS;
        }
        Mode::SelfTest => return run_self_test(),
        Mode::Report => {}
    }

    if !cfg!(target_os = "linux") {
        eprintln!("ERROR: fraglevel only works on Linux");
        return ExitCode::FAILURE;
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Reporting on {:?} as {:?}, empty zones: {:?}",
        config.buddyinfo, config.format, config.empty_zone
    );

    match fraglevel::run(&config) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}
