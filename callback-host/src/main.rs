//! Callback Host CLI Application
//!
//! Command-line host for the callback-dispatch library. It plays the role of
//! the native event source:
//! - Registers the events declared in a TOML config
//! - Attaches declarative and native (dynamic library) listeners by name
//! - Fires the configured trigger sequence
//! - Prints the registry listing and a run summary

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod callbacks;
mod config;
mod host;
mod report;

use host::Host;

/// Callback Host - Register events, attach listeners, fire triggers
#[derive(Parser, Debug)]
#[command(name = "callback-host")]
#[command(about = "Drive the callback dispatch core from a TOML config", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the host configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Register everything and print the callback listing without firing triggers
    #[arg(short, long)]
    list: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Callback Host v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using dispatch library v{}", callback_dispatch::VERSION);

    log::info!("Loading configuration from: {:?}", args.config);
    let config = config::load_config(&args.config)?;
    log::debug!("Configuration loaded successfully");

    let host = Host::from_config(&config)?;
    log::debug!("{} callback pair(s) registered", host.pairs().len());
    if let Some(path) = host.native_library() {
        log::info!("Native listeners loaded from {:?}", path);
    }

    host.print_listing();
    if args.list {
        return Ok(());
    }

    log::info!("Run started at {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let summary = host.run(&config.triggers);
    if !args.quiet {
        summary.print_summary();
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
