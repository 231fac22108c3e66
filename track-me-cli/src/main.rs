//! TrackMe CLI Application
//!
//! Replays a scripted page and interaction scenario against the tracking
//! engine and prints every call that reached the analytics sink:
//! - Builds the page from the scenario's element tree
//! - Attaches an engine with the scenario's configuration
//! - Runs interactions, broadcasts, delayed triggers and setter calls
//! - Reports outcomes as text or JSON lines

use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};

mod config;
mod report;
mod runner;

/// TrackMe - Replay UI tracking scenarios
#[derive(Parser, Debug)]
#[command(name = "track-me-cli")]
#[command(about = "Replay declarative UI tracking scenarios (TOML)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the scenario file (scenario.toml)
    #[arg(short, long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Print sink calls as JSON lines instead of a text report
    #[arg(long)]
    json: bool,

    /// Force debug mode on (overrides the scenario)
    #[arg(long)]
    debug: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
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

    log::info!("TrackMe CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using engine library v{}", track_me_engine::VERSION);

    match &args.scenario {
        Some(path) => replay(path, &args),
        None => {
            println!("TrackMe - No scenario specified");
            println!("\nQuick Start:");
            println!("  track-me-cli --scenario scenario.toml");
            println!("  track-me-cli --scenario scenario.toml --json");
            println!("\nUse --help for more options");
            Ok(())
        }
    }
}

/// Load, replay and report one scenario
fn replay(path: &Path, args: &Args) -> Result<()> {
    log::info!("Loading scenario from: {:?}", path);
    let mut scenario = config::load_scenario(path)?;
    if args.debug {
        scenario.engine.debug = true;
    }
    log::debug!(
        "Scenario loaded: {} top-level element(s), {} step(s)",
        scenario.page.len(),
        scenario.steps.len()
    );

    let summary = runner::ScenarioRunner::new(&scenario)?.run(&scenario.steps)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report::write_json(&mut out, &summary)?;
    } else if !args.quiet {
        report::write_text(&mut out, &summary)?;
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
