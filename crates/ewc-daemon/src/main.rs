//! EWC Tracker - Main entry point
//!
//! Polls a Cisco embedded wireless controller for active clients.

mod config;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use ewc_scanner::ControllerScanner;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ewc-tracker")]
#[command(about = "Active wireless client tracker for Cisco embedded wireless controllers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ewc-tracker.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single scan and exit
    #[arg(long)]
    scan_once: bool,

    /// Print scan results as JSON
    #[arg(long)]
    json: bool,

    /// Write an example configuration file and exit
    #[arg(long)]
    init_config: bool,
}

/// Printed result of one scan
#[derive(Serialize)]
struct ScanReport<'a> {
    controller: &'a str,
    scanned_at: Option<DateTime<Utc>>,
    clients: &'a [String],
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote example configuration to {}", args.config.display());
        return Ok(());
    }

    info!("EWC Tracker v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;

    info!(
        host = %config.controller.host,
        port = config.controller.port,
        interval = config.daemon.interval_secs,
        "Configuration loaded"
    );

    let Some(mut scanner) =
        ControllerScanner::connect(config.controller.clone(), config.session.clone()).await
    else {
        bail!(
            "Controller {}:{} is not usable, check address and credentials",
            config.controller.host,
            config.controller.port
        );
    };

    if args.scan_once {
        print_report(&scanner, args.json)?;
        return Ok(());
    }

    // The first cycle already ran during initialization
    let mut known: HashSet<String> = scanner.last_results().iter().cloned().collect();
    info!(clients = known.len(), "Tracking started");

    let mut ticker = interval(Duration::from_secs(config.daemon.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }

        let current: HashSet<String> = scanner.scan().await.iter().cloned().collect();

        for mac in current.difference(&known) {
            info!(mac = %mac, "Client appeared");
        }
        for mac in known.difference(&current) {
            info!(mac = %mac, "Client left");
        }

        if args.json {
            print_report(&scanner, true)?;
        }
        known = current;
    }

    Ok(())
}

fn print_report(scanner: &ControllerScanner, json: bool) -> Result<()> {
    let results = scanner.last_results();

    if json {
        let report = ScanReport {
            controller: &scanner.config().host,
            scanned_at: scanner.last_success(),
            clients: results,
        };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("Active clients on {}: {}", scanner.config().host, results.len());
        for mac in results {
            println!("  - {}", mac);
        }
    }

    Ok(())
}
