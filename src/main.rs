// File: main.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use std::process::ExitCode;
use tokio::sync::watch;

use ticktock::cli::Cli;
use ticktock::reports::{FileSink, ReportData, ReportSink};
use ticktock::sampler::{progress_bar, Sampler};
use ticktock::{analyze, Error, HttpTransport, TargetConfig};

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = SimpleLogger::new().with_level(cli.level_filter()).init() {
        eprintln!("Failed to initialize logger: {}", e);
    }
    log::debug!("Passed arguments: {:?}", cli);

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            print_error(&format!("Invalid configuration: {}", e));
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut sink = match FileSink::new(&cli.format, cli.output.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            error!("{}", e);
            print_error(&e.to_string());
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match execute(&cli, &config, &mut sink).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            print_error(&format!("{:#}", e));
            match e.downcast_ref::<Error>() {
                Some(Error::Config(_)) => ExitCode::from(EXIT_CONFIG),
                _ => ExitCode::from(EXIT_FAILURE),
            }
        }
    }
}

async fn execute(cli: &Cli, config: &TargetConfig, sink: &mut FileSink) -> Result<()> {
    if !config.verify_certificates() {
        warn!("TLS certificate verification is disabled (--insecure)");
    }
    if config.valid_post() == config.invalid_post() {
        warn!("Valid and invalid payloads are identical; both classes will measure the same request");
    }

    let transport = HttpTransport::from_config(config).map_err(Error::from)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping run");
            let _ = cancel_tx.send(true);
        }
    });

    let mut sampler = Sampler::new(config, transport).with_cancel(cancel_rx);
    if cli.show_progress() {
        sampler = sampler.with_progress(progress_bar(config.attempts() as u64));
    }

    let analysis = analyze(&sampler, config).await?;
    analysis.log_summary(config.precision());

    let state = analysis.run.state;
    info!(
        "{} requests sent, {} failed, {} ms",
        state.requests_sent(),
        state.failed_requests(),
        state.elapsed_ms().unwrap_or_default()
    );

    let data = ReportData::new(config, &analysis)?;
    sink.publish(&data)
        .with_context(|| format!("Failed to write report to {}", sink.path().display()))?;
    info!("Report written to {}", sink.path().display());

    if analysis.comparison.leak_suspected {
        print_warning(&format!(
            "Response timing differs between valid and invalid users (t = {})",
            analysis.comparison.welch_label()
        ));
    } else {
        print_success(&format!(
            "No significant timing difference detected (t = {})",
            analysis.comparison.welch_label()
        ));
    }

    Ok(())
}
