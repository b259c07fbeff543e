// File: cli.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{
    TargetConfig, DEFAULT_ATTEMPTS, DEFAULT_LEAK_THRESHOLD, DEFAULT_PRECISION,
    DEFAULT_TIMEOUT_SECS, DEFAULT_TIME_DELAY_MS,
};
use crate::error::ConfigError;
use crate::reducer::ZeroTotalPolicy;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[arg(long = "target", help = "The login endpoint URL")]
    pub target: String,

    #[arg(
        long = "valid_post",
        visible_alias = "valid-post",
        help = "URL-encoded POST body for an existing user"
    )]
    pub valid_post: String,

    #[arg(
        long = "invalid_post",
        visible_alias = "invalid-post",
        help = "URL-encoded POST body for a non-existent user"
    )]
    pub invalid_post: String,

    #[arg(
        long = "attempts",
        default_value_t = DEFAULT_ATTEMPTS,
        help = "Number of trials; each trial sends one valid and one invalid request"
    )]
    pub attempts: u32,

    #[arg(
        long = "time_delay",
        visible_alias = "time-delay",
        default_value_t = DEFAULT_TIME_DELAY_MS,
        help = "Delay between requests in milliseconds"
    )]
    pub time_delay: u64,

    #[arg(
        long = "precision",
        default_value_t = DEFAULT_PRECISION,
        help = "Decimal places when rounding timings (seconds)"
    )]
    pub precision: u32,

    #[arg(
        short = 't',
        long = "timeout",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Per-request timeout in seconds"
    )]
    pub timeout: u64,

    #[arg(
        short = 'k',
        long = "insecure",
        help = "Skip TLS certificate verification (self-signed or test endpoints)"
    )]
    pub insecure: bool,

    #[arg(
        long = "retries",
        default_value_t = 0,
        help = "Retries per failed request before the run is aborted"
    )]
    pub retries: u32,

    #[arg(
        long = "zero-total",
        default_value = "reject",
        help = "Handling of responses whose rounded total time is zero: reject or saturate"
    )]
    pub zero_total: String,

    #[arg(
        long = "threshold",
        default_value_t = DEFAULT_LEAK_THRESHOLD,
        help = "Welch |t| above which a timing leak is reported"
    )]
    pub threshold: f64,

    #[arg(
        short = 'f',
        long = "format",
        default_value = "svg",
        help = "Report format: svg, json, csv, text"
    )]
    pub format: String,

    #[arg(short = 'o', long = "output", help = "Report file (default ticktock.<ext>)")]
    pub output: Option<PathBuf>,

    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short = 'q', long = "quiet", help = "Reduce output verbosity")]
    pub quiet: bool,

    #[arg(long = "no-color", help = "Disable colored output")]
    pub no_color: bool,
}

impl Cli {
    pub fn level_filter(&self) -> LevelFilter {
        if self.verbose {
            return LevelFilter::Debug;
        }
        if self.quiet {
            return LevelFilter::Warn;
        }
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.verbose
    }

    pub fn to_config(&self) -> Result<TargetConfig, ConfigError> {
        let zero_total = ZeroTotalPolicy::from_str(&self.zero_total)?;

        TargetConfig::builder(&self.target, &self.valid_post, &self.invalid_post)
            .set_attempts(self.attempts)
            .set_time_delay(Duration::from_millis(self.time_delay))
            .set_precision(self.precision)
            .set_timeout(Duration::from_secs(self.timeout))
            .set_verify_certificates(!self.insecure)
            .set_retries(self.retries)
            .set_zero_total(zero_total)
            .set_leak_threshold(self.threshold)
            .build()
    }
}
