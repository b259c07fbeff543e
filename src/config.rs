// File: config.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::reducer::ZeroTotalPolicy;

pub const DEFAULT_ATTEMPTS: u32 = 50;
pub const DEFAULT_TIME_DELAY_MS: u64 = 50;
pub const DEFAULT_PRECISION: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LEAK_THRESHOLD: f64 = 4.5;
pub const MAX_PRECISION: u32 = 9;
pub const MAX_RETRIES: u32 = 10;

/// Validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    target: Url,
    valid_post: String,
    invalid_post: String,
    attempts: u32,
    time_delay: Duration,
    precision: u32,
    timeout: Duration,
    verify_certificates: bool,
    retries: u32,
    zero_total: ZeroTotalPolicy,
    leak_threshold: f64,
}

impl TargetConfig {
    pub fn builder(
        target: impl Into<String>,
        valid_post: impl Into<String>,
        invalid_post: impl Into<String>,
    ) -> TargetConfigBuilder {
        TargetConfigBuilder::new(target, valid_post, invalid_post)
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn valid_post(&self) -> &str {
        &self.valid_post
    }

    pub fn invalid_post(&self) -> &str {
        &self.invalid_post
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn time_delay(&self) -> Duration {
        self.time_delay
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_certificates(&self) -> bool {
        self.verify_certificates
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn zero_total(&self) -> ZeroTotalPolicy {
        self.zero_total
    }

    pub fn leak_threshold(&self) -> f64 {
        self.leak_threshold
    }
}

#[derive(Debug, Clone)]
pub struct TargetConfigBuilder {
    target: String,
    valid_post: String,
    invalid_post: String,
    attempts: u32,
    time_delay: Duration,
    precision: u32,
    timeout: Duration,
    verify_certificates: bool,
    retries: u32,
    zero_total: ZeroTotalPolicy,
    leak_threshold: f64,
}

impl TargetConfigBuilder {
    pub fn new(
        target: impl Into<String>,
        valid_post: impl Into<String>,
        invalid_post: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            valid_post: valid_post.into(),
            invalid_post: invalid_post.into(),
            attempts: DEFAULT_ATTEMPTS,
            time_delay: Duration::from_millis(DEFAULT_TIME_DELAY_MS),
            precision: DEFAULT_PRECISION,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_certificates: true,
            retries: 0,
            zero_total: ZeroTotalPolicy::default(),
            leak_threshold: DEFAULT_LEAK_THRESHOLD,
        }
    }

    pub fn set_attempts(&mut self, attempts: u32) -> &mut Self {
        self.attempts = attempts;
        self
    }

    pub fn set_time_delay(&mut self, time_delay: Duration) -> &mut Self {
        self.time_delay = time_delay;
        self
    }

    pub fn set_precision(&mut self, precision: u32) -> &mut Self {
        self.precision = precision;
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    pub fn set_verify_certificates(&mut self, verify: bool) -> &mut Self {
        self.verify_certificates = verify;
        self
    }

    pub fn set_retries(&mut self, retries: u32) -> &mut Self {
        self.retries = retries;
        self
    }

    pub fn set_zero_total(&mut self, policy: ZeroTotalPolicy) -> &mut Self {
        self.zero_total = policy;
        self
    }

    pub fn set_leak_threshold(&mut self, threshold: f64) -> &mut Self {
        self.leak_threshold = threshold;
        self
    }

    pub fn build(&self) -> Result<TargetConfig, ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        let target = parse_target(&self.target)?;

        if self.precision > MAX_PRECISION {
            return Err(ConfigError::Precision(self.precision));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.retries > MAX_RETRIES {
            return Err(ConfigError::Retries(self.retries));
        }

        if !self.leak_threshold.is_finite() || self.leak_threshold <= 0.0 {
            return Err(ConfigError::Threshold(self.leak_threshold));
        }

        Ok(TargetConfig {
            target,
            valid_post: self.valid_post.clone(),
            invalid_post: self.invalid_post.clone(),
            attempts: self.attempts,
            time_delay: self.time_delay,
            precision: self.precision,
            timeout: self.timeout,
            verify_certificates: self.verify_certificates,
            retries: self.retries,
            zero_total: self.zero_total,
            leak_threshold: self.leak_threshold,
        })
    }
}

fn parse_target(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidTarget {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidTarget {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}
