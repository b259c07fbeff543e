// File: sampler.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use log::{debug, info, warn};
use std::fmt::Write;
use std::future::Future;
use tokio::sync::watch;

use crate::config::TargetConfig;
use crate::error::RunError;
use crate::runstate::RunState;
use crate::timer::{RequestTimer, Transport};
use crate::timing::{Class, ClassSeries, TimingRecord};

/// Both class series of a finished run. Index `i` of each is trial `i + 1`.
#[derive(Debug, Clone)]
pub struct SampleRun {
    pub valid: ClassSeries,
    pub invalid: ClassSeries,
    pub state: RunState,
}

pub fn progress_bar(trials: u64) -> ProgressBar {
    let pb = ProgressBar::new(trials);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} trials ({eta})",
    ) {
        pb.set_style(
            style
                .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                })
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
    }
    pb
}

/// Drives the trials strictly one request at a time: valid, then invalid,
/// for every trial. Requests are never issued concurrently.
pub struct Sampler<'a, T> {
    config: &'a TargetConfig,
    timer: RequestTimer<T>,
    progress: ProgressBar,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, T: Transport> Sampler<'a, T> {
    pub fn new(config: &'a TargetConfig, transport: T) -> Self {
        Self {
            config,
            timer: RequestTimer::new(transport, config.precision()),
            progress: ProgressBar::hidden(),
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// The run stops with `RunError::Cancelled` once `true` is sent.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn run(&self) -> Result<SampleRun, RunError> {
        let attempts = self.config.attempts();
        let mut state = RunState::new(attempts);
        let mut valid = ClassSeries::with_capacity(Class::Valid, attempts as usize);
        let mut invalid = ClassSeries::with_capacity(Class::Invalid, attempts as usize);

        info!(
            "Sampling {} trials against {} (delay {:?}, precision {})",
            attempts,
            self.config.target(),
            self.config.time_delay(),
            self.config.precision()
        );
        self.progress.set_length(attempts as u64);
        state.start();

        for trial in 1..=attempts {
            let outcome = match self.sample(trial, Class::Valid, &mut state).await {
                Ok(valid_record) => self
                    .sample(trial, Class::Invalid, &mut state)
                    .await
                    .map(|invalid_record| (valid_record, invalid_record)),
                Err(e) => Err(e),
            };

            let (valid_record, invalid_record) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    self.progress.abandon();
                    return Err(e);
                }
            };

            valid.push(valid_record);
            invalid.push(invalid_record);
            state.complete_trial();
            self.progress.inc(1);
            debug!("Processed {} / {} trials", trial, attempts);
        }

        state.stop();
        self.progress.finish_and_clear();
        Ok(SampleRun {
            valid,
            invalid,
            state,
        })
    }

    async fn sample(
        &self,
        trial: u32,
        class: Class,
        state: &mut RunState,
    ) -> Result<TimingRecord, RunError> {
        let url = self.config.target();
        let body = match class {
            Class::Valid => self.config.valid_post(),
            Class::Invalid => self.config.invalid_post(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            if state.requests_sent() > 0 {
                self.pace(state.completed_trials()).await?;
            }

            state.add_request();
            let result = self
                .guarded(self.timer.measure(url, body), state.completed_trials())
                .await?;

            match result {
                Ok(record) => return Ok(record),
                Err(source) => {
                    state.add_failure();
                    if attempt > self.config.retries() {
                        return Err(RunError::Measure {
                            trial,
                            class,
                            url: url.to_string(),
                            attempts: attempt,
                            source,
                        });
                    }
                    warn!(
                        "Trial {} ({} payload) attempt {}/{} failed: {}",
                        trial,
                        class,
                        attempt,
                        self.config.retries() + 1,
                        source
                    );
                }
            }
        }
    }

    async fn pace(&self, completed: u32) -> Result<(), RunError> {
        let delay = self.config.time_delay();
        if delay.is_zero() {
            return Ok(());
        }
        self.guarded(tokio::time::sleep(delay), completed).await
    }

    async fn guarded<F: Future>(&self, fut: F, completed: u32) -> Result<F::Output, RunError> {
        let Some(cancel) = &self.cancel else {
            return Ok(fut.await);
        };

        let mut cancel = cancel.clone();
        tokio::select! {
            biased;
            Ok(_) = cancel.wait_for(|stop| *stop) => Err(RunError::Cancelled { completed }),
            out = fut => Ok(out),
        }
    }
}

pub async fn run<T: Transport>(config: &TargetConfig, transport: T) -> Result<SampleRun, RunError> {
    Sampler::new(config, transport).run().await
}
