// File: analysis.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use log::info;

use crate::config::TargetConfig;
use crate::error::Result;
use crate::reducer::{self, Comparison};
use crate::sampler::{SampleRun, Sampler};
use crate::timer::Transport;
use crate::timing::SignalSeries;

/// Everything a finished run hands to a report sink.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub run: SampleRun,
    pub valid: SignalSeries,
    pub invalid: SignalSeries,
    pub comparison: Comparison,
}

impl Analysis {
    pub fn from_run(config: &TargetConfig, run: SampleRun) -> Result<Self> {
        let valid = reducer::derive(&run.valid, config.zero_total())?;
        let invalid = reducer::derive(&run.invalid, config.zero_total())?;
        let comparison = reducer::compare(&valid, &invalid, config.leak_threshold())?;

        Ok(Self {
            run,
            valid,
            invalid,
            comparison,
        })
    }

    pub fn summary_lines(&self, precision: u32) -> Vec<String> {
        reducer::summary_lines(&self.comparison, precision)
    }

    pub fn log_summary(&self, precision: u32) {
        for line in self.summary_lines(precision) {
            info!("{}", line);
        }
    }
}

/// Samples, reduces and compares. Nothing is returned unless every trial
/// of both classes succeeded.
pub async fn analyze<T: Transport>(sampler: &Sampler<'_, T>, config: &TargetConfig) -> Result<Analysis> {
    let run = sampler.run().await?;
    Analysis::from_run(config, run)
}
