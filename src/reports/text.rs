// File: text.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;

use super::{ReportData, ReportGenerator};
use crate::reducer::summary_lines;

pub struct TextGenerator;

impl TextGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for TextGenerator {
    fn generate(&self, data: &ReportData) -> Result<String> {
        let p = data.precision as usize;
        let mut out = String::new();

        out.push_str(&format!("{}\n", data.title));
        out.push_str(&"=".repeat(data.title.len()));
        out.push('\n');
        out.push_str(&format!("Target: {}\n", data.target));
        out.push_str(&format!(
            "Date: {}\n",
            data.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "Trials: {} ({} requests, {} failed)\n",
            data.trials.len(),
            data.run.requests_sent(),
            data.run.failed_requests()
        ));
        if let Some(ms) = data.run.elapsed_ms() {
            out.push_str(&format!("Duration: {} ms\n", ms));
        }
        out.push('\n');

        for line in summary_lines(&data.comparison, data.precision) {
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');

        out.push_str(&format!("{:>6}  {:>12}  {:>12}\n", "trial", "valid", "invalid"));
        for (trial, valid, invalid) in data.rows() {
            out.push_str(&format!(
                "{:>6}  {:>12.p$}  {:>12.p$}\n",
                trial, valid, invalid
            ));
        }

        Ok(out)
    }

    fn file_extension(&self) -> &'static str {
        "txt"
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }
}
