// File: mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::Analysis;
use crate::config::TargetConfig;
use crate::reducer::Comparison;
use crate::runstate::RunState;

pub mod csv;
pub mod json;
pub mod svg;
pub mod text;

const AXIS_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// 5% below the smallest and above the largest value. A flat or empty
    /// series gets a fixed ±0.05 window instead.
    pub fn padded(values: &[f64]) -> Self {
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if !lo.is_finite() || !hi.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }

        let min = lo - lo.abs() * AXIS_PADDING;
        let max = hi + hi.abs() * AXIS_PADDING;
        if max - min < f64::EPSILON {
            return Self {
                min: lo - AXIS_PADDING,
                max: hi + AXIS_PADDING,
            };
        }
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub title: String,
    pub target: String,
    pub precision: u32,
    pub trials: Vec<u32>,
    pub valid: Vec<f64>,
    pub invalid: Vec<f64>,
    pub valid_mean: f64,
    pub invalid_mean: f64,
    pub comparison: Comparison,
    pub run: RunState,
    pub y_axis: AxisBounds,
}

impl ReportData {
    pub fn new(config: &TargetConfig, analysis: &Analysis) -> Result<Self> {
        let valid = analysis.valid.values().to_vec();
        let invalid = analysis.invalid.values().to_vec();

        if valid.len() != invalid.len() || valid.len() != config.attempts() as usize {
            return Err(anyhow::anyhow!(
                "Refusing to report misaligned series: valid={}, invalid={}, attempts={}",
                valid.len(),
                invalid.len(),
                config.attempts()
            ));
        }

        Ok(Self {
            generated_at: Utc::now(),
            title: "Response Times for Valid / Invalid User Names".to_string(),
            target: config.target().to_string(),
            precision: config.precision(),
            trials: (1..=config.attempts()).collect(),
            y_axis: AxisBounds::padded(&valid),
            valid_mean: analysis.comparison.valid.mean,
            invalid_mean: analysis.comparison.invalid.mean,
            comparison: analysis.comparison.clone(),
            run: analysis.run.state,
            valid,
            invalid,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, f64, f64)> + '_ {
        self.trials
            .iter()
            .zip(self.valid.iter().zip(self.invalid.iter()))
            .map(|(trial, (valid, invalid))| (*trial, *valid, *invalid))
    }
}

pub trait ReportGenerator {
    fn generate(&self, data: &ReportData) -> Result<String>;
    fn file_extension(&self) -> &'static str;
    fn content_type(&self) -> &'static str;
}

/// Receives the finished data set. Never called for a failed run.
pub trait ReportSink {
    fn publish(&mut self, data: &ReportData) -> Result<()>;
}

pub struct ReportEngine;

impl ReportEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report<P: AsRef<Path>>(
        &self,
        format: &str,
        data: &ReportData,
        output_path: Option<P>,
    ) -> Result<String> {
        let generator = self.get_generator(format)?;
        let content = generator.generate(data)?;

        if let Some(path) = output_path {
            std::fs::write(path, &content)?;
        }

        Ok(content)
    }

    pub fn get_generator(&self, format: &str) -> Result<Box<dyn ReportGenerator>> {
        match format.to_lowercase().as_str() {
            "svg" => Ok(Box::new(svg::SvgGenerator::new())),
            "json" => Ok(Box::new(json::JsonGenerator::new())),
            "csv" => Ok(Box::new(csv::CsvGenerator::new())),
            "text" | "txt" => Ok(Box::new(text::TextGenerator::new())),
            _ => Err(anyhow::anyhow!("Unsupported report format: {}", format)),
        }
    }

    pub fn file_extension(&self, format: &str) -> Result<&'static str> {
        Ok(self.get_generator(format)?.file_extension())
    }
}

/// Writes one report file per published data set.
pub struct FileSink {
    engine: ReportEngine,
    format: String,
    path: PathBuf,
}

impl FileSink {
    pub fn new(format: &str, path: Option<PathBuf>) -> Result<Self> {
        let engine = ReportEngine::new();
        let extension = engine.file_extension(format)?;
        let path = path.unwrap_or_else(|| {
            PathBuf::from(format!("{}.{}", env!("CARGO_PKG_NAME"), extension))
        });
        Ok(Self {
            engine,
            format: format.to_string(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for FileSink {
    fn publish(&mut self, data: &ReportData) -> Result<()> {
        self.engine
            .generate_report(&self.format, data, Some(&self.path))?;
        Ok(())
    }
}
