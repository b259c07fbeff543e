// File: svg.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use anyhow::Result;

use super::{AxisBounds, ReportData, ReportGenerator};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 70.0;
const Y_TICKS: usize = 5;
const MAX_X_TICKS: usize = 10;

const VALID_COLOR: &str = "#1f4fd1";
const INVALID_COLOR: &str = "#d62728";

/// Two-series line chart: trial number against ttfb/total ratio.
pub struct SvgGenerator;

struct Plot {
    trials: usize,
    bounds: AxisBounds,
}

impl Plot {
    fn width() -> f64 {
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn height() -> f64 {
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn x(&self, trial: u32) -> f64 {
        if self.trials <= 1 {
            return MARGIN_LEFT + Self::width() / 2.0;
        }
        MARGIN_LEFT + (trial.saturating_sub(1)) as f64 / (self.trials - 1) as f64 * Self::width()
    }

    fn y(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.bounds.min, self.bounds.max);
        MARGIN_TOP + (self.bounds.max - clamped) / self.bounds.span() * Self::height()
    }
}

impl SvgGenerator {
    pub fn new() -> Self {
        Self
    }

    fn escape_xml(&self, text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    fn polyline(&self, plot: &Plot, data: &ReportData, values: &[f64], color: &str) -> String {
        let points = data
            .trials
            .iter()
            .zip(values)
            .map(|(trial, value)| format!("{:.2},{:.2}", plot.x(*trial), plot.y(*value)))
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = format!(
            "  <polyline fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
            color, points
        );
        for (trial, value) in data.trials.iter().zip(values) {
            out.push_str(&format!(
                "  <circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"2.5\" fill=\"{}\"/>\n",
                plot.x(*trial),
                plot.y(*value),
                color
            ));
        }
        out
    }

    fn mean_line(&self, plot: &Plot, mean: f64, color: &str) -> String {
        let y = plot.y(mean);
        format!(
            "  <line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"6,4\"/>\n",
            MARGIN_LEFT,
            y,
            MARGIN_LEFT + Plot::width(),
            y,
            color
        )
    }

    fn axes(&self, plot: &Plot, data: &ReportData) -> String {
        let mut out = String::new();
        let left = MARGIN_LEFT;
        let right = MARGIN_LEFT + Plot::width();
        let top = MARGIN_TOP;
        let bottom = MARGIN_TOP + Plot::height();

        out.push_str(&format!(
            "  <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"#333\"/>\n",
            left,
            top,
            Plot::width(),
            Plot::height()
        ));

        let precision = data.precision.max(2) as usize;
        for i in 0..=Y_TICKS {
            let value = plot.bounds.min + plot.bounds.span() * i as f64 / Y_TICKS as f64;
            let y = plot.y(value);
            out.push_str(&format!(
                "  <line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#ddd\"/>\n",
                left, y, right, y
            ));
            out.push_str(&format!(
                "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"11\">{:.p$}</text>\n",
                left - 6.0,
                y + 4.0,
                value,
                p = precision
            ));
        }

        let step = data.trials.len().div_ceil(MAX_X_TICKS).max(1);
        for trial in data.trials.iter().step_by(step) {
            let x = plot.x(*trial);
            out.push_str(&format!(
                "  <line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#333\"/>\n",
                x,
                bottom,
                x,
                bottom + 5.0
            ));
            out.push_str(&format!(
                "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"11\">{}</text>\n",
                x,
                bottom + 18.0,
                trial
            ));
        }

        out.push_str(&format!(
            "  <text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"13\">Request Number (#)</text>\n",
            left + Plot::width() / 2.0,
            HEIGHT - 25.0
        ));
        out.push_str(&format!(
            "  <text x=\"20\" y=\"{:.2}\" text-anchor=\"middle\" font-size=\"13\" transform=\"rotate(-90 20 {:.2})\">Time to first byte / total</text>\n",
            top + Plot::height() / 2.0,
            top + Plot::height() / 2.0
        ));
        out
    }

    fn legend(&self, data: &ReportData) -> String {
        let p = data.precision as usize;
        let x = MARGIN_LEFT + 10.0;
        let y = MARGIN_TOP - 12.0;
        format!(
            "  <text x=\"{:.2}\" y=\"{:.2}\" font-size=\"12\" fill=\"{}\">valid (mean {:.p$})</text>\n  <text x=\"{:.2}\" y=\"{:.2}\" font-size=\"12\" fill=\"{}\">invalid (mean {:.p$})</text>\n",
            x,
            y,
            VALID_COLOR,
            data.valid_mean,
            x + 220.0,
            y,
            INVALID_COLOR,
            data.invalid_mean,
        )
    }
}

impl ReportGenerator for SvgGenerator {
    fn generate(&self, data: &ReportData) -> Result<String> {
        let plot = Plot {
            trials: data.trials.len(),
            bounds: data.y_axis,
        };

        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = WIDTH,
            h = HEIGHT
        ));
        svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
        svg.push_str(&format!(
            "  <text x=\"{:.2}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\" font-weight=\"bold\">{}</text>\n",
            WIDTH / 2.0,
            self.escape_xml(&data.title)
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.2}\" y=\"40\" text-anchor=\"middle\" font-size=\"11\" fill=\"#555\">{}</text>\n",
            WIDTH / 2.0,
            self.escape_xml(&data.target)
        ));
        svg.push_str(&self.axes(&plot, data));
        svg.push_str(&self.legend(data));
        svg.push_str(&self.mean_line(&plot, data.valid_mean, VALID_COLOR));
        svg.push_str(&self.mean_line(&plot, data.invalid_mean, INVALID_COLOR));
        svg.push_str(&self.polyline(&plot, data, &data.valid, VALID_COLOR));
        svg.push_str(&self.polyline(&plot, data, &data.invalid, INVALID_COLOR));
        svg.push_str("</svg>\n");

        Ok(svg)
    }

    fn file_extension(&self) -> &'static str {
        "svg"
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}
