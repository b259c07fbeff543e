// File: timing.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Valid,
    Invalid,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Valid => write!(f, "valid"),
            Class::Invalid => write!(f, "invalid"),
        }
    }
}

/// Raw cumulative stage durations of one request, measured from request start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageTimings {
    pub dns_lookup: Duration,
    pub tcp_connect: Duration,
    pub app_connect: Duration,
    pub time_to_first_byte: Duration,
    pub total: Duration,
}

impl StageTimings {
    pub fn is_monotonic(&self) -> bool {
        self.dns_lookup <= self.tcp_connect
            && self.tcp_connect <= self.app_connect
            && self.app_connect <= self.time_to_first_byte
            && self.time_to_first_byte <= self.total
    }
}

/// Stopwatch that marks the end of each request stage against one start instant.
#[derive(Debug)]
pub struct StageClock {
    start: Instant,
    dns_lookup: Option<Duration>,
    tcp_connect: Option<Duration>,
    app_connect: Option<Duration>,
    time_to_first_byte: Option<Duration>,
}

impl StageClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            dns_lookup: None,
            tcp_connect: None,
            app_connect: None,
            time_to_first_byte: None,
        }
    }

    pub fn mark_dns(&mut self) {
        self.dns_lookup = Some(self.start.elapsed());
    }

    pub fn mark_connect(&mut self) {
        self.tcp_connect = Some(self.start.elapsed());
    }

    pub fn mark_app_connect(&mut self) {
        self.app_connect = Some(self.start.elapsed());
    }

    pub fn mark_first_byte(&mut self) {
        self.time_to_first_byte = Some(self.start.elapsed());
    }

    /// Stops the clock. Unmarked stages collapse onto the previous one so the
    /// result stays monotonic.
    pub fn finish(self) -> StageTimings {
        let total = self.start.elapsed();
        let dns_lookup = self.dns_lookup.unwrap_or_default();
        let tcp_connect = self.tcp_connect.unwrap_or(dns_lookup);
        let app_connect = self.app_connect.unwrap_or(tcp_connect);
        let time_to_first_byte = self.time_to_first_byte.unwrap_or(total);

        StageTimings {
            dns_lookup,
            tcp_connect,
            app_connect,
            time_to_first_byte,
            total,
        }
    }
}

pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Stage latencies of one request in seconds, rounded to the run precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub dns_lookup: f64,
    pub tcp_connect: f64,
    pub app_connect: f64,
    pub time_to_first_byte: f64,
    pub total: f64,
}

impl TimingRecord {
    pub fn from_stages(stages: &StageTimings, precision: u32) -> Self {
        let round = |d: Duration| round_to(d.as_secs_f64(), precision);
        Self {
            dns_lookup: round(stages.dns_lookup),
            tcp_connect: round(stages.tcp_connect),
            app_connect: round(stages.app_connect),
            time_to_first_byte: round(stages.time_to_first_byte),
            total: round(stages.total),
        }
    }

    pub fn stages(&self) -> [f64; 5] {
        [
            self.dns_lookup,
            self.tcp_connect,
            self.app_connect,
            self.time_to_first_byte,
            self.total,
        ]
    }

    pub fn is_consistent(&self) -> bool {
        let stages = self.stages();
        stages.iter().all(|s| *s >= 0.0) && stages.windows(2).all(|w| w[0] <= w[1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSeries {
    class: Class,
    records: Vec<TimingRecord>,
}

impl ClassSeries {
    pub fn new(class: Class) -> Self {
        Self::with_capacity(class, 0)
    }

    pub fn with_capacity(class: Class, capacity: usize) -> Self {
        Self {
            class,
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: TimingRecord) {
        self.records.push(record);
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSeries {
    class: Class,
    values: Vec<f64>,
}

impl SignalSeries {
    pub fn new(class: Class, values: Vec<f64>) -> Self {
        Self { class, values }
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
