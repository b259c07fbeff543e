// File: runstate.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunState {
    planned_trials: u32,
    completed_trials: u32,
    requests_sent: u64,
    failed_requests: u64,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl RunState {
    pub fn new(planned_trials: u32) -> RunState {
        RunState {
            planned_trials,
            completed_trials: 0,
            requests_sent: 0,
            failed_requests: 0,
            start_time: None,
            end_time: None,
        }
    }

    pub fn start(&mut self) {
        self.start_time = Some(Utc::now());
    }

    pub fn stop(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn add_request(&mut self) {
        self.requests_sent += 1;
    }

    pub fn add_failure(&mut self) {
        self.failed_requests += 1;
    }

    pub fn complete_trial(&mut self) {
        self.completed_trials += 1;
    }

    pub fn planned_trials(&self) -> u32 {
        self.planned_trials
    }

    pub fn completed_trials(&self) -> u32 {
        self.completed_trials
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
