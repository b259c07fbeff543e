// File: lib.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::new_without_default)]
#![allow(clippy::bool_assert_comparison)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod reducer;
pub mod reports;
pub mod response;
pub mod runstate;
pub mod sampler;
pub mod timer;
pub mod timing;
pub mod tls;


pub use analysis::{analyze, Analysis};
pub use config::{TargetConfig, TargetConfigBuilder};
pub use error::{
    ConfigError, Error, MeasureError, ProtocolError, ReduceError, RunError, TransportError,
};
pub use sampler::{SampleRun, Sampler};
pub use timer::{HttpTransport, RequestTimer, Transport};
pub use timing::{Class, ClassSeries, SignalSeries, StageTimings, TimingRecord};
