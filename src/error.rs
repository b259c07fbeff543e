// File: error.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::timing::Class;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("attempts must be at least 1")]
    ZeroAttempts,

    #[error("invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("unsupported scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("precision {0} is out of range (0-9)")]
    Precision(u32),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("retry budget {0} is out of range (0-10)")]
    Retries(u32),

    #[error("leak threshold must be a positive number, got {0}")]
    Threshold(f64),

    #[error("unknown zero-total policy '{0}', expected reject or saturate")]
    ZeroTotalPolicy(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("DNS lookup for {host} failed: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("DNS lookup for {0} returned no addresses")]
    NoAddress(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid TLS server name '{0}'")]
    ServerName(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] std::io::Error),

    #[error("server closed the connection without a response")]
    EmptyResponse,

    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("connection closed before the response head was complete")]
    IncompleteHead,

    #[error("response body truncated: expected {expected} bytes, got {received}")]
    TruncatedBody { expected: usize, received: usize },

    #[error("malformed chunked body: {0}")]
    MalformedChunk(String),

    #[error("connection closed before the last chunk")]
    UnterminatedChunkedBody,
}

/// Failure of a single timed request.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl MeasureError {
    pub fn is_transport(&self) -> bool {
        matches!(self, MeasureError::Transport(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, MeasureError::Protocol(_))
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("trial {trial} ({class} payload) against {url} failed after {attempts} attempt(s): {source}")]
    Measure {
        trial: u32,
        class: Class,
        url: String,
        attempts: u32,
        #[source]
        source: MeasureError,
    },

    #[error("run cancelled after {completed} completed trial(s)")]
    Cancelled { completed: u32 },
}

#[derive(Debug, Error, PartialEq)]
pub enum ReduceError {
    #[error("total time is zero for trial {trial}, cannot derive a ratio")]
    Division { trial: usize },

    #[error("cannot summarize an empty series")]
    EmptySeries,

    #[error("series lengths differ: valid={valid}, invalid={invalid}")]
    LengthMismatch { valid: usize, invalid: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

pub type Result<T> = std::result::Result<T, Error>;
