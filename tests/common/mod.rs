// File: common/mod.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

#![allow(dead_code)]

use rcgen::{generate_simple_self_signed, CertifiedKey};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use url::Url;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ticktock::{MeasureError, StageTimings, TargetConfig, Transport, TransportError};

pub const VALID_POST: &str = "username=admin&password=wrong";
pub const INVALID_POST: &str = "username=nobody&password=wrong";

/// Monotonic timings; the setup stages are clamped so they never pass
/// `ttfb_ms`.
pub fn stages(ttfb_ms: u64, total_ms: u64) -> StageTimings {
    let ttfb = Duration::from_millis(ttfb_ms);
    StageTimings {
        dns_lookup: Duration::from_millis(1).min(ttfb),
        tcp_connect: Duration::from_millis(2).min(ttfb),
        app_connect: Duration::from_millis(3).min(ttfb),
        time_to_first_byte: ttfb,
        total: Duration::from_millis(total_ms).max(ttfb),
    }
}

/// Scripted transport: fixed timings per payload, refused connections on
/// chosen call indices (0-based), and a log of every body it was asked for.
pub struct MockTransport {
    valid: StageTimings,
    invalid: StageTimings,
    refuse: HashSet<usize>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(valid: StageTimings, invalid: StageTimings) -> Self {
        Self {
            valid,
            invalid,
            refuse: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn refuse_call(mut self, index: usize) -> Self {
        self.refuse.insert(index);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn measure(&self, _url: &Url, body: &str) -> Result<StageTimings, MeasureError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(body.to_string());
            calls.len() - 1
        };

        if self.refuse.contains(&index) {
            return Err(TransportError::Connect {
                addr: "127.0.0.1:9".parse().unwrap(),
                source: std::io::Error::from(ErrorKind::ConnectionRefused),
            }
            .into());
        }

        if body == VALID_POST {
            Ok(self.valid)
        } else {
            Ok(self.invalid)
        }
    }
}

pub fn config(target: &str, attempts: u32) -> TargetConfig {
    TargetConfig::builder(target, VALID_POST, INVALID_POST)
        .set_attempts(attempts)
        .set_time_delay(Duration::ZERO)
        .build()
        .unwrap()
}

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Mounts a login endpoint answering both payloads with 200.
pub async fn mount_login(server: &MockServer, route: &str, expected_each: u64) {
    for payload in [VALID_POST, INVALID_POST] {
        Mock::given(method("POST"))
            .and(path(route))
            .and(body_string(payload))
            .respond_with(ResponseTemplate::new(200).set_body_string("login failed"))
            .expect(expected_each)
            .mount(server)
            .await;
    }
}

/// One-shot raw TCP server: reads a full request, then writes `response`
/// verbatim and closes.
pub async fn spawn_raw_server(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            read_request(&mut socket).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn self_signed_server_config() -> Arc<ServerConfig> {
    let names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    let CertifiedKey { cert, key_pair } = generate_simple_self_signed(names).unwrap();
    let cert_der = CertificateDer::from(cert.der().to_vec());
    let key_der = PrivateKeyDer::Pkcs8(key_pair.serialize_der().into());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .unwrap();
    Arc::new(config)
}

/// TLS server with a self-signed certificate serving `connections`
/// sequential connections. A failed handshake just drops that connection.
pub async fn spawn_tls_server(response: &'static [u8], connections: usize) -> SocketAddr {
    let acceptor = TlsAcceptor::from(self_signed_server_config());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for _ in 0..connections {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut tls) = acceptor.accept(socket).await else {
                continue;
            };
            read_request(&mut tls).await;
            let _ = tls.write_all(response).await;
            let _ = tls.shutdown().await;
        }
    });

    addr
}

/// Accepts one connection and never answers.
pub async fn spawn_silent_server(hold: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(hold).await;
            drop(socket);
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request<S: AsyncRead + Unpin>(socket: &mut S) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                return;
            }
        }
    }
}
