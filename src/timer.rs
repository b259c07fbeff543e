// File: timer.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use log::{debug, trace};
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::{Host, Url};

use crate::config::TargetConfig;
use crate::error::{ConfigError, MeasureError, ProtocolError, TransportError};
use crate::response::ResponseReader;
use crate::timing::{StageClock, StageTimings, TimingRecord};
use crate::tls;

const READ_BUFFER_SIZE: usize = 8192;

/// Issues one request and reports its raw stage timings.
///
/// Implementations must perform exactly one request per call and must not
/// retry on their own.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn measure(&self, url: &Url, body: &str) -> Result<StageTimings, MeasureError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn measure(&self, url: &Url, body: &str) -> Result<StageTimings, MeasureError> {
        (**self).measure(url, body).await
    }
}

/// Wraps a transport and rounds its stages to the run precision.
#[derive(Debug)]
pub struct RequestTimer<T> {
    transport: T,
    precision: u32,
}

impl<T: Transport> RequestTimer<T> {
    pub fn new(transport: T, precision: u32) -> Self {
        Self {
            transport,
            precision,
        }
    }

    pub async fn measure(&self, url: &Url, body: &str) -> Result<TimingRecord, MeasureError> {
        let stages = self.transport.measure(url, body).await?;
        let record = TimingRecord::from_stages(&stages, self.precision);
        trace!(
            "dns={} connect={} appconnect={} ttfb={} total={}",
            record.dns_lookup,
            record.tcp_connect,
            record.app_connect,
            record.time_to_first_byte,
            record.total
        );
        Ok(record)
    }
}

/// HTTP/1.1 form POST over a fresh TCP (and optionally TLS) connection.
#[derive(Clone)]
pub struct HttpTransport {
    timeout: Duration,
    tls: TlsConnector,
}

impl HttpTransport {
    pub fn new(timeout: Duration, verify_certificates: bool) -> Result<Self, ConfigError> {
        Ok(Self {
            timeout,
            tls: tls::connector(verify_certificates)?,
        })
    }

    pub fn from_config(config: &TargetConfig) -> Result<Self, ConfigError> {
        Self::new(config.timeout(), config.verify_certificates())
    }

    async fn exchange(&self, url: &Url, body: &str) -> Result<StageTimings, MeasureError> {
        let host = lookup_name(url);
        let port = url.port_or_known_default().unwrap_or(80);
        let request = build_request(url, body);

        let mut clock = StageClock::start();

        let addrs = resolve(&host, port).await?;
        clock.mark_dns();

        let stream = connect_any(&addrs).await?;
        stream.set_nodelay(true).map_err(TransportError::Io)?;
        clock.mark_connect();

        if url.scheme() == "https" {
            let server_name = ServerName::try_from(host.clone())
                .map_err(|_| ProtocolError::ServerName(host.clone()))?;
            let stream = self
                .tls
                .connect(server_name, stream)
                .await
                .map_err(ProtocolError::Handshake)?;
            clock.mark_app_connect();
            exchange_over(stream, &request, clock).await
        } else {
            clock.mark_app_connect();
            exchange_over(stream, &request, clock).await
        }
    }
}

impl Transport for HttpTransport {
    async fn measure(&self, url: &Url, body: &str) -> Result<StageTimings, MeasureError> {
        match tokio::time::timeout(self.timeout, self.exchange(url, body)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout).into()),
        }
    }
}

fn lookup_name(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => String::new(),
    }
}

async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, TransportError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Dns {
            host: host.to_string(),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(TransportError::NoAddress(host.to_string()));
    }
    Ok(addrs)
}

/// Tries each resolved address in order; fails with the last error only
/// when none accepts.
async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream, TransportError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(source) => {
                debug!("Connect to {} failed: {}", addr, source);
                last_error = Some(TransportError::Connect { addr: *addr, source });
            }
        }
    }
    Err(last_error.unwrap_or_else(|| TransportError::NoAddress(String::new())))
}

pub fn build_request(url: &Url, body: &str) -> Vec<u8> {
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    let host = match url.port() {
        Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
        None => url.host_str().unwrap_or_default().to_string(),
    };

    format!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         User-Agent: {}/{}\r\n\
         Accept: */*\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        path,
        host,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        body.len(),
        body
    )
    .into_bytes()
}

async fn exchange_over<S>(
    mut stream: S,
    request: &[u8],
    mut clock: StageClock,
) -> Result<StageTimings, MeasureError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await.map_err(TransportError::Io)?;
    stream.flush().await.map_err(TransportError::Io)?;

    let mut reader = ResponseReader::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut first_byte_seen = false;

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            // peers that close without a TLS close_notify
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && first_byte_seen => 0,
            Err(e) => return Err(TransportError::Io(e).into()),
        };

        if n == 0 {
            break;
        }

        if !first_byte_seen {
            clock.mark_first_byte();
            first_byte_seen = true;
        }

        reader.feed(&buf[..n])?;
        if reader.is_complete() {
            break;
        }
    }

    let head = reader.finish()?;
    let timings = clock.finish();
    trace!("Response {} {} received", head.status, head.reason);
    Ok(timings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let url = Url::parse("http://example.com:8080/login?next=%2F").unwrap();
        let request = String::from_utf8(build_request(&url, "user=a&pass=b")).unwrap();

        assert!(request.starts_with("POST /login?next=%2F HTTP/1.1\r\n"));
        assert!(request.contains("\r\nHost: example.com:8080\r\n"));
        assert!(request.contains("\r\nContent-Type: application/x-www-form-urlencoded\r\n"));
        assert!(request.contains("\r\nContent-Length: 13\r\n"));
        assert!(request.contains("\r\nConnection: close\r\n"));
        assert!(request.ends_with("\r\n\r\nuser=a&pass=b"));
    }

    #[test]
    fn test_build_request_default_port_and_root_path() {
        let url = Url::parse("https://example.com").unwrap();
        let request = String::from_utf8(build_request(&url, "")).unwrap();

        assert!(request.starts_with("POST / HTTP/1.1\r\n"));
        assert!(request.contains("\r\nHost: example.com\r\n"));
        assert!(request.contains("\r\nContent-Length: 0\r\n"));
    }

    #[test]
    fn test_lookup_name_strips_ipv6_brackets() {
        let url = Url::parse("http://[::1]:8080/").unwrap();
        assert_eq!(lookup_name(&url), "::1");
        let url = Url::parse("http://127.0.0.1/").unwrap();
        assert_eq!(lookup_name(&url), "127.0.0.1");
    }

    async fn unused_addr() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[tokio::test]
    async fn test_connect_any_falls_back_to_next_address() {
        let refused = unused_addr().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap();

        let stream = connect_any(&[refused, open]).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), open);
    }

    #[tokio::test]
    async fn test_connect_any_reports_last_failure() {
        let first = unused_addr().await;
        let last = unused_addr().await;

        let err = connect_any(&[first, last]).await.unwrap_err();
        match err {
            TransportError::Connect { addr, .. } => assert_eq!(addr, last),
            other => panic!("unexpected error: {other}"),
        }
    }

    struct FixedTransport(StageTimings);

    impl Transport for FixedTransport {
        async fn measure(&self, _url: &Url, _body: &str) -> Result<StageTimings, MeasureError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_request_timer_rounds() {
        let stages = StageTimings {
            dns_lookup: Duration::from_micros(1_234),
            tcp_connect: Duration::from_micros(2_345),
            app_connect: Duration::from_micros(2_345),
            time_to_first_byte: Duration::from_micros(80_111),
            total: Duration::from_micros(99_999),
        };
        let timer = RequestTimer::new(FixedTransport(stages), 3);
        let url = Url::parse("http://localhost/").unwrap();
        let record = timer.measure(&url, "a=b").await.unwrap();

        assert_eq!(record.dns_lookup, 0.001);
        assert_eq!(record.tcp_connect, 0.002);
        assert_eq!(record.time_to_first_byte, 0.08);
        assert_eq!(record.total, 0.1);
    }
}
