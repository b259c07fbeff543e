// File: response.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use crate::error::ProtocolError;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_CHUNK_LINE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub http_version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn body_framing(&self) -> Result<BodyFraming, ProtocolError> {
        if (100..200).contains(&self.status) || self.status == 204 || self.status == 304 {
            return Ok(BodyFraming::Empty);
        }

        if self
            .header("transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
        {
            return Ok(BodyFraming::Chunked);
        }

        match self.header("content-length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map(BodyFraming::Length)
                .map_err(|_| ProtocolError::MalformedHeader(format!("content-length: {}", value))),
            None => Ok(BodyFraming::UntilClose),
        }
    }
}

pub fn parse_head(raw: &str) -> Result<ResponseHead, ProtocolError> {
    let mut lines = raw.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let mut parts = status_line.splitn(3, ' ');
    let http_version = parts.next().unwrap_or_default();
    let status = parts.next().unwrap_or_default();
    let reason = parts.next().unwrap_or_default();

    if !http_version.starts_with("HTTP/") || status.len() != 3 {
        return Err(ProtocolError::MalformedStatusLine(status_line.to_string()));
    }
    let status: u16 = status
        .parse()
        .map_err(|_| ProtocolError::MalformedStatusLine(status_line.to_string()))?;

    let mut headers = Vec::new();
    for line in lines.filter(|l| !l.is_empty()) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;
        headers.push((key.trim().to_lowercase(), value.trim().to_string()));
    }

    Ok(ResponseHead {
        http_version: http_version.to_string(),
        status,
        reason: reason.trim().to_string(),
        headers,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFraming {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

/// Position inside a chunked body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChunkState {
    /// Reading a `size[;ext]` line.
    Size(Vec<u8>),
    /// Bytes left in the current chunk's data.
    Data(usize),
    /// CRLF after chunk data.
    DataEnd,
    /// Reading trailer lines after the zero-size chunk.
    Trailer(Vec<u8>),
    Done,
}

impl Default for ChunkState {
    fn default() -> Self {
        ChunkState::Size(Vec::new())
    }
}

impl ChunkState {
    fn advance(&mut self, mut input: &[u8]) -> Result<(), ProtocolError> {
        while !input.is_empty() {
            match self {
                ChunkState::Size(line) => {
                    let Some(consumed) = take_line(line, &mut input)? else {
                        continue;
                    };
                    *self = match parse_chunk_size(&consumed)? {
                        0 => ChunkState::Trailer(Vec::new()),
                        size => ChunkState::Data(size),
                    };
                }
                ChunkState::Data(remaining) => {
                    let take = (*remaining).min(input.len());
                    input = &input[take..];
                    *remaining -= take;
                    if *remaining == 0 {
                        *self = ChunkState::DataEnd;
                    }
                }
                ChunkState::DataEnd => {
                    let byte = input[0];
                    input = &input[1..];
                    match byte {
                        b'\r' => {}
                        b'\n' => *self = ChunkState::Size(Vec::new()),
                        other => {
                            return Err(ProtocolError::MalformedChunk(format!(
                                "expected CRLF after chunk data, got byte 0x{:02x}",
                                other
                            )))
                        }
                    }
                }
                ChunkState::Trailer(line) => {
                    let Some(consumed) = take_line(line, &mut input)? else {
                        continue;
                    };
                    if consumed.is_empty() {
                        *self = ChunkState::Done;
                    }
                }
                ChunkState::Done => return Ok(()),
            }
        }
        Ok(())
    }
}

/// Moves bytes from `input` into `line` up to and including LF. Returns the
/// finished line without its line ending, or `None` if more input is needed.
fn take_line<'a>(
    line: &mut Vec<u8>,
    input: &mut &'a [u8],
) -> Result<Option<Vec<u8>>, ProtocolError> {
    let data: &'a [u8] = *input;
    let Some(lf) = data.iter().position(|b| *b == b'\n') else {
        line.extend_from_slice(data);
        *input = &[];
        if line.len() > MAX_CHUNK_LINE {
            return Err(ProtocolError::MalformedChunk(
                "chunk line too long".to_string(),
            ));
        }
        return Ok(None);
    };

    line.extend_from_slice(&data[..lf]);
    *input = &data[lf + 1..];
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(std::mem::take(line)))
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ProtocolError> {
    let text = String::from_utf8_lossy(line);
    let size = text.split(';').next().unwrap_or_default().trim();
    usize::from_str_radix(size, 16)
        .map_err(|_| ProtocolError::MalformedChunk(format!("invalid chunk size {:?}", size)))
}

/// Incremental reader state for one response. Only the head is kept; body
/// bytes are counted, and chunked framing is decoded to find its end.
#[derive(Debug, Default)]
pub struct ResponseReader {
    head_buf: Vec<u8>,
    head: Option<(ResponseHead, BodyFraming)>,
    body_len: usize,
    chunks: ChunkState,
}

impl ResponseReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ProtocolError> {
        if self.head.is_some() {
            return self.consume_body(chunk);
        }

        self.head_buf.extend_from_slice(chunk);
        let Some(end) = find(&self.head_buf, HEAD_TERMINATOR) else {
            if self.head_buf.len() > MAX_HEAD_SIZE {
                return Err(ProtocolError::MalformedHeader(format!(
                    "response head exceeds {} bytes",
                    MAX_HEAD_SIZE
                )));
            }
            return Ok(());
        };

        let raw = String::from_utf8_lossy(&self.head_buf[..end]).to_string();
        let head = parse_head(&raw)?;
        let framing = head.body_framing()?;
        let rest = self.head_buf.split_off(end + HEAD_TERMINATOR.len());
        self.head = Some((head, framing));
        self.consume_body(&rest)
    }

    fn consume_body(&mut self, chunk: &[u8]) -> Result<(), ProtocolError> {
        self.body_len += chunk.len();
        if let Some((_, BodyFraming::Chunked)) = &self.head {
            self.chunks.advance(chunk)?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        match &self.head {
            None => false,
            Some((_, BodyFraming::Empty)) => true,
            Some((_, BodyFraming::Length(len))) => self.body_len >= *len,
            Some((_, BodyFraming::Chunked)) => self.chunks == ChunkState::Done,
            Some((_, BodyFraming::UntilClose)) => false,
        }
    }

    /// Called once the peer has closed the connection.
    pub fn finish(self) -> Result<ResponseHead, ProtocolError> {
        let Some((head, framing)) = self.head else {
            return Err(if self.head_buf.is_empty() {
                ProtocolError::EmptyResponse
            } else {
                ProtocolError::IncompleteHead
            });
        };

        match framing {
            BodyFraming::Length(expected) if self.body_len < expected => {
                Err(ProtocolError::TruncatedBody {
                    expected,
                    received: self.body_len,
                })
            }
            BodyFraming::Chunked if self.chunks != ChunkState::Done => {
                Err(ProtocolError::UnterminatedChunkedBody)
            }
            _ => Ok(head),
        }
    }

    pub fn body_len(&self) -> usize {
        self.body_len
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
