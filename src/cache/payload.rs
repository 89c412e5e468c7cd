//! Stored payload framing.
//!
//! A payload is what went out on the wire for one response: an HTTP/1.1
//! status line, the header lines, a blank line, then the body bytes exactly
//! as the origin produced them. Storing the framing lets a hit be replayed
//! with the origin's status and headers without the store knowing anything
//! about HTTP.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, response::Parts},
    response::Response,
};
use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const LINE_BREAK: &str = "\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload has no header terminator")]
    MissingHead,
    #[error("malformed status line `{0}`")]
    StatusLine(String),
    #[error("malformed header line `{0}`")]
    HeaderLine(String),
}

/// Encode the status line and headers of a response.
pub fn encode_head(parts: &Parts) -> Bytes {
    encode_head_from(parts.status, &parts.headers)
}

fn encode_head_from(status: StatusCode, headers: &HeaderMap) -> Bytes {
    let mut head = BytesMut::with_capacity(64 + headers.len() * 32);
    head.put_slice(b"HTTP/1.1 ");
    head.put_slice(status.as_str().as_bytes());
    head.put_u8(b' ');
    head.put_slice(status.canonical_reason().unwrap_or("").as_bytes());
    head.put_slice(LINE_BREAK.as_bytes());
    for (name, value) in headers {
        head.put_slice(name.as_str().as_bytes());
        head.put_slice(b": ");
        head.put_slice(value.as_bytes());
        head.put_slice(LINE_BREAK.as_bytes());
    }
    head.put_slice(LINE_BREAK.as_bytes());
    head.freeze()
}

/// A stored payload split back into its response parts.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedPayload {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn encode(&self) -> Bytes {
        let head = encode_head_from(self.status, &self.headers);
        let mut payload = BytesMut::with_capacity(head.len() + self.body.len());
        payload.put_slice(&head);
        payload.put_slice(&self.body);
        payload.freeze()
    }

    pub fn decode(payload: Bytes) -> Result<Self, PayloadError> {
        let split = payload
            .windows(HEAD_TERMINATOR.len())
            .position(|window| window == HEAD_TERMINATOR)
            .ok_or(PayloadError::MissingHead)?;

        // The status line always ends with a line break, so include the
        // first one of the terminator in the head.
        let head = &payload[..split + LINE_BREAK.len()];
        let body = payload.slice(split + HEAD_TERMINATOR.len()..);

        let mut lines = head
            .split(|byte| *byte == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty());

        let status_line = lines.next().ok_or(PayloadError::MissingHead)?;
        let status = parse_status_line(status_line)?;

        let mut headers = HeaderMap::new();
        for line in lines {
            let (name, value) = parse_header_line(line)?;
            headers.append(name, value);
        }

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode, PayloadError> {
    let malformed = || PayloadError::StatusLine(String::from_utf8_lossy(line).into_owned());

    let mut fields = line.splitn(3, |byte| *byte == b' ');
    match fields.next() {
        Some(version) if version.starts_with(b"HTTP/") => {}
        _ => return Err(malformed()),
    }
    let code = fields.next().ok_or_else(malformed)?;
    StatusCode::from_bytes(code).map_err(|_| malformed())
}

fn parse_header_line(line: &[u8]) -> Result<(HeaderName, HeaderValue), PayloadError> {
    let malformed = || PayloadError::HeaderLine(String::from_utf8_lossy(line).into_owned());

    let colon = line
        .iter()
        .position(|byte| *byte == b':')
        .ok_or_else(malformed)?;
    let name = HeaderName::from_bytes(&line[..colon]).map_err(|_| malformed())?;
    let value = line[colon + 1..].trim_ascii_start();
    let value = HeaderValue::from_bytes(value).map_err(|_| malformed())?;
    Ok((name, value))
}
