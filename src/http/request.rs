// src/http/request.rs

use std::collections::HashMap;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Largest accepted request body. Uploads above this are rejected with 413.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const MAX_HEADERS: usize = 64;

/// Largest accepted request line or header line. A client streaming bytes
/// with no newline must not grow our buffer without limit.
const MAX_LINE_BYTES: usize = 8 * 1024;

/// Why a request could not be parsed.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a request line was read")]
    Empty,

    #[error("malformed request line '{0}'")]
    MalformedRequestLine(String),

    #[error("malformed header line '{0}'")]
    MalformedHeader(String),

    #[error("invalid Content-Length header")]
    InvalidContentLength,

    #[error("request body too large ({0} bytes)")]
    BodyTooLarge(usize),

    #[error("too many request headers")]
    TooManyHeaders,

    #[error("request line or header too long")]
    LineTooLong,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// True when the fault is the client's (maps to 4xx rather than 5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RequestError::Io(_))
    }
}

/// A parsed HTTP/1.x request: request line, query string, headers, body.
///
/// Deliberately minimal; no chunked transfer encoding, no multipart. The
/// body is read eagerly based on `Content-Length`.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    /// Path component of the target, without the query string.
    pub path: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// Read and parse a single request from the connection.
    pub async fn read_from<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Request, RequestError> {
        let request_line = read_line(reader).await?;
        if request_line.is_empty() {
            return Err(RequestError::Empty);
        }

        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| RequestError::MalformedRequestLine(request_line.clone()))?
            .to_string();
        let target = parts
            .next()
            .ok_or_else(|| RequestError::MalformedRequestLine(request_line.clone()))?;
        // The version token must be present even though we don't branch on it.
        parts
            .next()
            .ok_or_else(|| RequestError::MalformedRequestLine(request_line.clone()))?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (target.to_string(), Vec::new()),
        };

        let mut headers = HashMap::new();
        loop {
            let line = read_line(reader).await?;
            if line.is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADERS {
                return Err(RequestError::TooManyHeaders);
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestError::MalformedHeader(line.clone()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let content_length = match headers.get("content-length") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength)?,
            None => 0,
        };
        if content_length > MAX_BODY_BYTES {
            return Err(RequestError::BodyTooLarge(content_length));
        }

        let mut body = vec![0u8; content_length];
        if content_length > 0 {
            reader.read_exact(&mut body).await?;
        }

        Ok(Request {
            method,
            path,
            query,
            headers,
            body,
        })
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Read one CRLF-terminated line, returning it without the terminator.
///
/// The read is capped at [`MAX_LINE_BYTES`]; a line that long with no
/// newline in sight is rejected rather than buffered.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, RequestError> {
    let mut buf = Vec::new();
    let mut limited = reader.take((MAX_LINE_BYTES + 1) as u64);
    limited.read_until(b'\n', &mut buf).await?;
    if buf.len() > MAX_LINE_BYTES {
        return Err(RequestError::LineTooLong);
    }

    let mut line = String::from_utf8_lossy(&buf).into_owned();
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (url_decode(key), url_decode(value))
        })
        .collect()
}

/// Minimal percent-decoding: `%XX` escapes and `+` as space. Invalid
/// escapes are kept verbatim.
fn url_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
