// src/http/response.rs

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// The subset of HTTP status codes this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    Accepted,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalServerError,
    BadGateway,
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Accepted => 202,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }
}

/// An HTTP response ready to be written to the connection.
///
/// Connections are single-request: every response carries
/// `Connection: close`.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Response {
    /// JSON response from a `serde_json::Value`.
    pub fn json(status: StatusCode, body: serde_json::Value) -> Response {
        Response {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    /// JSON error payload: `{"error": "<message>"}`.
    pub fn error(status: StatusCode, message: &str) -> Response {
        Response::json(status, serde_json::json!({ "error": message }))
    }

    /// Raw file bytes with an explicit content type.
    pub fn file(content_type: &'static str, body: Vec<u8>) -> Response {
        Response {
            status: StatusCode::Ok,
            content_type,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialise head and body to the connection.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> std::io::Result<()> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.as_u16(),
            self.status.reason(),
            self.content_type,
            self.body.len(),
        );
        writer.write_all(head.as_bytes()).await?;
        writer.write_all(&self.body).await?;
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_status_line_and_content_length() {
        let resp = Response::json(StatusCode::Accepted, serde_json::json!({ "job": "abc" }));
        let mut out = Vec::new();
        resp.write_to(&mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 202 Accepted\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("{\"job\":\"abc\"}"));
    }

    #[test]
    fn error_payload_wraps_message() {
        let resp = Response::error(StatusCode::NotFound, "unknown job");
        assert_eq!(resp.status(), StatusCode::NotFound);
        assert_eq!(resp.body(), b"{\"error\":\"unknown job\"}");
    }
}
