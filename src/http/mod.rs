// src/http/mod.rs

//! Minimal HTTP/1.1 plumbing over tokio streams.
//!
//! Just enough for this service: request-line + header parsing with a
//! `Content-Length` body (`request.rs`) and a small response writer
//! (`response.rs`). No chunked encoding, no multipart, no keep-alive.

pub mod request;
pub mod response;

pub use request::{Request, RequestError, MAX_BODY_BYTES};
pub use response::{Response, StatusCode};
