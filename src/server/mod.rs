// src/server/mod.rs

//! HTTP service: accept loop, routing, and shared request-handling state.
//!
//! One tokio task per connection, one request per connection. Handlers never
//! wait for a job to settle; registration replies immediately with the job
//! identifier and polling reports a snapshot.

pub mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::http::{Request, RequestError, Response, StatusCode};
use crate::jobs::JobRegistry;

/// State threaded through every request handler.
///
/// The job registry is the shared mutable state of the core; the output-map
/// is HTTP-layer bookkeeping so a finished job can point the client at its
/// converted file.
pub struct AppState {
    pub config: ConfigFile,
    pub registry: JobRegistry,
    outputs: Mutex<HashMap<String, String>>,
}

impl AppState {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            registry: JobRegistry::new(),
            outputs: Mutex::new(HashMap::new()),
        }
    }

    /// Remember the follow-up resource location for a job whose result is a
    /// file under `/files/`.
    fn record_output(&self, job_id: &str, location: String) {
        self.outputs
            .lock()
            .unwrap()
            .insert(job_id.to_string(), location);
    }

    fn output_location(&self, job_id: &str) -> Option<String> {
        self.outputs.lock().unwrap().get(job_id).cloned()
    }
}

/// Accept connections until the listener fails or the task is dropped.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(error = %err, "failed to accept connection");
                continue;
            }
        };

        debug!(%peer, "accepted connection");
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, state).await {
                debug!(%peer, error = %err, "connection error");
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<AppState>) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let response = match Request::read_from(&mut reader).await {
        Ok(request) => route(&request, &state).await,
        // Client connected and went away without sending anything.
        Err(RequestError::Empty) => return Ok(()),
        Err(err @ RequestError::BodyTooLarge(_)) => {
            Response::error(StatusCode::PayloadTooLarge, &err.to_string())
        }
        Err(err) if err.is_client_error() => {
            Response::error(StatusCode::BadRequest, &err.to_string())
        }
        Err(err) => {
            error!(error = %err, "failed to read request");
            Response::error(StatusCode::InternalServerError, "failed to read request")
        }
    };

    response.write_to(&mut write_half).await?;
    Ok(())
}

/// Dispatch a parsed request to its handler.
pub async fn route(request: &Request, state: &AppState) -> Response {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/convert/upload") => handlers::convert_upload(request, state).await,
        ("POST", "/convert/url") => handlers::convert_url(request, state).await,
        (method, path) => {
            if let Some(id) = path.strip_prefix("/jobs/") {
                return if method == "GET" {
                    handlers::job_status(id, state)
                } else {
                    Response::error(StatusCode::MethodNotAllowed, "use GET")
                };
            }
            if let Some(name) = path.strip_prefix("/files/") {
                return if method == "GET" {
                    handlers::serve_file(name, state).await
                } else {
                    Response::error(StatusCode::MethodNotAllowed, "use GET")
                };
            }
            Response::error(StatusCode::NotFound, "no such endpoint")
        }
    }
}
