// src/server/handlers.rs

//! Request handlers: start a conversion, poll a job, fetch a result file.

use std::path::Path;

use serde_json::json;
use tracing::{error, info};

use crate::convert::{name_from_url, output_name, render_args};
use crate::exec::{self, OperationState, RunSpec};
use crate::http::{Request, Response, StatusCode};
use crate::server::AppState;

/// `POST /convert/upload?name=<file>` — the raw request body is the source
/// document. Writes it under the upload directory, launches the conversion
/// tool, and replies with the job identifier without waiting for the result.
pub async fn convert_upload(request: &Request, state: &AppState) -> Response {
    let Some(name) = request.query_param("name") else {
        return Response::error(StatusCode::BadRequest, "missing required parameter: name");
    };
    if !is_safe_name(name) {
        return Response::error(StatusCode::BadRequest, "invalid file name");
    }
    if request.body.is_empty() {
        return Response::error(StatusCode::BadRequest, "empty upload body");
    }

    let upload_dir = state.config.server.upload_dir();
    if let Err(err) = tokio::fs::create_dir_all(&upload_dir).await {
        error!(error = %err, "failed to create upload directory");
        return Response::error(StatusCode::InternalServerError, "failed to store upload");
    }

    let input_path = upload_dir.join(name);
    if let Err(err) = tokio::fs::write(&input_path, &request.body).await {
        error!(error = %err, path = ?input_path, "failed to write upload");
        return Response::error(StatusCode::InternalServerError, "failed to store upload");
    }

    let out_name = output_name(name, &state.config.convert.output_ext);
    let Some(output_path) = prepare_output_path(state, &out_name).await else {
        return Response::error(StatusCode::InternalServerError, "failed to prepare output");
    };

    let input = input_path.to_string_lossy();
    let args = render_args(
        &state.config.convert.upload_args,
        &[("input", input.as_ref()), ("output", output_path.as_str())],
    );

    start_job(state, args, &out_name)
}

/// `POST /convert/url?src=<url>&name=<out>` — hands the URL to the
/// conversion tool; the tool does the fetching.
pub async fn convert_url(request: &Request, state: &AppState) -> Response {
    let Some(src) = request.query_param("src") else {
        return Response::error(StatusCode::BadRequest, "missing required parameter: src");
    };
    if !(src.starts_with("http://") || src.starts_with("https://")) {
        return Response::error(StatusCode::BadRequest, "src must be an http(s) URL");
    }

    let name = match request.query_param("name") {
        Some(name) => name.to_string(),
        None => name_from_url(src),
    };
    if !is_safe_name(&name) {
        return Response::error(StatusCode::BadRequest, "invalid file name");
    }

    let out_name = output_name(&name, &state.config.convert.output_ext);
    let Some(output_path) = prepare_output_path(state, &out_name).await else {
        return Response::error(StatusCode::InternalServerError, "failed to prepare output");
    };

    let args = render_args(
        &state.config.convert.url_args,
        &[("url", src), ("output", output_path.as_str())],
    );

    start_job(state, args, &out_name)
}

/// `GET /jobs/<id>` — report a snapshot of the job's settlement state.
pub fn job_status(id: &str, state: &AppState) -> Response {
    let Some(op) = state.registry.lookup(id) else {
        return Response::error(StatusCode::NotFound, "unknown job");
    };

    match op.state() {
        OperationState::Pending => Response::json(StatusCode::Ok, json!({ "status": "pending" })),
        OperationState::Succeeded(_) => {
            let mut body = json!({ "status": "finished" });
            if let Some(location) = state.output_location(id) {
                body["output"] = json!(location);
            }
            Response::json(StatusCode::Ok, body)
        }
        OperationState::Failed(err) => Response::json(
            StatusCode::BadGateway,
            json!({ "status": "failed", "error": err.to_string() }),
        ),
    }
}

/// `GET /files/<name>` — serve a converted output file.
pub async fn serve_file(name: &str, state: &AppState) -> Response {
    if !is_safe_name(name) {
        return Response::error(StatusCode::BadRequest, "invalid file name");
    }

    let path = state.config.server.output_dir().join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Response::file(content_type_for(name), bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Response::error(StatusCode::NotFound, "no such file")
        }
        Err(err) => {
            error!(error = %err, path = ?path, "failed to read output file");
            Response::error(StatusCode::InternalServerError, "failed to read file")
        }
    }
}

/// Launch the conversion process, register it, and reply with the job id.
fn start_job(state: &AppState, args: Vec<String>, out_name: &str) -> Response {
    let spec = RunSpec {
        command: state.config.convert.command.clone(),
        args,
        timeout_ms: state.config.convert.timeout_ms,
    };

    let op = exec::run(spec);
    let id = state.registry.register(op);
    state.record_output(&id, format!("/files/{out_name}"));

    info!(job = %id, output = %out_name, "conversion job started");
    Response::json(StatusCode::Accepted, json!({ "job": id }))
}

async fn prepare_output_path(state: &AppState, out_name: &str) -> Option<String> {
    let out_dir = state.config.server.output_dir();
    if let Err(err) = tokio::fs::create_dir_all(&out_dir).await {
        error!(error = %err, "failed to create output directory");
        return None;
    }
    Some(out_dir.join(out_name).to_string_lossy().into_owned())
}

/// A client-supplied name must stay inside its directory: a single path
/// component, no traversal.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).components().count() == 1
}

fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("html") | Some("htm") => "text/html",
        Some("txt") | Some("md") => "text/plain",
        Some("epub") => "application/epub+zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use crate::exec::{ExecError, SettleCell};

    fn state() -> AppState {
        AppState::new(ConfigFile::default())
    }

    #[test]
    fn safe_name_rejects_traversal() {
        assert!(is_safe_name("report.md"));
        assert!(is_safe_name("a b.pdf"));
        assert!(!is_safe_name(""));
        assert!(!is_safe_name(".."));
        assert!(!is_safe_name("../etc/passwd"));
        assert!(!is_safe_name("a/b"));
        assert!(!is_safe_name("a\\b"));
    }

    #[test]
    fn unknown_job_is_not_found() {
        let state = state();
        let resp = job_status("no-such-id", &state);
        assert_eq!(resp.status(), StatusCode::NotFound);
    }

    #[test]
    fn pending_job_reports_pending() {
        let state = state();
        let (_cell, op) = SettleCell::new();
        let id = state.registry.register(op);

        let resp = job_status(&id, &state);
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.body(), b"{\"status\":\"pending\"}");
    }

    #[test]
    fn finished_job_reports_output_location() {
        let state = state();
        let (cell, op) = SettleCell::new();
        let id = state.registry.register(op);
        state.record_output(&id, "/files/report.pdf".to_string());
        cell.settle(OperationState::Succeeded("done".into()));

        let resp = job_status(&id, &state);
        assert_eq!(resp.status(), StatusCode::Ok);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "finished");
        assert_eq!(body["output"], "/files/report.pdf");
    }

    #[test]
    fn failed_job_reports_error_message() {
        let state = state();
        let (cell, op) = SettleCell::new();
        let id = state.registry.register(op);
        cell.settle(OperationState::Failed(ExecError::NonZeroExit { code: 3 }));

        let resp = job_status(&id, &state);
        assert_eq!(resp.status(), StatusCode::BadGateway);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "failed");
        assert!(body["error"].as_str().unwrap().contains("code 3"));
    }
}
