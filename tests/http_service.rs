#![cfg(unix)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use convertd::config::ConfigFile;
use convertd::server::{serve, AppState};

async fn start_service(cfg: ConfigFile) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::new(AppState::new(cfg))));
    addr
}

async fn send(addr: SocketAddr, raw: Vec<u8>) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&raw).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

fn get(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\n\r\n").into_bytes()
}

fn body_of(response: &str) -> &str {
    response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("")
}

fn job_id_of(response: &str) -> String {
    let body: serde_json::Value = serde_json::from_str(body_of(response)).unwrap();
    body["job"].as_str().expect("job id in response").to_string()
}

/// Poll `/jobs/<id>` until it leaves `pending`, with a deadline.
async fn poll_until_settled(addr: SocketAddr, id: &str) -> serde_json::Value {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let response = send(addr, get(&format!("/jobs/{id}"))).await;
        let body: serde_json::Value = serde_json::from_str(body_of(&response)).unwrap();
        if body["status"] != "pending" {
            return body;
        }
        assert!(Instant::now() < deadline, "job {id} never settled");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn test_config(data_dir: &std::path::Path, upload_script: &str) -> ConfigFile {
    let mut cfg = ConfigFile::default();
    cfg.server.data_dir = data_dir.to_string_lossy().into_owned();
    cfg.convert.command = "/bin/sh".to_string();
    cfg.convert.upload_args = vec!["-c".to_string(), upload_script.to_string()];
    cfg.convert.output_ext = "txt".to_string();
    cfg.convert.timeout_ms = 10_000;
    cfg
}

#[tokio::test]
async fn upload_convert_poll_download_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "cp {input} {output}");
    let addr = start_service(cfg).await;

    let payload = b"document contents";
    let head = format!(
        "POST /convert/upload?name=doc.md HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
        payload.len()
    );
    let mut raw = head.into_bytes();
    raw.extend_from_slice(payload);

    let response = send(addr, raw).await;
    assert!(response.starts_with("HTTP/1.1 202"), "got: {response}");
    let id = job_id_of(&response);

    let settled = poll_until_settled(addr, &id).await;
    assert_eq!(settled["status"], "finished");
    assert_eq!(settled["output"], "/files/doc.txt");

    let file_response = send(addr, get("/files/doc.txt")).await;
    assert!(file_response.starts_with("HTTP/1.1 200"), "got: {file_response}");
    assert!(file_response.ends_with("document contents"));
}

#[tokio::test]
async fn failing_conversion_is_reported_to_the_poller() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "true {input} {output}; exit 3");
    let addr = start_service(cfg).await;

    let raw = b"POST /convert/upload?name=doc.md HTTP/1.1\r\nContent-Length: 1\r\n\r\nx".to_vec();
    let response = send(addr, raw).await;
    let id = job_id_of(&response);

    let settled = poll_until_settled(addr, &id).await;
    assert_eq!(settled["status"], "failed");
    assert!(settled["error"].as_str().unwrap().contains("code 3"));
}

#[tokio::test]
async fn unknown_job_is_a_client_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "cp {input} {output}");
    let addr = start_service(cfg).await;

    let response = send(addr, get("/jobs/not-a-job")).await;
    assert!(response.starts_with("HTTP/1.1 404"), "got: {response}");
}

#[tokio::test]
async fn upload_without_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "cp {input} {output}");
    let addr = start_service(cfg).await;

    let raw = b"POST /convert/upload HTTP/1.1\r\nContent-Length: 1\r\n\r\nx".to_vec();
    let response = send(addr, raw).await;
    assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
}

#[tokio::test]
async fn path_traversal_in_file_requests_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path(), "cp {input} {output}");
    let addr = start_service(cfg).await;

    let response = send(addr, get("/files/..")).await;
    assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
}

#[tokio::test]
async fn url_conversion_registers_a_job() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path(), "cp {input} {output}");
    // The "tool" ignores the URL and writes a fixed result.
    cfg.convert.url_args = vec![
        "-c".to_string(),
        "printf converted > {output} # {url}".to_string(),
    ];
    let addr = start_service(cfg).await;

    let raw = b"POST /convert/url?src=https%3A%2F%2Fexample.com%2Fpage.html HTTP/1.1\r\n\r\n".to_vec();
    let response = send(addr, raw).await;
    assert!(response.starts_with("HTTP/1.1 202"), "got: {response}");
    let id = job_id_of(&response);

    let settled = poll_until_settled(addr, &id).await;
    assert_eq!(settled["status"], "finished");
    assert_eq!(settled["output"], "/files/page.txt");
}
