// src/lib.rs

pub mod cli;
pub mod config;
pub mod convert;
pub mod errors;
pub mod exec;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{load_and_validate, ConfigFile};
use crate::server::AppState;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the job registry and request-handling state
/// - the HTTP accept loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;

    if let Some(listen) = args.listen {
        listen
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid --listen address '{listen}'"))?;
        cfg.server.listen = listen;
    }

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let listener = TcpListener::bind(&cfg.server.listen)
        .await
        .with_context(|| format!("binding {}", cfg.server.listen))?;

    let state = Arc::new(AppState::new(cfg));

    tokio::select! {
        res = server::serve(listener, state) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested, stopping");
            Ok(())
        }
    }
}

/// Simple dry-run output: print the resolved configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("convertd dry-run");
    println!("  server.listen = {}", cfg.server.listen);
    println!("  server.data_dir = {}", cfg.server.data_dir);
    println!("  convert.command = {}", cfg.convert.command);
    println!("  convert.upload_args = {:?}", cfg.convert.upload_args);
    println!("  convert.url_args = {:?}", cfg.convert.url_args);
    println!("  convert.timeout_ms = {}", cfg.convert.timeout_ms);
    println!("  convert.output_ext = {}", cfg.convert.output_ext);
}
