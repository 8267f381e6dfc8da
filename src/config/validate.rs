// src/config/validate.rs

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - `[server].listen` parses as a socket address
/// - `[server].data_dir` is non-empty
/// - `[convert].command` is non-empty
/// - `upload_args` references `{input}` and `{output}`
/// - `url_args` references `{url}` and `{output}`
/// - `[convert].output_ext` is a plain extension (non-empty, no separators)
///
/// It does **not** check that the conversion tool exists; that surfaces as
/// a spawn error on the first job.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_server(cfg)?;
    validate_convert(cfg)?;
    Ok(())
}

fn validate_server(cfg: &ConfigFile) -> Result<()> {
    cfg.server
        .listen
        .parse::<SocketAddr>()
        .map(|_| ())
        .with_context(|| format!("invalid [server].listen address '{}'", cfg.server.listen))?;

    if cfg.server.data_dir.trim().is_empty() {
        return Err(anyhow!("[server].data_dir must not be empty"));
    }

    Ok(())
}

fn validate_convert(cfg: &ConfigFile) -> Result<()> {
    if cfg.convert.command.trim().is_empty() {
        return Err(anyhow!("[convert].command must not be empty"));
    }

    require_placeholder(&cfg.convert.upload_args, "{input}", "upload_args")?;
    require_placeholder(&cfg.convert.upload_args, "{output}", "upload_args")?;
    require_placeholder(&cfg.convert.url_args, "{url}", "url_args")?;
    require_placeholder(&cfg.convert.url_args, "{output}", "url_args")?;

    let ext = &cfg.convert.output_ext;
    if ext.is_empty() || ext.contains('/') || ext.contains('\\') || ext.contains('.') {
        return Err(anyhow!(
            "[convert].output_ext must be a plain extension, got '{}'",
            ext
        ));
    }

    Ok(())
}

fn require_placeholder(template: &[String], placeholder: &str, field: &str) -> Result<()> {
    if template.iter().any(|arg| arg.contains(placeholder)) {
        Ok(())
    } else {
        Err(anyhow!(
            "[convert].{} must reference the {} placeholder",
            field,
            placeholder
        ))
    }
}
