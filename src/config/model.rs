// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::DEFAULT_TIMEOUT_MS;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// listen = "127.0.0.1:8375"
/// data_dir = "./data"
///
/// [convert]
/// command = "pandoc"
/// upload_args = ["{input}", "-o", "{output}"]
/// url_args = ["{url}", "-o", "{output}"]
/// timeout_ms = 60000
/// output_ext = "pdf"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// HTTP listener settings from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Conversion tool settings from `[convert]`.
    #[serde(default)]
    pub convert: ConvertSection,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Address to bind, e.g. `127.0.0.1:8375`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory under which `uploads/` and `out/` are created.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_listen() -> String {
    "127.0.0.1:8375".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: default_data_dir(),
        }
    }
}

impl ServerSection {
    /// Directory uploaded source documents are written to.
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("uploads")
    }

    /// Directory the conversion tool writes results to; served under
    /// `/files/`.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("out")
    }
}

/// `[convert]` section.
///
/// The argument templates contain `{input}`, `{output}` and `{url}`
/// placeholders; each rendered argument is passed to the tool verbatim, no
/// shell is involved.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertSection {
    /// Conversion tool executable. Not validated here; a missing binary
    /// surfaces as a spawn error on the job.
    #[serde(default = "default_command")]
    pub command: String,

    /// Argument template for file-upload conversions.
    #[serde(default = "default_upload_args")]
    pub upload_args: Vec<String>,

    /// Argument template for URL conversions.
    #[serde(default = "default_url_args")]
    pub url_args: Vec<String>,

    /// Per-job timeout in milliseconds. `0` means the built-in default of
    /// 60 seconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extension given to converted output files.
    #[serde(default = "default_output_ext")]
    pub output_ext: String,
}

fn default_command() -> String {
    "pandoc".to_string()
}

fn default_upload_args() -> Vec<String> {
    vec!["{input}".to_string(), "-o".to_string(), "{output}".to_string()]
}

fn default_url_args() -> Vec<String> {
    vec!["{url}".to_string(), "-o".to_string(), "{output}".to_string()]
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_output_ext() -> String {
    "pdf".to_string()
}

impl Default for ConvertSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            upload_args: default_upload_args(),
            url_args: default_url_args(),
            timeout_ms: default_timeout_ms(),
            output_ext: default_output_ext(),
        }
    }
}
