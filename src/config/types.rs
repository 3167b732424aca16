use brakewatch_common::paths::{ExtensionMatcher, DEFAULT_MEDIA_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the browsing UI (`index.html` plus assets)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("/static/")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Directory watched for newly arrived media files
    #[serde(default)]
    pub input_dir: PathBuf,

    /// Directory receiving finished transcodes
    #[serde(default)]
    pub output_dir: PathBuf,

    /// Media library browsed by the UI and symlinked into `input_dir` on enqueue
    #[serde(default)]
    pub source_dir: PathBuf,

    /// Delete the source file once its job has finished
    #[serde(default = "default_delete_on_completion")]
    pub delete_on_completion: bool,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_delete_on_completion() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    DEFAULT_MEDIA_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            source_dir: PathBuf::new(),
            delete_on_completion: default_delete_on_completion(),
            extensions: default_extensions(),
        }
    }
}

impl WatchConfig {
    /// Build the shared extension matcher for this configuration.
    pub fn matcher(&self) -> ExtensionMatcher {
        ExtensionMatcher::new(&self.extensions)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscoderConfig {
    /// Program to run; looked up on PATH when not absolute
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Extension given to every transcoded file
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Where the transcoder writes before the result is moved to the output dir.
    /// Defaults to the OS temp directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_program() -> String {
    "HandBrakeCLI".to_string()
}
fn default_preset() -> String {
    "iPad".to_string()
}
fn default_output_extension() -> String {
    "m4v".to_string()
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            preset: default_preset(),
            output_extension: default_output_extension(),
            temp_dir: None,
        }
    }
}

impl TranscoderConfig {
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
