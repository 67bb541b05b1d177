// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{RelayError, Result};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    /// Inventory entries. The brand-specific URL construction and spreadsheet
    /// ingestion this would normally come from are out of scope; this is a
    /// direct `(name, source)` list per the inventory-loader contract.
    pub cameras: Vec<CameraEntry>,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Pacing, encoding, and buffering parameters shared by every camera.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Hint for per-stream buffering; governs `buffer_size` reporting only.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,
    /// Producer pacing target. `frame_interval = 1 / target_fps`.
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// JPEG encoder quality, 0-100.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Per-client wait before falling back to a keep-alive frame.
    #[serde(default = "default_frame_timeout_secs")]
    pub frame_timeout_secs: f64,
    /// Bounded capacity of each client's delivery queue.
    #[serde(default = "default_client_queue_size")]
    pub client_queue_size: usize,
    /// Advisory cadence for keep-alive frames; `frame_timeout_secs` is the one
    /// bound the relay actually enforces (see SPEC_FULL.md §6a).
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: f64,
}

impl StreamConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.frame_timeout_secs.max(0.0))
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: default_max_buffer_size(),
            target_fps: default_target_fps(),
            jpeg_quality: default_jpeg_quality(),
            frame_timeout_secs: default_frame_timeout_secs(),
            client_queue_size: default_client_queue_size(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

fn default_max_buffer_size() -> usize {
    30
}
fn default_target_fps() -> u32 {
    30
}
fn default_jpeg_quality() -> u8 {
    85
}
fn default_frame_timeout_secs() -> f64 {
    30.0
}
fn default_client_queue_size() -> usize {
    10
}
fn default_keepalive_interval_secs() -> f64 {
    5.0
}

/// One inventory entry. `source` is the raw string per the inventory-loader
/// contract: the literal `"0"` denotes a webcam, anything else an RTSP URL.
#[derive(Debug, Deserialize, Clone)]
pub struct CameraEntry {
    pub name: String,
    pub source: String,
}

/// HTTP API configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: default_api_port() }
    }
}

fn default_api_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Cannot read config file: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cameras.is_empty() {
            return Err(RelayError::Config("No cameras defined".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for cam in &self.cameras {
            if cam.name.is_empty() {
                return Err(RelayError::Config("Camera name must not be empty".into()));
            }
            if !seen.insert(cam.name.as_str()) {
                return Err(RelayError::Config(format!("Duplicate camera name: {}", cam.name)));
            }
        }
        if self.stream.target_fps == 0 {
            return Err(RelayError::Config("target_fps must be > 0".into()));
        }
        Ok(())
    }
}
