// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Frame source open failed: {0}")]
    Open(String),

    #[error("Frame source read failed: {0}")]
    Read(String),

    #[error("JPEG encode failed: {0}")]
    Encode(String),

    #[error("Camera '{name}' not found")]
    CameraNotFound { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
