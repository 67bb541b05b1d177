// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Inventory loader — turns configured `(name, source)` pairs into
//! `(name, SourceRef)` pairs for [`crate::manager::StreamManager::add`].
//!
//! The spreadsheet ingestion and per-brand RTSP URL construction this would
//! normally sit behind are out of scope; this module implements only the
//! contract the core depends on.

use crate::config::Config;
use crate::stream::SourceRef;

/// Decode one inventory entry's raw source string.
///
/// The literal string `"0"` denotes `Webcam(0)`; any other string is treated
/// as an RTSP URL.
pub fn resolve_source(raw: &str) -> SourceRef {
    if raw == "0" {
        SourceRef::Webcam(0)
    } else {
        SourceRef::Rtsp(raw.to_string())
    }
}

/// Resolve every camera entry in `config` into `(name, SourceRef)` pairs.
pub fn load(config: &Config) -> Vec<(String, SourceRef)> {
    config
        .cameras
        .iter()
        .map(|entry| (entry.name.clone(), resolve_source(&entry.source)))
        .collect()
}
