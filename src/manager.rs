// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Top-level manager: one [`crate::stream::CameraStream`] per camera, keyed
//! by name. Supports dynamic add/remove and a bounded-time shutdown of every
//! stream at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::StreamConfig;
use crate::error::{RelayError, Result};
use crate::frame_source::FrameSourceOpener;
use crate::stream::{CameraStatus, CameraStream, SourceRef};

/// Owns every active [`CameraStream`] and the config shared by all of them.
pub struct StreamManager {
    streams: RwLock<HashMap<String, Arc<CameraStream>>>,
    stream_config: StreamConfig,
    opener: Arc<dyn FrameSourceOpener>,
}

impl StreamManager {
    pub fn new(stream_config: StreamConfig, opener: Arc<dyn FrameSourceOpener>) -> Self {
        StreamManager {
            streams: RwLock::new(HashMap::new()),
            stream_config,
            opener,
        }
    }

    /// Register and start a camera. Idempotent on re-add: if `name` is
    /// already registered, the existing stream is returned unchanged.
    pub fn add(&self, name: String, source: SourceRef) -> Arc<CameraStream> {
        let mut streams = self.streams.write();
        if let Some(existing) = streams.get(&name) {
            return Arc::clone(existing);
        }
        let stream = Arc::new(CameraStream::new(
            name.clone(),
            source,
            self.stream_config.clone(),
            Arc::clone(&self.opener),
        ));
        stream.start();
        info!(camera = %name, "camera registered");
        streams.insert(name, Arc::clone(&stream));
        stream
    }

    /// Stop and drop a camera. Any subscribed clients see their sink close.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let stream = self.streams.write().remove(name).ok_or_else(|| RelayError::CameraNotFound {
            name: name.to_string(),
        })?;
        stream.stop().await;
        info!(camera = %name, "camera removed");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CameraStream>> {
        self.streams.read().get(name).cloned()
    }

    pub fn status(&self, name: &str) -> Result<CameraStatus> {
        self.get(name)
            .map(|s| s.status())
            .ok_or_else(|| RelayError::CameraNotFound { name: name.to_string() })
    }

    pub fn status_all(&self) -> Vec<CameraStatus> {
        self.streams.read().values().map(|s| s.status()).collect()
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        let stream = self.get(name).ok_or_else(|| RelayError::CameraNotFound { name: name.to_string() })?;
        stream.restart().await;
        Ok(())
    }

    /// Stop every stream concurrently, bounded by `timeout`. Streams that
    /// don't finish in time are abandoned — the process is about to exit
    /// regardless (spec's bounded-shutdown requirement).
    pub async fn stop_all(&self, timeout: Duration) {
        let streams: Vec<Arc<CameraStream>> = self.streams.write().drain().map(|(_, s)| s).collect();
        let stops = streams.iter().map(|s| s.stop());
        if tokio::time::timeout(timeout, join_all(stops)).await.is_err() {
            warn!("shutdown timed out before all camera streams stopped");
        }
        info!("stream manager shut down");
    }
}
