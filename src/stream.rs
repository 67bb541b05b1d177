// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Per-camera producer and fan-out. One [`CameraStream`] owns exactly one
//! upstream [`crate::frame_source::FrameSource`] and broadcasts each encoded
//! frame to every subscribed [`ClientSink`], never re-encoding per subscriber.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::encoder;
use crate::frame_source::FrameSourceOpener;

/// A resolved camera source, independent of any particular backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Webcam(u32),
    Rtsp(String),
}

/// One JPEG frame shared byte-for-byte across every subscriber (invariant I5).
pub type EncodedFrame = Bytes;

/// Per-client delivery channel. Dropping a `ClientSink` unsubscribes it from
/// the stream's broadcast set unconditionally, regardless of how the owning
/// HTTP response task ends (invariant I4), mirroring the teacher's
/// guard-on-drop cleanup pattern.
pub struct ClientSink {
    id: u64,
    rx: mpsc::Receiver<EncodedFrame>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ClientSink {
    /// Receive the next frame, or `None` once the stream has stopped and
    /// drained.
    pub async fn recv(&mut self) -> Option<EncodedFrame> {
        self.rx.recv().await
    }
}

impl Drop for ClientSink {
    fn drop(&mut self) {
        let mut subs = self.subscribers.lock();
        subs.retain(|s| s.id != self.id);
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<EncodedFrame>,
}

/// Snapshot of a camera's current condition, returned by [`CameraStream::status`].
#[derive(Debug, Clone)]
pub struct CameraStatus {
    pub name: String,
    pub running: bool,
    pub client_count: usize,
    pub buffer_size: usize,
    /// Seconds since the Unix epoch at the last successful encode, or `None`
    /// if this camera has never produced a frame.
    pub last_frame_time: Option<f64>,
}

struct LastFrame {
    frame: EncodedFrame,
    epoch_secs: f64,
}

struct SharedState {
    last_encoded: Mutex<Option<LastFrame>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    running: std::sync::atomic::AtomicBool,
}

/// Owns the producer task for one camera and the fan-out of its frames.
pub struct CameraStream {
    name: String,
    source: SourceRef,
    config: StreamConfig,
    opener: Arc<dyn FrameSourceOpener>,
    state: Arc<SharedState>,
    handle: RwLock<Option<JoinHandle<()>>>,
    next_client_id: AtomicU64,
}

impl CameraStream {
    pub fn new(name: String, source: SourceRef, config: StreamConfig, opener: Arc<dyn FrameSourceOpener>) -> Self {
        CameraStream {
            name,
            source,
            config,
            opener,
            state: Arc::new(SharedState {
                last_encoded: Mutex::new(None),
                subscribers: Arc::new(Mutex::new(Vec::new())),
                running: std::sync::atomic::AtomicBool::new(false),
            }),
            handle: RwLock::new(None),
            next_client_id: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw source string this camera was registered with, as reported
    /// in the HTTP status payload's `rtsp_url` field.
    pub fn source_label(&self) -> String {
        match &self.source {
            SourceRef::Rtsp(url) => url.clone(),
            SourceRef::Webcam(index) => index.to_string(),
        }
    }

    /// Spawn the producer task if it is not already running. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut guard = self.handle.write();
        if guard.is_some() {
            return;
        }
        self.state.running.store(true, Ordering::SeqCst);
        let this = Arc::clone(self);
        let handle = tokio::task::spawn_blocking(move || producer_loop(this));
        *guard = Some(handle);
        info!(camera = %self.name, "camera stream started");
    }

    /// Stop the producer task and await its exit, bounded by the caller's
    /// own timeout. Idempotent; a stream that was never started returns
    /// immediately.
    pub async fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);
        let handle = self.handle.write().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(camera = %self.name, error = %e, "producer task join failed");
            }
        }
        info!(camera = %self.name, "camera stream stopped");
    }

    pub async fn restart(self: &Arc<Self>) {
        self.stop().await;
        self.start();
    }

    /// Register a new client. Returns the last cached frame immediately (if
    /// any) so the first paint doesn't wait for the next producer tick.
    pub fn subscribe(&self) -> (ClientSink, Option<EncodedFrame>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.client_queue_size.max(1));
        self.state.subscribers.lock().push(Subscriber { id, tx });
        let cached = self.state.last_encoded.lock().as_ref().map(|l| l.frame.clone());
        debug!(camera = %self.name, client = id, "client subscribed");
        (
            ClientSink { id, rx, subscribers: Arc::clone(&self.state.subscribers) },
            cached,
        )
    }

    pub fn last_encoded(&self) -> Option<EncodedFrame> {
        self.state.last_encoded.lock().as_ref().map(|l| l.frame.clone())
    }

    pub fn status(&self) -> CameraStatus {
        let last_frame_time = self.state.last_encoded.lock().as_ref().map(|l| l.epoch_secs);
        CameraStatus {
            name: self.name.clone(),
            running: self.state.running.load(Ordering::SeqCst),
            client_count: self.state.subscribers.lock().len(),
            buffer_size: self.config.max_buffer_size,
            last_frame_time,
        }
    }
}

/// Runs on a dedicated blocking OS thread for the lifetime of one `start()`.
/// Opens the upstream source, then loops: read, encode, broadcast, pace. A
/// read or encode failure is transient and is retried after a short
/// backoff. An open failure is not: it logs and the task exits, leaving the
/// stream `running` but producing nothing until an external `restart`.
fn producer_loop(stream: Arc<CameraStream>) {
    let mut source = match stream.opener.open(&stream.source) {
        Ok(s) => s,
        Err(e) => {
            warn!(camera = %stream.name, error = %e, "failed to open upstream, producer exiting");
            return;
        }
    };

    let interval = stream.config.frame_interval();
    let quality = stream.config.jpeg_quality;

    while stream.state.running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        let frame = match source.read() {
            Ok(f) => f,
            Err(e) => {
                debug!(camera = %stream.name, error = %e, "read failed, backing off");
                std::thread::sleep(Duration::from_millis(200));
                continue;
            }
        };

        let encoded = match encoder::encode(&frame, quality) {
            Ok(e) => e,
            Err(e) => {
                debug!(camera = %stream.name, error = %e, "encode failed, skipping frame");
                continue;
            }
        };

        let epoch_secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64();
        *stream.state.last_encoded.lock() = Some(LastFrame { frame: encoded.clone(), epoch_secs });
        broadcast(&stream.state.subscribers, &encoded);

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}

/// Send one encoded frame to every subscriber without blocking. A full
/// client queue means a slow consumer; its frame is dropped, never the
/// producer (invariant I2/I3).
fn broadcast(subscribers: &Arc<Mutex<Vec<Subscriber>>>, frame: &EncodedFrame) {
    let subs = subscribers.lock();
    for sub in subs.iter() {
        if sub.tx.try_send(frame.clone()).is_err() {
            // full queue (slow consumer) or closed (client gone, cleaned up on Drop)
        }
    }
}
