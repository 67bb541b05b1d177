// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Shared test fixtures: deterministic fakes, no mocking framework.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use camera_relay::config::StreamConfig;
use camera_relay::error::{RelayError, Result};
use camera_relay::frame_source::{Frame, FrameSource, FrameSourceOpener};
use camera_relay::stream::SourceRef;

/// Deterministic counter-tagged frames, no real I/O. Counter encodes frame
/// identity in the red channel so tests can assert all subscribers saw the
/// same bytes for a given tick.
pub struct CountingSource {
    counter: Arc<AtomicU32>,
}

impl FrameSource for CountingSource {
    fn read(&mut self) -> Result<Frame> {
        std::thread::sleep(Duration::from_millis(5));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Frame {
            width: 4,
            height: 4,
            rgb: vec![(n % 256) as u8; 4 * 4 * 3].into(),
        })
    }
}

pub struct CountingOpener;

impl FrameSourceOpener for CountingOpener {
    fn open(&self, _source: &SourceRef) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(CountingSource { counter: Arc::new(AtomicU32::new(0)) }))
    }
}

/// A source that always fails to open, to exercise the exit-on-open-failure path.
pub struct NeverOpens;

impl FrameSourceOpener for NeverOpens {
    fn open(&self, _source: &SourceRef) -> Result<Box<dyn FrameSource>> {
        Err(RelayError::Open("simulated upstream down".into()))
    }
}

pub fn fast_config() -> StreamConfig {
    StreamConfig {
        max_buffer_size: 30,
        target_fps: 100,
        jpeg_quality: 80,
        frame_timeout_secs: 2.0,
        client_queue_size: 4,
        keepalive_interval_secs: 1.0,
    }
}
