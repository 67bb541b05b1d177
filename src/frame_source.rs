// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! Opaque frame capture — GStreamer pipeline per camera.
//!
//! Each source runs a pipeline decoding into raw RGB8:
//!   rtspsrc → decodebin → videoconvert → appsink   (RTSP)
//!   v4l2src → videoconvert → appsink                (webcam)
//!
//! `open()` and `read()` are both synchronous and block the calling thread;
//! callers run them on a dedicated OS thread (`tokio::task::spawn_blocking`)
//! rather than the async runtime, matching SPEC_FULL.md §4.1a.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::stream::SourceRef;

const APPSINK_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// A decoded frame, opaque to everything but the encoder.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGB8 rows, length `width * height * 3`.
    pub rgb: bytes::Bytes,
}

/// Capture handle yielding decoded frames from one camera source.
pub trait FrameSource: Send {
    /// Block until the next decoded frame is available, or a transient error.
    fn read(&mut self) -> Result<Frame>;
}

/// Opens a [`FrameSource`] for a [`SourceRef`]. Injected into [`crate::stream::CameraStream`]
/// so tests can substitute a deterministic fixture for the real GStreamer backend.
pub trait FrameSourceOpener: Send + Sync {
    fn open(&self, source: &SourceRef) -> Result<Box<dyn FrameSource>>;
}

/// Production opener backed by GStreamer.
#[derive(Debug, Default, Clone, Copy)]
pub struct GstOpener;

impl FrameSourceOpener for GstOpener {
    fn open(&self, source: &SourceRef) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(GstFrameSource::open(source)?))
    }
}

/// GStreamer-backed [`FrameSource`]. Runs the pipeline on GStreamer's own
/// streaming threads; frames cross into this struct's owning thread via a
/// bounded channel fed from the appsink callback.
pub struct GstFrameSource {
    pipeline: gst::Pipeline,
    rx: mpsc::Receiver<Frame>,
}

impl GstFrameSource {
    pub fn open(source: &SourceRef) -> Result<Self> {
        gst::init().map_err(|e| RelayError::Open(format!("gst::init: {e}")))?;

        let pipeline_str = match source {
            SourceRef::Rtsp(url) => format!(
                "rtspsrc location={url} protocols=tcp latency=0 ! decodebin ! videoconvert ! \
                 video/x-raw,format=RGB ! appsink name=sink emit-signals=true max-buffers=1 drop=true sync=false",
            ),
            SourceRef::Webcam(index) => format!(
                "v4l2src device=/dev/video{index} ! videoconvert ! video/x-raw,format=RGB ! \
                 appsink name=sink emit-signals=true max-buffers=1 drop=true sync=false",
            ),
        };

        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| RelayError::Open(format!("parse_launch: {e}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| RelayError::Open("not a pipeline".into()))?;

        let appsink: gst_app::AppSink = pipeline
            .by_name("sink")
            .ok_or_else(|| RelayError::Open("appsink not found".into()))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| RelayError::Open("cast to AppSink failed".into()))?;

        let (tx, rx) = mpsc::channel::<Frame>();

        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gst::FlowError::Error)?;
                    let video_info = gstreamer_video::VideoInfo::from_caps(caps)
                        .map_err(|_| gst::FlowError::Error)?;
                    let buf = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buf.map_readable().map_err(|_| gst::FlowError::Error)?;
                    let frame = Frame {
                        width: video_info.width(),
                        height: video_info.height(),
                        rgb: bytes::Bytes::copy_from_slice(map.as_slice()),
                    };
                    // Non-blocking: if the reader thread went away we simply stop delivering.
                    let _ = tx.send(frame);
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RelayError::Open(format!("set_state Playing: {e}")))?;

        info!(?source, "frame source opened");

        Ok(GstFrameSource { pipeline, rx })
    }
}

impl FrameSource for GstFrameSource {
    fn read(&mut self) -> Result<Frame> {
        match self.rx.recv_timeout(APPSINK_RECV_TIMEOUT) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(RelayError::Read("no frame within timeout".into())),
            Err(RecvTimeoutError::Disconnected) => Err(RelayError::Read("pipeline closed".into())),
        }
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
