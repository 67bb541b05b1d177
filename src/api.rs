// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! HTTP API.
//!
//! Endpoints:
//!   GET  /video_feed/{camera}          → multipart/x-mixed-replace MJPEG stream
//!   GET  /api/status                   → system-wide status (JSON)
//!   GET  /api/cameras/{camera}/status  → status for one camera (JSON)
//!   POST /api/cameras/{camera}/restart → restart one camera's producer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::encoder;
use crate::manager::StreamManager;
use crate::stream::CameraStatus;

const BOUNDARY: &str = "frame";

/// Shared state passed to all handlers.
pub struct AppState {
    pub manager: Arc<StreamManager>,
    pub frame_timeout: Duration,
}

/// One camera's entry inside the aggregate `/api/status` map.
#[derive(Serialize)]
struct CameraStatusEntry {
    clients: usize,
    buffer_size: usize,
    is_running: bool,
    last_frame_time: Option<f64>,
}

impl From<CameraStatus> for CameraStatusEntry {
    fn from(s: CameraStatus) -> Self {
        CameraStatusEntry {
            clients: s.client_count,
            buffer_size: s.buffer_size,
            is_running: s.running,
            last_frame_time: s.last_frame_time,
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    system: &'static str,
    status: &'static str,
    total_cameras: usize,
    total_clients: usize,
    cameras: HashMap<String, CameraStatusEntry>,
}

/// Full response body for `/api/cameras/{name}/status`.
#[derive(Serialize)]
struct SingleCameraStatusResponse {
    camera_name: String,
    rtsp_url: String,
    is_running: bool,
    clients: usize,
    buffer_size: usize,
    last_frame_time: Option<f64>,
}

#[derive(Serialize)]
struct RestartResponse {
    message: String,
    status: &'static str,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/video_feed/{camera}", get(handle_video_feed))
        .route("/api/status", get(handle_status))
        .route("/api/cameras/{camera}/status", get(handle_camera_status))
        .route("/api/cameras/{camera}/restart", post(handle_restart))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>, port: u16) {
    let app = build_router(state);
    let addr = format!("0.0.0.0:{port}");
    info!(port, "HTTP API listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "failed to bind HTTP server");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "HTTP server error");
    }
}

/// MJPEG multipart stream for one camera. Each client gets its own
/// non-blocking sink; a slow reader only drops its own frames, never the
/// shared producer (invariant I3).
async fn handle_video_feed(State(state): State<Arc<AppState>>, Path(camera): Path<String>) -> Response {
    let cam_stream = match state.manager.get(&camera) {
        Some(s) => s,
        None => {
            return (StatusCode::NOT_FOUND, format!("camera '{camera}' not found")).into_response();
        }
    };

    let (mut sink, cached) = cam_stream.subscribe();
    let frame_timeout = state.frame_timeout;

    let body_stream = stream! {
        if let Some(frame) = cached {
            yield Ok::<_, std::convert::Infallible>(mjpeg_part(&frame));
        }
        loop {
            match tokio::time::timeout(frame_timeout, sink.recv()).await {
                Ok(Some(frame)) => yield Ok(mjpeg_part(&frame)),
                Ok(None) => break,
                Err(_) => yield Ok(mjpeg_part(&encoder::synthetic_black_frame())),
            }
        }
        // `sink` drops here regardless of how the stream ended, unsubscribing
        // this client from the camera's broadcast set.
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
        )
        .body(Body::from_stream(body_stream))
        .unwrap()
}

fn mjpeg_part(frame: &bytes::Bytes) -> bytes::Bytes {
    let mut part = Vec::with_capacity(frame.len() + 48);
    part.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n").as_bytes());
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    part.into()
}

async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let statuses = state.manager.status_all();
    let total_clients = statuses.iter().map(|s| s.client_count).sum();
    let cameras = statuses.into_iter().map(|s| (s.name.clone(), CameraStatusEntry::from(s))).collect::<HashMap<_, _>>();

    axum::Json(StatusResponse {
        system: "Camera Stream Manager",
        status: "running",
        total_cameras: cameras.len(),
        total_clients,
        cameras,
    })
}

async fn handle_camera_status(State(state): State<Arc<AppState>>, Path(camera): Path<String>) -> Response {
    let cam_stream = match state.manager.get(&camera) {
        Some(s) => s,
        None => {
            return (StatusCode::NOT_FOUND, axum::Json(serde_json::json!({ "error": format!("Camera {camera} not found") })))
                .into_response();
        }
    };

    let status = cam_stream.status();
    axum::Json(SingleCameraStatusResponse {
        camera_name: camera,
        rtsp_url: cam_stream.source_label(),
        is_running: status.running,
        clients: status.client_count,
        buffer_size: status.buffer_size,
        last_frame_time: status.last_frame_time,
    })
    .into_response()
}

async fn handle_restart(State(state): State<Arc<AppState>>, Path(camera): Path<String>) -> Response {
    match state.manager.restart(&camera).await {
        Ok(()) => axum::Json(RestartResponse {
            message: format!("Camera {camera} restarted successfully"),
            status: "restarting",
        })
        .into_response(),
        Err(e) => (StatusCode::NOT_FOUND, axum::Json(serde_json::json!({ "error": e.to_string() }))).into_response(),
    }
}
