// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

//! HTTP adapter integration tests: wire formats served by `src/api.rs`.
//!
//! Run with: `cargo test`

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use camera_relay::api::{build_router, AppState};
use camera_relay::manager::StreamManager;
use camera_relay::stream::SourceRef;

mod common;
use common::{fast_config, CountingOpener, NeverOpens};

fn state_with(manager: StreamManager, frame_timeout: Duration) -> Arc<AppState> {
    Arc::new(AppState { manager: Arc::new(manager), frame_timeout })
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn mjpeg_part_has_no_content_length_header() {
    let manager = StreamManager::new(fast_config(), Arc::new(CountingOpener));
    manager.add("cam1".to_string(), SourceRef::Webcam(0));
    let state = state_with(manager, Duration::from_secs(2));
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::get("/video_feed/cam1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut stream = response.into_body().into_data_stream();
    let chunk = stream.next().await.expect("at least one MJPEG part").unwrap();

    let text_prefix = String::from_utf8_lossy(&chunk[..chunk.len().min(80)]);
    assert!(text_prefix.starts_with("--frame\r\nContent-Type: image/jpeg\r\n\r\n"), "got: {text_prefix:?}");
    assert!(!text_prefix.to_lowercase().contains("content-length"), "MJPEG part must not carry Content-Length");
    assert!(chunk.ends_with(b"\r\n"));

    state.manager.stop_all(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn video_feed_falls_back_to_keepalive_when_producer_never_starts() {
    let manager = StreamManager::new(fast_config(), Arc::new(NeverOpens));
    manager.add("cam1".to_string(), SourceRef::Webcam(0));
    let state = state_with(manager, Duration::from_millis(50));
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::get("/video_feed/cam1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut stream = response.into_body().into_data_stream();
    let chunk = stream.next().await.expect("keep-alive part after timeout").unwrap();
    let text_prefix = String::from_utf8_lossy(&chunk[..chunk.len().min(80)]);
    assert!(text_prefix.starts_with("--frame\r\nContent-Type: image/jpeg\r\n\r\n"));

    let expected = camera_relay::encoder::synthetic_black_frame();
    let part_body = &chunk[text_prefix.find("\r\n\r\n").unwrap() + 4..chunk.len() - 2];
    assert_eq!(part_body, &expected[..]);

    state.manager.stop_all(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn unknown_camera_video_feed_is_404() {
    let manager = StreamManager::new(fast_config(), Arc::new(CountingOpener));
    let state = state_with(manager, Duration::from_secs(2));
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/video_feed/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_status_shape_matches_contract() {
    let manager = StreamManager::new(fast_config(), Arc::new(CountingOpener));
    manager.add("cam1".to_string(), SourceRef::Webcam(0));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = state_with(manager, Duration::from_secs(2));
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body.get("system").is_some());
    assert_eq!(body["status"], "running");
    assert_eq!(body["total_cameras"], 1);
    assert!(body["total_clients"].is_number());

    let cameras = body["cameras"].as_object().expect("cameras must be a name-keyed map");
    let cam1 = &cameras["cam1"];
    assert!(cam1.get("clients").is_some());
    assert!(cam1.get("buffer_size").is_some());
    assert!(cam1.get("is_running").is_some());
    assert!(cam1.get("last_frame_time").is_some());

    state.manager.stop_all(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn single_camera_status_shape_matches_contract() {
    let manager = StreamManager::new(fast_config(), Arc::new(CountingOpener));
    manager.add("cam1".to_string(), SourceRef::Webcam(7));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = state_with(manager, Duration::from_secs(2));
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::get("/api/cameras/cam1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["camera_name"], "cam1");
    assert_eq!(body["rtsp_url"], "7");
    assert!(body.get("is_running").is_some());
    assert!(body.get("clients").is_some());
    assert!(body.get("buffer_size").is_some());
    assert!(body.get("last_frame_time").is_some());

    state.manager.stop_all(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn restart_response_shape_matches_contract() {
    let manager = StreamManager::new(fast_config(), Arc::new(CountingOpener));
    manager.add("cam1".to_string(), SourceRef::Webcam(0));
    let state = state_with(manager, Duration::from_secs(2));
    let router = build_router(state.clone());

    let response = router
        .oneshot(Request::post("/api/cameras/cam1/restart").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "restarting");
    assert!(body["message"].as_str().unwrap().contains("cam1"));

    state.manager.stop_all(Duration::from_secs(2)).await;
}
