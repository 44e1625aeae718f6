//! End-to-end tests against the router with a scripted engine

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::config::ServerConfig;
use crate::http::create_router;
use crate::integration::fixtures::ScriptedEngine;
use crate::state::AppState;

struct TestServer {
    state: Arc<AppState>,
    app: Router,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn new(engine: ScriptedEngine) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            download_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let state = Arc::new(AppState::with_engine(config, Arc::new(engine)));
        let app = create_router(Arc::clone(&state));
        Self {
            state,
            app,
            _dir: dir,
        }
    }

    fn download_dir(&self) -> &std::path::Path {
        &self.state.config.download_dir
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = self.request(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, body) = self.request(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Poll until the job leaves `downloading`
    async fn poll_until_done(&self, id: &str) -> Value {
        self.poll_progress(id).await.0
    }

    /// Poll until the job leaves `downloading`, keeping every progress value
    /// seen on the way
    async fn poll_progress(&self, id: &str) -> (Value, Vec<f64>) {
        let mut seen = Vec::new();
        for _ in 0..200 {
            let (status, job) = self.get_json(&format!("/status/{}", id)).await;
            assert_eq!(status, StatusCode::OK);
            let progress = job["progress"].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&progress));
            seen.push(progress);
            if job["status"] != "downloading" {
                return (job, seen);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} never finished", id);
    }
}

#[tokio::test]
async fn test_download_then_poll_to_completion() {
    let server = TestServer::new(ScriptedEngine::succeeding());

    let (status, body) = server
        .post_json("/download", json!({"url": "https://y/watch?v=abc"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["download_id"].as_str().unwrap().to_string();

    // Record exists right away.
    let (status, job) = server.get_json(&format!("/status/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!job["log"].as_array().unwrap().is_empty());

    let (job, seen) = server.poll_progress(&id).await;
    assert!(
        seen.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {:?}",
        seen
    );
    assert_eq!(seen.last(), Some(&100.0));
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100.0);
    assert_eq!(job["filename"], "Song.mp3");
    assert_eq!(
        job["log"].as_array().unwrap().last().unwrap(),
        "Download completed successfully!"
    );
}

#[tokio::test]
async fn test_failed_download_reports_error() {
    let server = TestServer::new(ScriptedEngine::failing("exit status: 2"));

    let (_, body) = server
        .post_json("/download", json!({"url": "https://y/watch?v=abc"}))
        .await;
    let id = body["download_id"].as_str().unwrap().to_string();

    let job = server.poll_until_done(&id).await;
    assert_eq!(job["status"], "error");
    assert_eq!(job["progress"], 0.0);
    assert!(job["log"]
        .as_array()
        .unwrap()
        .last()
        .unwrap()
        .as_str()
        .unwrap()
        .contains("exit status: 2"));
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let server = TestServer::new(ScriptedEngine::succeeding());

    let (status, body) = server.post_json("/download", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "URL is required"}));

    let (status, _) = server.post_json("/download", json!({"url": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post_json("/check-playlist", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(server.state.jobs.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = TestServer::new(ScriptedEngine::succeeding());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/download")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = server.request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_status_is_not_found() {
    let server = TestServer::new(ScriptedEngine::succeeding());
    let (status, body) = server.get_json("/status/unknown-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Download not found"}));
}

#[tokio::test]
async fn test_playlist_requires_confirmation() {
    let engine = ScriptedEngine::succeeding();
    let calls = engine.download_calls();
    let server = TestServer::new(engine);

    let (status, body) = server
        .post_json("/download", json!({"url": "https://y/playlist?list=XYZ"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playlist_detected"], true);
    assert_eq!(body["playlist_info"]["is_playlist"], true);
    assert_eq!(body["playlist_info"]["title"], "Test Playlist");
    assert_eq!(body["playlist_info"]["video_count"], 3);
    assert!(body.get("download_id").is_none());
    assert!(server.state.jobs.is_empty());

    // Confirmed resubmission starts the whole playlist.
    let (_, body) = server
        .post_json(
            "/download",
            json!({"url": "https://y/playlist?list=XYZ", "download_playlist": true}),
        )
        .await;
    let id = body["download_id"].as_str().unwrap().to_string();
    let job = server.poll_until_done(&id).await;
    assert_eq!(job["is_playlist"], true);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_check_playlist() {
    let server = TestServer::new(ScriptedEngine::succeeding());
    let (status, body) = server
        .post_json("/check-playlist", json!({"url": "https://y/playlist?list=XYZ"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "is_playlist": true,
            "title": "Test Playlist",
            "video_count": 3,
            "uploader": "Tester"
        })
    );

    let server = TestServer::new(ScriptedEngine::succeeding().with_probe_error());
    let (_, body) = server
        .post_json("/check-playlist", json!({"url": "https://y/playlist?list=XYZ"}))
        .await;
    assert_eq!(body["is_playlist"], false);
    assert!(body["error"].as_str().unwrap().contains("Unsupported URL"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions() {
    let server = Arc::new(TestServer::new(ScriptedEngine::echoing_url()));

    let mut handles = Vec::new();
    for i in 0..10 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            let url = format!("https://y/watch?v={}", i);
            let (_, body) = server.post_json("/download", json!({ "url": url })).await;
            (url, body["download_id"].as_str().unwrap().to_string())
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let (url, id) = handle.await.unwrap();
        let job = server.poll_until_done(&id).await;
        assert_eq!(job["status"], "completed");
        let echoed: Vec<_> = job["log"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .filter(|l| l.starts_with("url="))
            .collect();
        assert_eq!(echoed, vec![format!("url={}", url); 2]);
        ids.insert(id);
    }
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_list_and_fetch_files() {
    let server = TestServer::new(ScriptedEngine::succeeding());
    std::fs::write(server.download_dir().join("Song.mp3"), b"ID3data").unwrap();
    std::fs::create_dir(server.download_dir().join("Some Playlist")).unwrap();

    let (status, listing) = server.get_json("/downloads").await;
    assert_eq!(status, StatusCode::OK);
    let listing = listing.as_array().unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0]["name"], "Song.mp3");
    assert_eq!(listing[0]["size"], 7);
    assert!(listing[0]["modified"].is_string());

    let request = Request::builder()
        .uri("/download_file/Song.mp3")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = server.request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ID3data");
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment; filename=\"Song.mp3\""));
}

#[tokio::test]
async fn test_large_file_streams_with_length() {
    let server = TestServer::new(ScriptedEngine::succeeding());
    let data: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    std::fs::write(server.download_dir().join("Long Mix.m4a"), &data).unwrap();

    let request = Request::builder()
        .uri("/download_file/Long%20Mix.m4a")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = server.request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mp4");
    assert_eq!(headers[header::CONTENT_LENGTH], data.len().to_string().as_str());
    assert_eq!(body.len(), data.len());
    assert!(body == data);
}

#[tokio::test]
async fn test_fetch_missing_or_escaping_file() {
    let server = TestServer::new(ScriptedEngine::succeeding());

    let (status, body) = server.get_json("/download_file/absent.mp3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "File not found"}));

    let (status, _) = server.get_json("/download_file/..%2Fsecret").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    std::fs::create_dir(server.download_dir().join("dir")).unwrap();
    let (status, _) = server.get_json("/download_file/dir").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_and_debug() {
    let server = TestServer::new(ScriptedEngine::succeeding());

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, _, body) = server.request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (_, body) = server
        .post_json("/download", json!({"url": "https://y/watch?v=abc"}))
        .await;
    let id = body["download_id"].as_str().unwrap().to_string();
    server.state.downloads.wait(&id).await;

    let (status, stats) = server.get_json("/debug/jobs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["by_status"]["completed"], 1);
    assert_eq!(stats["running_tasks"], 0);
}
