//! End-to-end tests with a mocked converter.
//!
//! These tests run the full router in-process with a mock implementation of
//! the converter so no ffmpeg is needed.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use convertino_core::ConverterError;
use tower::ServiceExt;

use common::{fixtures, MultipartBody, TestConfig, TestFixture};

const CONVERSION_ID: &str = "0d3f9a41-6c2e-4b8f-9a77-5e1b2c3d4e5f";

fn wav_form(filename: &str, format: &str) -> MultipartBody {
    MultipartBody::new()
        .file("file", filename, &fixtures::wav_bytes(1, 8000))
        .text("format", format)
}

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["active_conversions"], 0);
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["converter"]["lossy_bitrate_kbps"], 192);
    assert_eq!(response.body["converter"]["extra_ffmpeg_args"], 0);
    assert_eq!(response.body["retention"]["output_ttl_secs"], 86400);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get_raw("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("convertino_http_requests_total"));
    assert!(text.contains("convertino_conversions_in_flight"));
}

// =============================================================================
// Upload and Download
// =============================================================================

#[tokio::test]
async fn test_upload_and_download() {
    let fixture = TestFixture::new().await;
    fixture
        .converter
        .set_output_bytes(b"ID3 converted".to_vec())
        .await;

    let response = fixture.upload(wav_form("song.wav", "mp3")).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["format"], "mp3");

    let url = response.body["download_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/download/"));
    assert!(url.ends_with(".mp3"));

    let download = fixture.get_raw(&url).await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.bytes, b"ID3 converted");
    assert_eq!(download.headers[header::CONTENT_TYPE], "audio/mpeg");
    let disposition = download.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains(url.trim_start_matches("/download/")));

    // Served again: outputs are kept by default
    assert_eq!(fixture.get_raw(&url).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_returns_requested_conversion_id() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .upload(wav_form("song.flac", "ogg").text("conversion_id", CONVERSION_ID))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["conversion_id"], CONVERSION_ID);
}

#[tokio::test]
async fn test_aax_upload_with_activation_bytes() {
    let fixture = TestFixture::new().await;

    let form = MultipartBody::new()
        .file("file", "book.aax", b"aax payload")
        .text("format", "m4a")
        .text("activation_bytes", "1a2b3c4d");
    let response = fixture.upload(form).await;

    assert_status!(response, StatusCode::OK);
    assert!(response.body["download_url"]
        .as_str()
        .unwrap()
        .ends_with(".m4a"));

    let recorded = fixture.converter.recorded_conversions().await;
    assert_eq!(
        recorded[0].job.activation_bytes.as_ref().unwrap().as_hex(),
        "1a2b3c4d"
    );

    let metrics = String::from_utf8(fixture.get_raw("/metrics").await.bytes).unwrap();
    assert!(metrics.contains(r#"convertino_conversions_total{mode="drm",outcome="succeeded"}"#));
}

#[tokio::test]
async fn test_delete_on_download() {
    let fixture = TestFixture::with_config(TestConfig {
        delete_on_download: true,
        ..Default::default()
    })
    .await;

    let response = fixture.upload(wav_form("song.wav", "wav")).await;
    let url = response.body["download_url"].as_str().unwrap().to_string();

    let first = fixture.get_raw(&url).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.bytes, b"converted audio");

    let second = fixture.get(&url).await;
    assert_status!(second, StatusCode::NOT_FOUND);
    assert!(fixture.files().is_empty());
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_upload_validation_errors() {
    let fixture = TestFixture::new().await;

    let cases = [
        (MultipartBody::new().text("format", "mp3"), "No file part"),
        (
            MultipartBody::new()
                .file("file", "", b"data")
                .text("format", "mp3"),
            "No selected file",
        ),
        (
            MultipartBody::new().file("file", "song.wav", b"data"),
            "No output format specified",
        ),
        (
            MultipartBody::new()
                .file("file", "book.aax", b"data")
                .text("format", "mp3"),
            "Activation bytes are required for AAX files",
        ),
        (
            MultipartBody::new()
                .file("file", "book.aax", b"data")
                .text("format", "mp3")
                .text("activation_bytes", "nothex!!"),
            "Invalid activation bytes format",
        ),
        (
            wav_form("song.wav", "mp3").text("conversion_id", "not-a-uuid"),
            "Invalid conversion id",
        ),
    ];

    for (form, message) in cases {
        let response = fixture.upload(form).await;
        assert_status!(response, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["success"], false);
        assert_eq!(response.body["error"], message);
    }

    assert!(fixture.files().is_empty());
    assert_eq!(fixture.converter.conversion_count().await, 0);
}

#[tokio::test]
async fn test_disallowed_extension_leaves_no_file() {
    let fixture = TestFixture::new().await;

    let response = fixture.upload(wav_form("payload.exe", "mp3")).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .starts_with("File type not allowed"));
    assert!(fixture.files().is_empty());
}

#[tokio::test]
async fn test_unsupported_output_format() {
    let fixture = TestFixture::new().await;
    let response = fixture.upload(wav_form("song.wav", "aiff")).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_multipart_upload() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post_with_content_type("/upload", r#"{"format":"mp3"}"#, "application/json")
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let fixture = TestFixture::with_config(TestConfig {
        max_upload_bytes: Some(1024),
        ..Default::default()
    })
    .await;

    let response = fixture.upload(wav_form("big.wav", "mp3")).await;
    assert_status!(response, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(fixture.files().is_empty());
}

// =============================================================================
// Conversion failures
// =============================================================================

#[tokio::test]
async fn test_conversion_failure_is_generic_and_clean() {
    let fixture = TestFixture::new().await;
    fixture.converter.set_leave_output_on_failure(true).await;
    fixture
        .converter
        .set_next_error(ConverterError::conversion_failed(
            "FFmpeg exited with code: Some(1)",
            Some("/tmp/uploads/x_song.wav: Invalid data found".to_string()),
        ))
        .await;

    let response = fixture.upload(wav_form("song.wav", "mp3")).await;
    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "Conversion failed");
    assert!(fixture.files().is_empty());
}

// =============================================================================
// Download Server
// =============================================================================

#[tokio::test]
async fn test_download_unknown_file() {
    let fixture = TestFixture::new().await;

    for path in [
        "/download/550e8400-e29b-41d4-a716-446655440000.mp3",
        "/download/not-a-real-file.mp3",
        "/download/..%2F..%2Fetc%2Fpasswd",
        "/download/550e8400-e29b-41d4-a716-446655440000.exe",
    ] {
        let response = fixture.get(path).await;
        assert_status!(response, StatusCode::NOT_FOUND);
        assert_eq!(response.body["error"], "File not found");
    }
}

#[tokio::test]
async fn test_download_does_not_serve_inputs() {
    let fixture = TestFixture::new().await;
    std::fs::write(fixture.temp_dir.path().join("secret.wav"), b"raw").unwrap();

    let response = fixture.get("/download/secret.wav").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

// =============================================================================
// Cancellation and concurrency
// =============================================================================

#[tokio::test]
async fn test_cancel_unknown_conversion() {
    let fixture = TestFixture::new().await;
    let response = fixture.delete(&format!("/cancel/{}", CONVERSION_ID)).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Conversion not found");
}

#[tokio::test]
async fn test_cancel_in_flight_upload() {
    let fixture = Arc::new(TestFixture::new().await);
    fixture
        .converter
        .set_conversion_duration(Duration::from_secs(30))
        .await;

    let upload = {
        let fixture = Arc::clone(&fixture);
        tokio::spawn(async move {
            fixture
                .upload(wav_form("long.wav", "mp3").text("conversion_id", CONVERSION_ID))
                .await
        })
    };

    let mut registered = false;
    for _ in 0..200 {
        if fixture.orchestrator.registry().active_count() == 1 {
            registered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(registered, "conversion never started");

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.body["active_conversions"], 1);

    let cancel = fixture.delete(&format!("/cancel/{}", CONVERSION_ID)).await;
    assert_status!(cancel, StatusCode::ACCEPTED);
    assert_eq!(cancel.body["conversion_id"], CONVERSION_ID);

    let response = tokio::time::timeout(Duration::from_secs(5), upload)
        .await
        .expect("upload should finish after cancel")
        .unwrap();
    assert_status!(response, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "Conversion cancelled");
    assert!(fixture.files().is_empty());
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_urls() {
    let fixture = Arc::new(TestFixture::new().await);
    fixture
        .converter
        .set_conversion_duration(Duration::from_millis(50))
        .await;

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let fixture = Arc::clone(&fixture);
            tokio::spawn(async move { fixture.upload(wav_form("same.wav", "mp3")).await })
        })
        .collect();

    let mut urls = std::collections::HashSet::new();
    for task in futures::future::join_all(tasks).await {
        let response = task.unwrap();
        assert_status!(response, StatusCode::OK);
        urls.insert(response.body["download_url"].as_str().unwrap().to_string());
    }
    assert_eq!(urls.len(), 6);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_preflight() {
    let fixture = TestFixture::new().await;

    let request = axum::http::Request::builder()
        .method("OPTIONS")
        .uri("/upload")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = fixture.router.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
