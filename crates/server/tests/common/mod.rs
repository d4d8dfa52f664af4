//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock converter injected, enabling E2E testing of the HTTP surface
//! without ffmpeg.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use convertino_core::{
    testing::MockConverter, Config, ConversionOrchestrator, ServerConfig, TempStore,
};

/// Re-export fixtures for test convenience
pub use convertino_core::testing::fixtures;

/// Test fixture for E2E testing with a mock converter.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new().await;
///
///     let form = MultipartBody::new()
///         .file("file", "song.wav", &fixtures::wav_bytes(1, 8000))
///         .text("format", "mp3");
///     let response = fixture.upload(form).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock converter - control conversion outcomes
    pub converter: MockConverter,
    /// Orchestrator behind the router
    pub orchestrator: Arc<ConversionOrchestrator>,
    /// Working directory for uploads and outputs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with the raw body kept
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with default settings.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            ..Default::default()
        };
        config.storage.upload_dir = temp_dir.path().to_path_buf();
        config.retention.delete_on_download = test_config.delete_on_download;
        if let Some(limit) = test_config.max_upload_bytes {
            config.storage.max_upload_bytes = limit;
        }

        let store = TempStore::open(temp_dir.path())
            .await
            .expect("Failed to open store");
        let converter = MockConverter::new();
        let orchestrator = Arc::new(ConversionOrchestrator::new(
            store,
            Arc::new(converter.clone()),
        ));

        let state = Arc::new(convertino_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
        ));
        let router = convertino_server::api::create_router(state);

        Self {
            router,
            converter,
            orchestrator,
            temp_dir,
        }
    }

    /// Names of the files currently in the working directory.
    pub fn files(&self) -> Vec<String> {
        fixtures::list_files(self.temp_dir.path())
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let raw = self.send(Request::builder().method("GET").uri(path), Body::empty()).await;
        raw.into_json()
    }

    /// Send a GET request and keep the body as bytes.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        self.send(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("DELETE").uri(path), Body::empty())
            .await
            .into_json()
    }

    /// POST a multipart form to /upload.
    pub async fn upload(&self, form: MultipartBody) -> TestResponse {
        let (content_type, body) = form.build();
        self.send(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header("Content-Type", content_type),
            Body::from(body),
        )
        .await
        .into_json()
    }

    /// Send a POST request with custom content type (for testing wrong content types).
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", content_type),
            Body::from(body.to_string()),
        )
        .await
        .into_json()
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> RawResponse {
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }
}

impl RawResponse {
    fn into_json(self) -> TestResponse {
        let body: Value = if self.bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status: self.status,
            body,
        }
    }
}

/// Builder for `multipart/form-data` request bodies.
#[derive(Debug, Default)]
pub struct MultipartBody {
    parts: Vec<(String, Option<String>, Vec<u8>)>,
}

impl MultipartBody {
    const BOUNDARY: &'static str = "convertino-test-boundary-7d9f3a";

    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts
            .push((name.to_string(), None, value.as_bytes().to_vec()));
        self
    }

    /// Add a file field.
    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.parts
            .push((name.to_string(), Some(filename.to_string()), bytes.to_vec()));
        self
    }

    /// Returns the `Content-Type` header value and the encoded body.
    pub fn build(self) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for (name, filename, bytes) in self.parts {
            body.extend_from_slice(format!("--{}\r\n", Self::BOUNDARY).as_bytes());
            match filename {
                Some(filename) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            name, filename
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                }
                None => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                }
            }
            body.extend_from_slice(&bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());

        (
            format!("multipart/form-data; boundary={}", Self::BOUNDARY),
            body,
        )
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Delete outputs after they are served
    pub delete_on_download: bool,
    /// Override the request body limit
    pub max_upload_bytes: Option<usize>,
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
