//! Upload and cancellation handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, info};
use convertino_core::{
    ConversionOrchestrator, ConverterError, OrchestratorError, OutputFormat, UploadRequest,
    UploadedFile,
};

use super::ErrorResponse;
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub conversion_id: String,
    pub download_url: String,
    pub format: OutputFormat,
    pub output_size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub conversion_id: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// HTTP status for a failed upload.
pub fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::DuplicateConversionId(_) => StatusCode::CONFLICT,
        OrchestratorError::Conversion(ConverterError::Cancelled) => StatusCode::CONFLICT,
        OrchestratorError::Conversion(
            ConverterError::FfmpegNotFound { .. } | ConverterError::Io(_),
        ) => StatusCode::INTERNAL_SERVER_ERROR,
        OrchestratorError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrchestratorError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn multipart_failure(e: MultipartError) -> (StatusCode, String) {
    let status = e.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "File too large".to_string()
    } else {
        e.body_text()
    };
    (status, message)
}

/// Collects the known form fields. Unknown fields are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadRequest, (StatusCode, String)> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(multipart_failure)?;
                if request.file.is_none() {
                    request.file = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "format" => request.format = Some(field.text().await.map_err(multipart_failure)?),
            "activation_bytes" => {
                request.activation_bytes = Some(field.text().await.map_err(multipart_failure)?)
            }
            "conversion_id" => {
                request.conversion_id = Some(field.text().await.map_err(multipart_failure)?)
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(request)
}

/// POST /upload
///
/// Accepts one file plus its target format, converts it and answers with a
/// download URL once the output is complete.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            debug!("Upload without a multipart body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "No file part");
        }
    };

    let request = match read_upload(&mut multipart).await {
        Ok(request) => request,
        Err((status, message)) => return error_response(status, message),
    };

    let upload = match ConversionOrchestrator::validate(request) {
        Ok(upload) => upload,
        Err(e) => {
            info!("Upload rejected: {}", e);
            let e = OrchestratorError::from(e);
            CONVERSIONS_TOTAL
                .with_label_values(&["unknown", e.label()])
                .inc();
            return error_response(status_for(&e), e.user_message());
        }
    };
    let mode = upload.kind.as_str();

    let start = Instant::now();
    match state.orchestrator().run(upload).await {
        Ok(outcome) => {
            CONVERSIONS_TOTAL
                .with_label_values(&[mode, "succeeded"])
                .inc();
            CONVERSION_DURATION
                .with_label_values(&[mode])
                .observe(start.elapsed().as_secs_f64());

            Json(UploadResponse {
                success: true,
                conversion_id: outcome.conversion_id,
                download_url: outcome.download_url,
                format: outcome.format,
                output_size_bytes: outcome.output_size_bytes,
            })
            .into_response()
        }
        Err(e) => {
            CONVERSIONS_TOTAL.with_label_values(&[mode, e.label()]).inc();
            if matches!(e, OrchestratorError::Conversion(_)) {
                CONVERSION_DURATION
                    .with_label_values(&[mode])
                    .observe(start.elapsed().as_secs_f64());
            }
            error_response(status_for(&e), e.user_message())
        }
    }
}

/// DELETE /cancel/{conversion_id}
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(conversion_id): Path<String>,
) -> Response {
    if state.orchestrator().cancel(&conversion_id) {
        info!("Cancellation accepted for {}", conversion_id);
        (
            StatusCode::ACCEPTED,
            Json(CancelResponse {
                success: true,
                conversion_id,
            }),
        )
            .into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Conversion not found")
    }
}
