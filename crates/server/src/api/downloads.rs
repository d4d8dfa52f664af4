//! Download handler serving converted outputs.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::ErrorResponse;
use crate::state::AppState;

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("File not found")),
    )
        .into_response()
}

/// GET /download/{name}
///
/// Streams a finished output as an attachment. Anything that is not the
/// name of an existing output, including traversal attempts, is a 404.
pub async fn download(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    let Some((id, path)) = state.store().resolve_download(&name).await else {
        debug!("Download of unknown file {:?}", name);
        return not_found();
    };

    // The sweeper may remove the file between resolve and open
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("Output {:?} vanished before it could be served: {}", path, e);
            return not_found();
        }
    };
    let length = match file.metadata().await {
        Ok(meta) => Some(meta.len()),
        Err(e) => {
            warn!("Cannot stat {:?}: {}", path, e);
            None
        }
    };

    if state.config().retention.delete_on_download {
        // The open handle keeps the content readable until it is dropped
        state.store().release(&path).await;
    }

    info!("Serving {}", id);

    let file_name = id.file_name();
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, id.format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        );
    if let Some(length) = length {
        response = response.header(header::CONTENT_LENGTH, length);
    }

    match response.body(Body::from_stream(ReaderStream::new(file))) {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to build download response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
