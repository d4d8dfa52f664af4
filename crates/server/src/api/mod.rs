pub mod conversions;
pub mod downloads;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;

use serde::Serialize;

/// JSON error body shared by all endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
