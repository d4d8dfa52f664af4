//! Upload format validation.
//!
//! Decides, from nothing but the uploaded filename and the submitted form
//! fields, whether a request can be converted at all and which conversion
//! path it takes. Nothing in here touches the filesystem.

mod activation;
mod error;
mod types;

pub use activation::ActivationBytes;
pub use error::ValidationError;
pub use types::{extension_of, is_allowed, InputKind, OutputFormat, ALLOWED_EXTENSIONS, DRM_EXTENSION};
