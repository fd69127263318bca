//! Clients for the external services creations are produced with: text
//! generation, image synthesis and media hosting/transforms.

pub mod api_errors;
pub mod assets;
pub mod error;
pub mod image;
pub mod text;

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
pub use error::GatewayError;

/// Image bytes plus their MIME type, as produced by a synthesis backend or
/// read from an upload.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Builds the shared HTTP client used by every gateway.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vectorai-server/", env!("CARGO_PKG_VERSION")))
        .build()
}
