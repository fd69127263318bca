use thiserror::Error;

use crate::api_errors::{VendorErrorKind, classify_vendor_error};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{provider} model is still loading")]
    ModelLoading {
        provider: &'static str,
        estimated_seconds: Option<f64>,
    },
    #[error("{provider} did not respond in time")]
    Timeout { provider: &'static str },
    #[error("{provider} returned HTTP {status}: {body}")]
    Vendor {
        provider: &'static str,
        status: u16,
        kind: VendorErrorKind,
        body: String,
    },
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} is not configured")]
    NotConfigured { provider: &'static str },
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl GatewayError {
    pub fn transport(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            GatewayError::Timeout { provider }
        } else {
            GatewayError::Transport { provider, source }
        }
    }

    /// Builds the error for a non-success HTTP response.
    pub fn from_status(provider: &'static str, status: u16, body: String) -> Self {
        match classify_vendor_error(status, &body) {
            VendorErrorKind::ModelLoading => GatewayError::ModelLoading {
                provider,
                estimated_seconds: estimated_seconds(&body),
            },
            kind => GatewayError::Vendor {
                provider,
                status,
                kind,
                body,
            },
        }
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        GatewayError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            GatewayError::ModelLoading { provider, .. }
            | GatewayError::Timeout { provider }
            | GatewayError::Vendor { provider, .. }
            | GatewayError::InvalidResponse { provider, .. }
            | GatewayError::NotConfigured { provider }
            | GatewayError::Transport { provider, .. } => *provider,
        }
    }
}

fn estimated_seconds(body: &str) -> Option<f64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("estimated_time")?
        .as_f64()
}
