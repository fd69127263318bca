use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::{GatewayError, ImagePayload};

const PROVIDER: &str = "Hugging Face";
pub const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co/";
pub const DEFAULT_HUGGINGFACE_MODEL: &str = "stabilityai/stable-diffusion-2-1";

/// Text-to-image backend.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<ImagePayload, GatewayError>;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Hugging Face serverless inference client for diffusion models.
pub struct HuggingFaceImageGenerator {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: Url,
}

impl HuggingFaceImageGenerator {
    pub fn new(
        client: reqwest::Client,
        api_key: SecretString,
        model: impl Into<String>,
        base_url: Url,
    ) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url,
        }
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<ImagePayload, GatewayError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(GatewayError::NotConfigured { provider: PROVIDER });
        }

        let endpoint = self
            .base_url
            .join(&format!("models/{}", self.model))
            .map_err(|e| GatewayError::invalid_response(PROVIDER, format!("bad endpoint: {e}")))?;

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header(ACCEPT, "image/png")
            .json(&InferenceRequest { inputs: prompt })
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Hugging Face returned {}: {}", status, body);
            return Err(GatewayError::from_status(PROVIDER, status.as_u16(), body));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        if !mime_type.starts_with("image/") {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::invalid_response(
                PROVIDER,
                format!("expected image bytes, got {mime_type}: {body}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;
        if bytes.is_empty() {
            return Err(GatewayError::invalid_response(PROVIDER, "empty image body"));
        }

        Ok(ImagePayload { bytes, mime_type })
    }
}
