use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::GatewayError;

const PROVIDER: &str = "Gemini";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub prompt: String,
    pub max_output_tokens: Option<u32>,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Text generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &TextRequest) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiTextGenerator {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: Url,
}

impl GeminiTextGenerator {
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

    fn endpoint(&self) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| GatewayError::invalid_response(PROVIDER, format!("bad endpoint: {e}")))
    }
}

#[async_trait]
impl TextGenerator for GeminiTextGenerator {
    async fn generate(&self, request: &TextRequest) -> Result<String, GatewayError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(GatewayError::NotConfigured { provider: PROVIDER });
        }

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: request
                .max_output_tokens
                .map(|max_output_tokens| GenerationConfig { max_output_tokens }),
        };

        let response = self
            .client
            .post(self.endpoint()?)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Gemini returned {}: {}", status, body);
            return Err(GatewayError::from_status(PROVIDER, status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::invalid_response(PROVIDER, e.to_string()))?;
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(GatewayError::invalid_response(
            PROVIDER,
            format!("prompt was blocked ({reason})"),
        ));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GatewayError::invalid_response(PROVIDER, "no text in response"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GenerateContentRequest, GenerateContentResponse, extract_text};
    use crate::GatewayError;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn joins_parts_of_first_candidate() {
        let response = parse(json!({
            "candidates": [
                {"content": {"parts": [{"text": "5 Ways AI "}, {"text": "Transforms Healthcare"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }));
        assert_eq!(extract_text(response).unwrap(), "5 Ways AI Transforms Healthcare");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let response = parse(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        let err = extract_text(response).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_candidates_are_an_error() {
        let err = extract_text(parse(json!({}))).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidResponse { .. }));
    }

    #[test]
    fn request_omits_generation_config_without_budget() {
        let body = GenerateContentRequest {
            contents: vec![],
            generation_config: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"contents": []}));
    }
}
