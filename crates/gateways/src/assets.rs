use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::{GatewayError, ImagePayload};

const PROVIDER: &str = "Cloudinary";
pub const DEFAULT_CLOUDINARY_API_BASE_URL: &str = "https://api.cloudinary.com/";
pub const DEFAULT_CLOUDINARY_DELIVERY_BASE_URL: &str = "https://res.cloudinary.com/";

/// Server-side image edits offered by the asset host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    RemoveBackground,
    /// Generative removal of a single named object.
    RemoveObject(String),
}

impl Transformation {
    /// Cloudinary transformation string.
    pub fn to_param(&self) -> String {
        match self {
            Transformation::RemoveBackground => "e_background_removal".to_string(),
            Transformation::RemoveObject(object) => {
                let encoded: String = url::form_urlencoded::byte_serialize(object.as_bytes()).collect();
                format!("e_gen_remove:prompt_{encoded}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    pub public_id: String,
    pub secure_url: String,
}

/// Durable media hosting with built-in transforms.
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Stores `image`, optionally applying `transformation` on ingest.
    async fn upload(
        &self,
        image: &ImagePayload,
        transformation: Option<&Transformation>,
    ) -> Result<UploadedAsset, GatewayError>;

    /// Delivery URL for a stored asset with `transformation` applied on the fly.
    fn transformed_url(&self, public_id: &str, transformation: &Transformation) -> String;
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorMessage,
}

#[derive(Debug, Deserialize)]
struct CloudinaryErrorMessage {
    message: String,
}

pub struct CloudinaryAssetHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: Option<String>,
    api_base: Url,
    delivery_base: Url,
}

impl CloudinaryAssetHost {
    pub fn new(
        client: reqwest::Client,
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: SecretString,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret,
            folder: None,
            api_base: Url::parse(DEFAULT_CLOUDINARY_API_BASE_URL)?,
            delivery_base: Url::parse(DEFAULT_CLOUDINARY_DELIVERY_BASE_URL)?,
        })
    }

    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder.filter(|folder| !folder.is_empty());
        self
    }

    fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty()
            && !self.api_key.is_empty()
            && !self.api_secret.expose_secret().is_empty()
    }
}

/// Cloudinary request signature: the signed params sorted by key, joined as
/// `k=v&k=v`, with the API secret appended, then SHA-256 hex encoded.
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    let digest = Sha256::digest(format!("{to_sign}{api_secret}").as_bytes());
    format!("{digest:x}")
}

#[async_trait]
impl AssetHost for CloudinaryAssetHost {
    async fn upload(
        &self,
        image: &ImagePayload,
        transformation: Option<&Transformation>,
    ) -> Result<UploadedAsset, GatewayError> {
        if !self.is_configured() {
            return Err(GatewayError::NotConfigured { provider: PROVIDER });
        }

        let mut signed: BTreeMap<&str, String> = BTreeMap::new();
        signed.insert("timestamp", Utc::now().timestamp().to_string());
        if let Some(transformation) = transformation {
            signed.insert("transformation", transformation.to_param());
        }
        if let Some(folder) = &self.folder {
            signed.insert("folder", folder.clone());
        }
        let signature = sign_params(&signed, self.api_secret.expose_secret());

        let mut form: Vec<(&str, String)> = signed.into_iter().collect();
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));
        form.push(("file", image.to_data_uri()));

        let endpoint = self
            .api_base
            .join(&format!("v1_1/{}/image/upload", self.cloud_name))
            .map_err(|e| GatewayError::invalid_response(PROVIDER, format!("bad endpoint: {e}")))?;

        let response = self
            .client
            .post(endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<CloudinaryErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            tracing::warn!("Cloudinary upload failed with {}: {}", status, body);
            return Err(GatewayError::from_status(PROVIDER, status.as_u16(), body));
        }

        response
            .json::<UploadedAsset>()
            .await
            .map_err(|e| GatewayError::invalid_response(PROVIDER, e.to_string()))
    }

    fn transformed_url(&self, public_id: &str, transformation: &Transformation) -> String {
        format!(
            "{}{}/image/upload/{}/{}",
            self.delivery_base,
            self.cloud_name,
            transformation.to_param(),
            public_id
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use secrecy::SecretString;

    use super::{AssetHost, CloudinaryAssetHost, Transformation, sign_params};

    fn host() -> CloudinaryAssetHost {
        CloudinaryAssetHost::new(
            reqwest::Client::new(),
            "demo",
            "key",
            SecretString::from("secret".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn transformation_params() {
        assert_eq!(
            Transformation::RemoveBackground.to_param(),
            "e_background_removal"
        );
        assert_eq!(
            Transformation::RemoveObject("car".to_string()).to_param(),
            "e_gen_remove:prompt_car"
        );
        assert_eq!(
            Transformation::RemoveObject("café".to_string()).to_param(),
            "e_gen_remove:prompt_caf%C3%A9"
        );
    }

    #[test]
    fn transformed_url_points_at_delivery_host() {
        let url = host().transformed_url(
            "vectorai/abc123",
            &Transformation::RemoveObject("car".to_string()),
        );
        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/e_gen_remove:prompt_car/vectorai/abc123"
        );
    }

    #[test]
    fn signature_ignores_insertion_order_and_depends_on_secret() {
        let mut a = BTreeMap::new();
        a.insert("timestamp", "1700000000".to_string());
        a.insert("folder", "vectorai".to_string());

        let mut b = BTreeMap::new();
        b.insert("folder", "vectorai".to_string());
        b.insert("timestamp", "1700000000".to_string());

        let signature = sign_params(&a, "secret");
        assert_eq!(signature, sign_params(&b, "secret"));
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(signature, sign_params(&a, "other-secret"));
    }
}
