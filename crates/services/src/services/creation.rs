use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use db::models::creation::{CreateCreation, Creation, CreationType};
use gateways::{
    GatewayError, ImagePayload,
    api_errors::VendorErrorKind,
    assets::{AssetHost, Transformation},
    image::ImageGenerator,
    text::{TextGenerator, TextRequest},
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    config::Config,
    pdf::PdfTextExtractor,
    upload::{UploadKind, UploadedFile},
};

pub const REMOVE_BACKGROUND_PROMPT: &str = "Remove background from image";
pub const RESUME_REVIEW_PROMPT: &str = "Review the uploaded resume";
const RESUME_REVIEW_PREFIX: &str = "Review the following resume and provide constructive feedback on its strengths, weaknesses, and areas for improvement. Resume Content:\n\n";

const ARTICLE_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 100..=5000;

const PROMPT_REQUIRED: &str = "Prompt is required";
const IMAGE_REQUIRED: &str = "Image file is required";
const RESUME_REQUIRED: &str = "Resume file is required";
const OBJECT_REQUIRED: &str = "Object description is required";
const SINGLE_OBJECT_ONLY: &str = "Please enter only one object name";
const RESUME_TOO_LARGE: &str = "File size exceeds 5MB limit.";

const TEXT_PROVIDER: &str = "Text generation";
const IMAGE_PROVIDER: &str = "Image generation";
const ASSET_PROVIDER: &str = "Image hosting";

pub fn remove_object_prompt(object: &str) -> String {
    format!("Remove {object} from image")
}

#[derive(Debug, Error)]
pub enum CreationError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    VendorUnavailable {
        message: String,
        #[source]
        source: GatewayError,
    },
    #[error("Could not extract text from PDF. Please ensure the file is not corrupted.")]
    ExtractionFailed,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl CreationError {
    fn validation(message: impl Into<String>) -> Self {
        CreationError::Validation(message.into())
    }
}

impl From<GatewayError> for CreationError {
    fn from(source: GatewayError) -> Self {
        let message = match &source {
            GatewayError::ModelLoading {
                estimated_seconds, ..
            } => match estimated_seconds {
                Some(seconds) if *seconds > 0.0 => format!(
                    "The image model is warming up. Please try again in about {} seconds.",
                    seconds.ceil() as u64
                ),
                _ => "The image model is warming up. Please try again shortly.".to_string(),
            },
            GatewayError::Timeout { provider } => {
                format!("{provider} took too long to respond. Please try again.")
            }
            GatewayError::NotConfigured { provider } => {
                format!("{provider} is not configured on this server.")
            }
            GatewayError::Vendor { provider, kind, .. } => match kind {
                VendorErrorKind::QuotaExceeded => {
                    format!("{provider} quota has been exhausted. Please try again later.")
                }
                VendorErrorKind::InvalidRequest => {
                    format!("{provider} rejected the request. Try rephrasing your prompt.")
                }
                kind if kind.is_transient() => {
                    format!("{provider} is busy right now. Please try again shortly.")
                }
                _ => format!("{provider} is unavailable. Please try again later."),
            },
            other => format!("{} is unavailable. Please try again later.", other.provider()),
        };
        CreationError::VendorUnavailable { message, source }
    }
}

/// The external collaborators a creation is produced with.
#[derive(Clone)]
pub struct Gateways {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
    pub assets: Arc<dyn AssetHost>,
    pub pdf: Arc<dyn PdfTextExtractor>,
}

#[derive(Debug, Clone)]
pub struct CreationLimits {
    pub max_prompt_chars: usize,
    pub max_object_chars: usize,
    pub max_resume_bytes: u64,
    pub text_timeout: Duration,
    pub image_timeout: Duration,
    pub asset_timeout: Duration,
    pub extraction_timeout: Duration,
}

impl Default for CreationLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CreationLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_prompt_chars: config.limits.max_prompt_chars,
            max_object_chars: config.limits.max_object_chars,
            max_resume_bytes: config.limits.max_resume_bytes,
            text_timeout: Duration::from_secs(config.text.timeout_secs),
            image_timeout: Duration::from_secs(config.image.timeout_secs),
            asset_timeout: Duration::from_secs(config.assets.timeout_secs),
            extraction_timeout: Duration::from_secs(config.limits.pdf_extraction_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ImageUsage {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub resets_at: DateTime<Utc>,
}

impl ImageUsage {
    /// Quota numbers for display. The window resets at the start of the next
    /// UTC calendar month.
    pub fn placeholder(limit: u32, used: u32, now: DateTime<Utc>) -> Self {
        let (year, month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        let resets_at = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        Self {
            limit,
            used,
            remaining: limit.saturating_sub(used),
            resets_at,
        }
    }

    pub fn current(limit: u32, used: u32) -> Self {
        Self::placeholder(limit, used, Utc::now())
    }
}

/// Runs one generation operation end to end: validate, call the vendor,
/// persist one row. Failures never write a row.
#[derive(Clone)]
pub struct CreationService {
    pool: SqlitePool,
    gateways: Gateways,
    limits: CreationLimits,
}

impl CreationService {
    pub fn new(pool: SqlitePool, gateways: Gateways, limits: CreationLimits) -> Self {
        Self {
            pool,
            gateways,
            limits,
        }
    }

    pub fn limits(&self) -> &CreationLimits {
        &self.limits
    }

    pub async fn generate_article(
        &self,
        user_id: &str,
        prompt: &str,
        length: Option<u32>,
    ) -> Result<String, CreationError> {
        self.check_prompt(prompt)?;
        if let Some(length) = length {
            if !ARTICLE_LENGTH_RANGE.contains(&length) {
                return Err(CreationError::validation(format!(
                    "Article length must be between {} and {} words",
                    ARTICLE_LENGTH_RANGE.start(),
                    ARTICLE_LENGTH_RANGE.end()
                )));
            }
        }

        // Roughly two tokens per word leaves room for markdown.
        let request = TextRequest::new(prompt).with_max_output_tokens(length.map(|l| l * 2));
        let content = self
            .bounded(
                TEXT_PROVIDER,
                self.limits.text_timeout,
                self.gateways.text.generate(&request),
            )
            .await?;

        self.persist(user_id, prompt, &content, CreationType::Article, false)
            .await?;
        Ok(content)
    }

    pub async fn generate_blog_title(
        &self,
        user_id: &str,
        prompt: &str,
    ) -> Result<String, CreationError> {
        self.check_prompt(prompt)?;

        let request = TextRequest::new(prompt);
        let content = self
            .bounded(
                TEXT_PROVIDER,
                self.limits.text_timeout,
                self.gateways.text.generate(&request),
            )
            .await?;

        self.persist(user_id, prompt, &content, CreationType::Blog, false)
            .await?;
        Ok(content)
    }

    pub async fn generate_image(
        &self,
        user_id: &str,
        prompt: &str,
        publish: Option<bool>,
    ) -> Result<String, CreationError> {
        self.check_prompt(prompt)?;

        let image = self
            .bounded(
                IMAGE_PROVIDER,
                self.limits.image_timeout,
                self.gateways.image.generate(prompt),
            )
            .await?;
        let asset = self
            .bounded(
                ASSET_PROVIDER,
                self.limits.asset_timeout,
                self.gateways.assets.upload(&image, None),
            )
            .await?;

        self.persist(
            user_id,
            prompt,
            &asset.secure_url,
            CreationType::Image,
            publish.unwrap_or(false),
        )
        .await?;
        Ok(asset.secure_url)
    }

    pub async fn remove_background(
        &self,
        user_id: &str,
        image: Option<UploadedFile>,
    ) -> Result<String, CreationError> {
        let image = image.ok_or_else(|| CreationError::validation(IMAGE_REQUIRED))?;
        let payload = read_image(&image).await?;

        let asset = self
            .bounded(
                ASSET_PROVIDER,
                self.limits.asset_timeout,
                self.gateways
                    .assets
                    .upload(&payload, Some(&Transformation::RemoveBackground)),
            )
            .await?;

        self.persist(
            user_id,
            REMOVE_BACKGROUND_PROMPT,
            &asset.secure_url,
            CreationType::Image,
            false,
        )
        .await?;
        Ok(asset.secure_url)
    }

    pub async fn remove_object(
        &self,
        user_id: &str,
        image: Option<UploadedFile>,
        object: &str,
    ) -> Result<String, CreationError> {
        let image = image.ok_or_else(|| CreationError::validation(IMAGE_REQUIRED))?;
        let object = self.check_object(object)?;
        let payload = read_image(&image).await?;

        let asset = self
            .bounded(
                ASSET_PROVIDER,
                self.limits.asset_timeout,
                self.gateways.assets.upload(&payload, None),
            )
            .await?;
        let url = self.gateways.assets.transformed_url(
            &asset.public_id,
            &Transformation::RemoveObject(object.to_string()),
        );

        self.persist(
            user_id,
            &remove_object_prompt(object),
            &url,
            CreationType::Image,
            false,
        )
        .await?;
        Ok(url)
    }

    pub async fn review_resume(
        &self,
        user_id: &str,
        resume: Option<UploadedFile>,
    ) -> Result<String, CreationError> {
        let resume = resume.ok_or_else(|| CreationError::validation(RESUME_REQUIRED))?;
        let size = resume.size().map_err(io_validation)?;
        if size > self.limits.max_resume_bytes {
            return Err(CreationError::validation(RESUME_TOO_LARGE));
        }
        resume
            .check_kind(UploadKind::Pdf)
            .map_err(CreationError::validation)?;

        let bytes = resume.read().await.map_err(io_validation)?;
        let text = self.extract_pdf_text(bytes).await?;

        let request = TextRequest::new(format!("{RESUME_REVIEW_PREFIX}{text}"));
        let content = self
            .bounded(
                TEXT_PROVIDER,
                self.limits.text_timeout,
                self.gateways.text.generate(&request),
            )
            .await?;

        self.persist(
            user_id,
            RESUME_REVIEW_PROMPT,
            &content,
            CreationType::ResumeReview,
            false,
        )
        .await?;
        Ok(content)
    }

    async fn extract_pdf_text(&self, bytes: Vec<u8>) -> Result<String, CreationError> {
        let extractor = self.gateways.pdf.clone();
        let task = tokio::task::spawn_blocking(move || extractor.extract_text(&bytes));
        // The blocking thread cannot be cancelled; on timeout it finishes
        // in the background and its result is discarded.
        let extracted = match tokio::time::timeout(self.limits.extraction_timeout, task).await {
            Ok(Ok(extracted)) => extracted,
            Ok(Err(e)) => {
                tracing::error!("PDF extraction task failed: {}", e);
                return Err(CreationError::ExtractionFailed);
            }
            Err(_) => {
                tracing::warn!(
                    "PDF extraction timed out after {:?}",
                    self.limits.extraction_timeout
                );
                return Err(CreationError::ExtractionFailed);
            }
        };

        match extracted {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Err(CreationError::ExtractionFailed),
            Err(e) => {
                tracing::warn!("{}", e);
                Err(CreationError::ExtractionFailed)
            }
        }
    }

    fn check_prompt(&self, prompt: &str) -> Result<(), CreationError> {
        if prompt.trim().is_empty() {
            return Err(CreationError::validation(PROMPT_REQUIRED));
        }
        if prompt.chars().count() > self.limits.max_prompt_chars {
            return Err(CreationError::validation(format!(
                "Prompt must be at most {} characters",
                self.limits.max_prompt_chars
            )));
        }
        Ok(())
    }

    fn check_object<'a>(&self, object: &'a str) -> Result<&'a str, CreationError> {
        let mut tokens = object.split_whitespace();
        let first = tokens
            .next()
            .ok_or_else(|| CreationError::validation(OBJECT_REQUIRED))?;
        if tokens.next().is_some() {
            return Err(CreationError::validation(SINGLE_OBJECT_ONLY));
        }
        if first.chars().count() > self.limits.max_object_chars {
            return Err(CreationError::validation(format!(
                "Object name must be at most {} characters",
                self.limits.max_object_chars
            )));
        }
        Ok(first)
    }

    async fn bounded<T>(
        &self,
        provider: &'static str,
        timeout: Duration,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, CreationError> {
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result.map_err(|e| {
                tracing::warn!("{} call failed: {}", provider, e);
                CreationError::from(e)
            }),
            Err(_) => {
                tracing::warn!("{} call timed out after {:?}", provider, timeout);
                Err(GatewayError::Timeout { provider }.into())
            }
        }
    }

    async fn persist(
        &self,
        user_id: &str,
        prompt: &str,
        content: &str,
        creation_type: CreationType,
        publish: bool,
    ) -> Result<Creation, CreationError> {
        let creation = Creation::create(
            &self.pool,
            &CreateCreation {
                user_id: user_id.to_string(),
                prompt: prompt.to_string(),
                content: content.to_string(),
                creation_type,
                publish,
            },
            Uuid::new_v4(),
        )
        .await?;
        tracing::debug!(
            "stored {} creation {} for {}",
            creation.creation_type,
            creation.id,
            user_id
        );
        Ok(creation)
    }
}

async fn read_image(image: &UploadedFile) -> Result<ImagePayload, CreationError> {
    image
        .check_kind(UploadKind::Image)
        .map_err(CreationError::validation)?;
    let bytes = image.read().await.map_err(io_validation)?;
    if bytes.is_empty() {
        return Err(CreationError::validation(IMAGE_REQUIRED));
    }
    Ok(ImagePayload::new(bytes, image.mime_type()))
}

fn io_validation(e: std::io::Error) -> CreationError {
    tracing::warn!("Could not read uploaded file: {}", e);
    CreationError::validation("Uploaded file could not be read")
}
