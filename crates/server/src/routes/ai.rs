use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    creation::ImageUsage, identity::AuthenticatedUser, upload::UploadedFile,
};
use tempfile::NamedTempFile;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct GenerateArticleRequest {
    #[serde(default)]
    pub prompt: String,
    /// Target word count.
    #[serde(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Deserialize, TS)]
pub struct GenerateBlogTitleRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub publish: Option<bool>,
}

#[derive(Debug, TryFromMultipart)]
pub struct RemoveBackgroundForm {
    #[form_data(limit = "10MiB")]
    pub image: Option<FieldData<NamedTempFile>>,
}

#[derive(Debug, TryFromMultipart)]
pub struct RemoveObjectForm {
    #[form_data(limit = "10MiB")]
    pub image: Option<FieldData<NamedTempFile>>,
    pub object: Option<String>,
}

#[derive(Debug, TryFromMultipart)]
pub struct ResumeReviewForm {
    #[form_data(limit = "10MiB")]
    pub resume: Option<FieldData<NamedTempFile>>,
}

#[derive(Debug, Serialize, TS)]
pub struct ContentResponse {
    pub content: String,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

const UPLOAD_TOO_LARGE: &str = "File size exceeds 10MB limit.";

fn multipart_body<T>(form: Result<TypedMultipart<T>, TypedMultipartError>) -> Result<T, ApiError> {
    form.map(|TypedMultipart(body)| body).map_err(|rejection| {
        if rejection.get_status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BadRequest(UPLOAD_TOO_LARGE.to_string())
        } else {
            ApiError::BadRequest(rejection.to_string())
        }
    })
}

fn into_upload(field: FieldData<NamedTempFile>) -> UploadedFile {
    UploadedFile::new(
        field.contents,
        field.metadata.file_name,
        field.metadata.content_type,
    )
}

fn content(content: String) -> ResponseJson<ApiResponse<ContentResponse>> {
    ResponseJson(ApiResponse::success(ContentResponse { content }))
}

pub async fn generate_article(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<GenerateArticleRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let payload = json_body(payload)?;
    let article = deployment
        .creations()
        .generate_article(&user.user_id, &payload.prompt, payload.length)
        .await?;
    Ok(content(article))
}

pub async fn generate_blog_title(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<GenerateBlogTitleRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let payload = json_body(payload)?;
    let title = deployment
        .creations()
        .generate_blog_title(&user.user_id, &payload.prompt)
        .await?;
    Ok(content(title))
}

pub async fn generate_image(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let payload = json_body(payload)?;
    let url = deployment
        .creations()
        .generate_image(&user.user_id, &payload.prompt, payload.publish)
        .await?;
    Ok(content(url))
}

pub async fn remove_background(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Result<TypedMultipart<RemoveBackgroundForm>, TypedMultipartError>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let form = multipart_body(form)?;
    let url = deployment
        .creations()
        .remove_background(&user.user_id, form.image.map(into_upload))
        .await?;
    Ok(content(url))
}

pub async fn remove_image_object(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Result<TypedMultipart<RemoveObjectForm>, TypedMultipartError>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let form = multipart_body(form)?;
    let object = form.object.unwrap_or_default();
    let url = deployment
        .creations()
        .remove_object(&user.user_id, form.image.map(into_upload), &object)
        .await?;
    Ok(content(url))
}

pub async fn resume_review(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    form: Result<TypedMultipart<ResumeReviewForm>, TypedMultipartError>,
) -> Result<ResponseJson<ApiResponse<ContentResponse>>, ApiError> {
    let form = multipart_body(form)?;
    let review = deployment
        .creations()
        .review_resume(&user.user_id, form.resume.map(into_upload))
        .await?;
    Ok(content(review))
}

pub async fn image_usage(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<ImageUsage>> {
    let usage = &deployment.config().image_usage;
    ResponseJson(ApiResponse::success(ImageUsage::current(
        usage.limit,
        usage.used,
    )))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/generate-article", post(generate_article))
        .route("/generate-blog-title", post(generate_blog_title))
        .route("/generate-images", post(generate_image))
        .route("/remove-background", post(remove_background))
        .route("/remove-image-object", post(remove_image_object))
        .route("/resume-review", post(resume_review))
        .route("/image-usage", get(image_usage))
}
