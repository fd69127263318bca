use axum::{
    Extension, Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::creation::{Creation, CreationStats};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{gallery, identity::AuthenticatedUser};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ToggleLikeRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize, TS)]
pub struct CreationsResponse {
    pub creations: Vec<Creation>,
}

pub async fn get_user_creations(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<CreationsResponse>>, ApiError> {
    let creations = gallery::list_owned(&deployment.db().pool, &user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(CreationsResponse {
        creations,
    })))
}

pub async fn get_published_creations(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<CreationsResponse>>, ApiError> {
    let creations = gallery::list_published(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(CreationsResponse {
        creations,
    })))
}

pub async fn toggle_like_creation(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<ToggleLikeRequest>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("Invalid creation id".into()))?;
    let outcome = gallery::toggle_like(&deployment.db().pool, &user.user_id, payload.id).await?;
    Ok(ResponseJson(ApiResponse::ok_message(outcome.message())))
}

pub async fn delete_creation(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::BadRequest("Invalid creation id".into()))?;
    gallery::delete_one(&deployment.db().pool, &user.user_id, id).await?;
    Ok(ResponseJson(ApiResponse::ok_message(
        "Creation deleted successfully",
    )))
}

pub async fn clear_all_creations(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    gallery::delete_all(&deployment.db().pool, &user.user_id).await?;
    Ok(ResponseJson(ApiResponse::ok_message(
        "All creations cleared successfully",
    )))
}

pub async fn creation_stats(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ResponseJson<ApiResponse<CreationStats>>, ApiError> {
    let stats = gallery::creation_stats(&deployment.db().pool, &user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/get-user-creations", get(get_user_creations))
        .route("/get-published-creations", get(get_published_creations))
        .route("/toggle-like-creation", post(toggle_like_creation))
        .route("/delete-creation/{id}", delete(delete_creation))
        .route("/clear-all-creations", delete(clear_all_creations))
        .route("/creation-stats", get(creation_stats))
}
