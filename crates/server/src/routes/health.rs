use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use deployment::Deployment;
use serde::Serialize;
use services::services::config::EnvReport;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub message: String,
    pub version: String,
}

pub async fn health_check() -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        message: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Which settings resolved, by name only.
pub async fn env_report(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<EnvReport>> {
    ResponseJson(ApiResponse::success(deployment.config().env_report()))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/env", get(env_report))
}
