use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    middleware::from_fn_with_state,
};
use deployment::Deployment;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, middleware::require_auth};

pub mod ai;
pub mod health;
pub mod user;

/// Room for multipart boundaries and text fields on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

fn cors() -> CorsLayer {
    // Credentialed CORS cannot use a wildcard origin, so the caller's origin
    // is echoed back.
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

pub fn router(deployment: DeploymentImpl) -> Router {
    let body_limit = deployment.config().limits.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let protected = Router::new()
        .nest("/ai", ai::router())
        .nest("/user", user::router())
        .layer(from_fn_with_state(deployment.clone(), require_auth));

    Router::new()
        .nest("/api", health::router().merge(protected))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
