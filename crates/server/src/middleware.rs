use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use deployment::Deployment;
use services::services::identity::bearer_token;

use crate::{DeploymentImpl, error::ApiError};

/// Verifies the bearer session token and exposes the caller as an
/// `Extension<AuthenticatedUser>` to downstream handlers.
pub async fn require_auth(
    State(deployment): State<DeploymentImpl>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Owned so no borrow of the request is held across the await.
    let token = {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        bearer_token(header)?.to_string()
    };
    let user = deployment.identity().verify(&token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
