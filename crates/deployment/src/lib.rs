use std::sync::Arc;

use db::DBService;
use services::services::{
    config::{Config, ConfigError},
    creation::CreationService,
    identity::{IdentityError, IdentityVerifier},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Invalid vendor URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Everything a request handler needs, assembled once at startup.
pub trait Deployment: Clone + Send + Sync + 'static {
    fn config(&self) -> &Arc<Config>;

    fn db(&self) -> &DBService;

    fn identity(&self) -> &Arc<dyn IdentityVerifier>;

    fn creations(&self) -> &CreationService;
}
