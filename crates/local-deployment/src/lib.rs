use std::{path::PathBuf, sync::Arc, time::Duration};

use db::DBService;
use deployment::{Deployment, DeploymentError};
use gateways::{
    assets::CloudinaryAssetHost, http_client, image::HuggingFaceImageGenerator,
    text::GeminiTextGenerator,
};
use secrecy::{ExposeSecret, SecretString};
use services::services::{
    config::{Config, load_config_from_file},
    creation::{CreationLimits, CreationService, Gateways},
    identity::{ClerkJwtVerifier, IdentityVerifier},
    pdf::PdfExtract,
};
use url::Url;

/// Optional JSON file with non-secret settings.
pub const CONFIG_PATH_ENV: &str = "VECTORAI_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "vectorai.config.json";

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    db: DBService,
    identity: Arc<dyn IdentityVerifier>,
    creations: CreationService,
}

fn secret_or_empty(secret: &Option<SecretString>) -> SecretString {
    SecretString::from(
        secret
            .as_ref()
            .map(|secret| secret.expose_secret().to_string())
            .unwrap_or_default(),
    )
}

impl LocalDeployment {
    /// Wires real vendor clients from `config`.
    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        config.validate()?;

        let db = DBService::new(&config.database_url).await?;

        let identity: Arc<dyn IdentityVerifier> = match &config.secrets.clerk_jwt_key {
            Some(key) => Arc::new(
                ClerkJwtVerifier::from_pem(key)?
                    .with_authorized_parties(config.auth.authorized_parties.clone()),
            ),
            None => {
                tracing::warn!("CLERK_JWT_KEY is not set; every authenticated route will reject");
                Arc::new(ClerkJwtVerifier::unconfigured())
            }
        };

        let text_client = http_client(Duration::from_secs(config.text.timeout_secs))?;
        let image_client = http_client(Duration::from_secs(config.image.timeout_secs))?;
        let asset_client = http_client(Duration::from_secs(config.assets.timeout_secs))?;

        let gateways = Gateways {
            text: Arc::new(GeminiTextGenerator::new(
                text_client,
                secret_or_empty(&config.secrets.gemini_api_key),
                config.text.model.clone(),
                Url::parse(&config.text.base_url)?,
            )),
            image: Arc::new(HuggingFaceImageGenerator::new(
                image_client,
                secret_or_empty(&config.secrets.huggingface_api_key),
                config.image.model.clone(),
                Url::parse(&config.image.base_url)?,
            )),
            assets: Arc::new(
                CloudinaryAssetHost::new(
                    asset_client,
                    config.assets.cloud_name.clone(),
                    config.assets.api_key.clone(),
                    secret_or_empty(&config.secrets.cloudinary_api_secret),
                )?
                .with_folder(config.assets.folder.clone()),
            ),
            pdf: Arc::new(PdfExtract),
        };

        let missing = config.env_report().missing;
        if !missing.is_empty() {
            tracing::warn!("Missing environment settings: {}", missing.join(", "));
        }

        Ok(Self::from_parts(config, db, identity, gateways))
    }

    /// Assembles a deployment from already-built collaborators.
    pub fn from_parts(
        config: Config,
        db: DBService,
        identity: Arc<dyn IdentityVerifier>,
        gateways: Gateways,
    ) -> Self {
        let creations = CreationService::new(
            db.pool.clone(),
            gateways,
            CreationLimits::from_config(&config),
        );
        Self {
            config: Arc::new(config),
            db,
            identity,
            creations,
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Config file (if any) overlaid with the process environment.
pub fn load_config() -> Config {
    let mut config = load_config_from_file(&config_path());
    config.apply_env(|key| std::env::var(key).ok());
    config
}

impl Deployment for LocalDeployment {
    fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn identity(&self) -> &Arc<dyn IdentityVerifier> {
        &self.identity
    }

    fn creations(&self) -> &CreationService {
        &self.creations
    }
}

#[cfg(test)]
mod tests {
    use deployment::Deployment;
    use services::services::config::Config;

    use super::LocalDeployment;

    #[tokio::test]
    async fn builds_without_vendor_credentials() {
        let mut config = Config::default();
        config.database_url = "sqlite::memory:".to_string();

        let deployment = LocalDeployment::from_config(config)
            .await
            .expect("deployment");
        assert_eq!(deployment.config().port, 3000);
        assert!(deployment.identity().verify("token").await.is_err());
    }
}
