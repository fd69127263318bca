use std::path::Path;

use gateways::{
    image::{DEFAULT_HUGGINGFACE_BASE_URL, DEFAULT_HUGGINGFACE_MODEL},
    text::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Environment variables the server reads secrets and deployment settings from.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HOST: &str = "HOST";
pub const ENV_BACKEND_PORT: &str = "BACKEND_PORT";
pub const ENV_PORT: &str = "PORT";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";
pub const ENV_CLOUDINARY_CLOUD_NAME: &str = "CLOUDINARY_CLOUD_NAME";
pub const ENV_CLOUDINARY_API_KEY: &str = "CLOUDINARY_API_KEY";
pub const ENV_CLOUDINARY_API_SECRET: &str = "CLOUDINARY_API_SECRET";
pub const ENV_CLERK_JWT_KEY: &str = "CLERK_JWT_KEY";
pub const ENV_SENTRY_DSN: &str = "SENTRY_DSN";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite://vectorai.sqlite?mode=rwc".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TextModelConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TextModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageModelConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ImageModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_HUGGINGFACE_MODEL.to_string(),
            base_url: DEFAULT_HUGGINGFACE_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssetConfig {
    /// Cloud name; `CLOUDINARY_CLOUD_NAME` wins when set.
    pub cloud_name: String,
    /// API key; `CLOUDINARY_API_KEY` wins when set.
    pub api_key: String,
    pub folder: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            folder: Some("vectorai".to_string()),
            timeout_secs: 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Hard cap for any uploaded file, enforced by the multipart layer.
    pub max_upload_bytes: usize,
    pub max_resume_bytes: u64,
    pub max_prompt_chars: usize,
    pub max_object_chars: usize,
    pub pdf_extraction_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_resume_bytes: 5 * 1024 * 1024,
            max_prompt_chars: 4000,
            max_object_chars: 64,
            pdf_extraction_timeout_secs: 30,
        }
    }
}

/// Numbers shown by the image usage widget. Nothing enforces them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ImageUsageConfig {
    pub limit: u32,
    pub used: u32,
}

impl Default for ImageUsageConfig {
    fn default() -> Self {
        Self { limit: 15, used: 5 }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    /// Allowed `azp` claims. Empty accepts any origin.
    pub authorized_parties: Vec<String>,
}

/// Secrets only ever come from the environment.
#[derive(Debug, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<SecretString>,
    pub huggingface_api_key: Option<SecretString>,
    pub cloudinary_api_secret: Option<SecretString>,
    pub clerk_jwt_key: Option<SecretString>,
    pub sentry_dsn: Option<SecretString>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    pub text: TextModelConfig,
    pub image: ImageModelConfig,
    pub assets: AssetConfig,
    pub limits: LimitsConfig,
    pub image_usage: ImageUsageConfig,
    pub auth: AuthConfig,
    #[serde(skip)]
    pub secrets: Secrets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            environment: default_environment(),
            text: TextModelConfig::default(),
            image: ImageModelConfig::default(),
            assets: AssetConfig::default(),
            limits: LimitsConfig::default(),
            image_usage: ImageUsageConfig::default(),
            auth: AuthConfig::default(),
            secrets: Secrets::default(),
        }
    }
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config file is invalid, using defaults: {}", e);
                Config::default()
            }
        }
    }
}

/// Names of the externally supplied settings, split by whether they resolved.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnvReport {
    pub present: Vec<&'static str>,
    pub missing: Vec<&'static str>,
}

fn secret(value: Option<String>) -> Option<SecretString> {
    value
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

fn has_secret(value: &Option<SecretString>) -> bool {
    value
        .as_ref()
        .is_some_and(|secret| !secret.expose_secret().is_empty())
}

impl Config {
    /// Overlays environment settings. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.is_empty()) {
            self.database_url = url;
        }
        if let Some(host) = lookup(ENV_HOST).filter(|v| !v.is_empty()) {
            self.host = host;
        }
        let port = lookup(ENV_BACKEND_PORT).or_else(|| lookup(ENV_PORT));
        if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid port value {:?}", port),
            }
        }
        if let Some(cloud_name) = lookup(ENV_CLOUDINARY_CLOUD_NAME).filter(|v| !v.is_empty()) {
            self.assets.cloud_name = cloud_name;
        }
        if let Some(api_key) = lookup(ENV_CLOUDINARY_API_KEY).filter(|v| !v.is_empty()) {
            self.assets.api_key = api_key;
        }

        self.secrets = Secrets {
            gemini_api_key: secret(lookup(ENV_GEMINI_API_KEY)),
            huggingface_api_key: secret(lookup(ENV_HUGGINGFACE_API_KEY)),
            cloudinary_api_secret: secret(lookup(ENV_CLOUDINARY_API_SECRET)),
            clerk_jwt_key: secret(lookup(ENV_CLERK_JWT_KEY)),
            sentry_dsn: secret(lookup(ENV_SENTRY_DSN)),
        };
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_resume_bytes > self.limits.max_upload_bytes as u64 {
            return Err(ConfigError::ValidationError(
                "limits.max_resume_bytes cannot exceed limits.max_upload_bytes".to_string(),
            ));
        }
        if self.text.timeout_secs == 0
            || self.image.timeout_secs == 0
            || self.assets.timeout_secs == 0
            || self.limits.pdf_extraction_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn env_report(&self) -> EnvReport {
        let checks = [
            (ENV_DATABASE_URL, !self.database_url.is_empty()),
            (ENV_CLERK_JWT_KEY, has_secret(&self.secrets.clerk_jwt_key)),
            (ENV_GEMINI_API_KEY, has_secret(&self.secrets.gemini_api_key)),
            (ENV_HUGGINGFACE_API_KEY, has_secret(&self.secrets.huggingface_api_key)),
            (ENV_CLOUDINARY_CLOUD_NAME, !self.assets.cloud_name.is_empty()),
            (ENV_CLOUDINARY_API_KEY, !self.assets.api_key.is_empty()),
            (ENV_CLOUDINARY_API_SECRET, has_secret(&self.secrets.cloudinary_api_secret)),
        ];

        let mut report = EnvReport {
            present: Vec::new(),
            missing: Vec::new(),
        };
        for (name, present) in checks {
            if present {
                report.present.push(name);
            } else {
                report.missing.push(name);
            }
        }
        report
    }
}

/// Will always return config, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config_from_file(config_path: &Path) -> Config {
    match std::fs::read_to_string(config_path) {
        Ok(raw_config) => Config::from(raw_config),
        Err(_) => {
            tracing::info!("No config file at {}, using defaults", config_path.display());
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let config = Config::from(r#"{"port": 8080, "image": {"timeout_secs": 90}}"#.to_string());
        assert_eq!(config.port, 8080);
        assert_eq!(config.image.timeout_secs, 90);
        assert_eq!(config.image.model, DEFAULT_HUGGINGFACE_MODEL);
        assert_eq!(config.limits.max_resume_bytes, 5 * 1024 * 1024);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let config = Config::from("not json".to_string());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn env_overrides_file_and_fills_secrets() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (ENV_BACKEND_PORT, "4100"),
            (ENV_DATABASE_URL, "sqlite::memory:"),
            (ENV_GEMINI_API_KEY, "gem-key"),
            (ENV_CLOUDINARY_CLOUD_NAME, "demo"),
            (ENV_HUGGINGFACE_API_KEY, "   "),
        ]));

        assert_eq!(config.port, 4100);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.assets.cloud_name, "demo");
        assert_eq!(
            config.secrets.gemini_api_key.as_ref().unwrap().expose_secret(),
            "gem-key"
        );
        assert!(config.secrets.huggingface_api_key.is_none());
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_PORT, "not-a-port")]));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn env_report_lists_names_only() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_GEMINI_API_KEY, "gem-key")]));
        let report = config.env_report();
        assert!(report.present.contains(&ENV_GEMINI_API_KEY));
        assert!(report.present.contains(&ENV_DATABASE_URL));
        assert!(report.missing.contains(&ENV_CLERK_JWT_KEY));
        assert!(report.missing.contains(&ENV_CLOUDINARY_API_SECRET));
    }

    #[test]
    fn validate_rejects_resume_limit_above_upload_cap() {
        let mut config = Config::default();
        config.limits.max_resume_bytes = 20 * 1024 * 1024;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.assets.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.limits.pdf_extraction_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
