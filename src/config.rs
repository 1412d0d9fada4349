//! Runtime configuration and credential resolution.
//!
//! A [`Config`] is constructed explicitly at startup and passed by reference
//! into each component; nothing in this crate reads ambient global state after
//! construction. Credentials resolve in two layers (later loses):
//!
//! 1. A direct environment variable override.
//! 2. A named secret fetched through the [`SecretStore`] boundary.
//!
//! Missing both is a fatal [`ConfigError`], surfaced immediately and never
//! retried.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::loader::DEFAULT_ENDPOINT_URL;
use crate::types::AssetLocation;

/// Errors raised while resolving configuration or credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credential {name} is not set and no secret name is configured")]
    MissingCredential { name: String },

    #[error("failed to retrieve secret {name}: {message}")]
    Secret { name: String, message: String },

    #[error("secret {name} is missing the {field} field")]
    MalformedSecret { name: String, field: String },
}

/// Boundary trait over an external secret manager.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret payload by name. Payloads are JSON objects.
    async fn get_secret(&self, name: &str) -> Result<serde_json::Value, ConfigError>;
}

/// Secret store for environments that configure everything through env vars.
/// Every lookup fails, which makes the env override the only resolution path.
#[derive(Debug, Clone, Default)]
pub struct EnvOnlySecrets;

#[async_trait]
impl SecretStore for EnvOnlySecrets {
    async fn get_secret(&self, name: &str) -> Result<serde_json::Value, ConfigError> {
        Err(ConfigError::Secret {
            name: name.to_string(),
            message: "no secret store configured".to_string(),
        })
    }
}

/// Chat platform credentials: bot token plus request-signing secret.
#[derive(Debug, Clone)]
pub struct ChatCredentials {
    pub bot_token: String,
    pub signing_secret: Option<String>,
}

/// Explicit runtime configuration, read once from the environment.
#[derive(Clone)]
pub struct Config {
    pub bucket_name: Option<String>,
    pub assets_root: String,
    pub endpoint_url: String,
    secrets: Arc<dyn SecretStore>,
}

impl Config {
    /// Environment variable naming the application bucket.
    pub const BUCKET_VAR: &'static str = "APP_BUCKET_NAME";
    /// Environment variable naming the assets prefix / local root.
    pub const ASSETS_ROOT_VAR: &'static str = "ASSETS_ROOT_PATH";
    /// Environment variable overriding the object-store endpoint URL.
    pub const ENDPOINT_VAR: &'static str = "OBJECT_STORE_ENDPOINT_URL";

    /// Build a configuration from the process environment, loading a `.env`
    /// file first when one exists.
    pub fn from_env(secrets: Arc<dyn SecretStore>) -> Self {
        dotenvy::dotenv().ok();
        Self {
            bucket_name: std::env::var(Self::BUCKET_VAR).ok().filter(|v| !v.is_empty()),
            assets_root: std::env::var(Self::ASSETS_ROOT_VAR)
                .unwrap_or_else(|_| "assets".to_string()),
            endpoint_url: std::env::var(Self::ENDPOINT_VAR)
                .unwrap_or_else(|_| DEFAULT_ENDPOINT_URL.to_string()),
            secrets,
        }
    }

    /// Build a configuration from explicit values, for callers that do not
    /// want environment coupling (tests, embedding applications).
    pub fn new(
        bucket_name: Option<String>,
        assets_root: impl Into<String>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            bucket_name,
            assets_root: assets_root.into(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            secrets,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Resolve the primary asset location: the configured bucket when one
    /// exists, otherwise the local assets root.
    pub fn primary_asset_location(&self) -> AssetLocation {
        match &self.bucket_name {
            Some(bucket) => AssetLocation::bucket(bucket.clone(), self.assets_root.clone()),
            None => AssetLocation::local(&self.assets_root),
        }
    }

    /// Resolve a credential: `env_var` override first, else the secret named
    /// by `secret_name_var`, reading its `apiKey` field.
    pub async fn credential(
        &self,
        env_var: &str,
        secret_name_var: &str,
    ) -> Result<String, ConfigError> {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                return Ok(value);
            }
        }
        let secret_name =
            std::env::var(secret_name_var).map_err(|_| ConfigError::MissingCredential {
                name: env_var.to_string(),
            })?;
        let secret = self.secrets.get_secret(&secret_name).await?;
        secret
            .get("apiKey")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MalformedSecret {
                name: secret_name,
                field: "apiKey".to_string(),
            })
    }

    /// Model provider credential.
    pub async fn model_credential(&self) -> Result<String, ConfigError> {
        self.credential("MODEL_API_KEY", "MODEL_API_KEY_SECRET_NAME")
            .await
    }

    /// Vector index credential.
    pub async fn index_credential(&self) -> Result<String, ConfigError> {
        self.credential("INDEX_API_KEY", "INDEX_API_KEY_SECRET_NAME")
            .await
    }

    /// Chat platform bot token and signing secret. The env override carries no
    /// signing secret; the secret payload carries both.
    pub async fn chat_credentials(&self) -> Result<ChatCredentials, ConfigError> {
        if let Ok(token) = std::env::var("CHAT_BOT_TOKEN") {
            if !token.is_empty() {
                return Ok(ChatCredentials {
                    bot_token: token,
                    signing_secret: std::env::var("CHAT_SIGNING_SECRET").ok(),
                });
            }
        }
        let secret_name = std::env::var("CHAT_BOT_TOKEN_SECRET_NAME").map_err(|_| {
            ConfigError::MissingCredential {
                name: "CHAT_BOT_TOKEN".to_string(),
            }
        })?;
        let secret = self.secrets.get_secret(&secret_name).await?;
        let bot_token = secret
            .get("apiKey")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MalformedSecret {
                name: secret_name.clone(),
                field: "apiKey".to_string(),
            })?;
        let signing_secret = secret
            .get("signingSecret")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Ok(ChatCredentials {
            bot_token,
            signing_secret,
        })
    }
}
