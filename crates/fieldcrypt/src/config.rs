//! Configuration loading and validation for the field-encryption engine.
//!
//! All values are read from environment variables at startup. In production a
//! missing or weak master secret or salt is fatal; elsewhere missing values fall
//! back to development constants with a warning.

use anyhow::{Context, Result};
use common::FieldCryptoError;
use serde::Deserialize;
use tracing::warn;

use crate::keys::KeyMaterial;

/// Minimum length of the master secret and of the salt.
pub const MIN_SECRET_LEN: usize = 32;

const DEV_MASTER_SECRET: &str = "dev-only-master-secret-never-use-in-production";
const DEV_SALT: &str = "dev-only-salt-never-use-in-production-0000";

/// Engine configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Deployment environment; `production` or `prod` enables strict checks.
    #[serde(default = "default_app_env")]
    pub app_env: String,

    /// Secret every field key is derived from. **Required in production.**
    #[serde(default)]
    pub encryption_master_secret: Option<String>,

    /// PBKDF2 salt. **Required in production.**
    #[serde(default)]
    pub encryption_salt: Option<String>,

    /// YAML or JSON registry file replacing the built-in field table.
    #[serde(default)]
    pub field_registry_path: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint; logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_app_env() -> String {
    "development".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Whether strict production rules apply.
    pub fn is_production(&self) -> bool {
        matches!(
            self.app_env.trim().to_ascii_lowercase().as_str(),
            "production" | "prod"
        )
    }

    /// Check the secret and salt without falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FieldCryptoError::Configuration`] for a value shorter than
    /// [`MIN_SECRET_LEN`], or a missing value in production.
    pub fn validate(&self) -> Result<(), FieldCryptoError> {
        check_secret(
            self.encryption_master_secret.as_deref(),
            "ENCRYPTION_MASTER_SECRET",
            self.is_production(),
        )?;
        check_secret(
            self.encryption_salt.as_deref(),
            "ENCRYPTION_SALT",
            self.is_production(),
        )?;
        Ok(())
    }

    /// Validated key material, with development fallbacks outside production.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Config::validate`].
    pub fn key_material(&self) -> Result<KeyMaterial, FieldCryptoError> {
        self.validate()?;
        let secret = match self.encryption_master_secret.as_deref() {
            Some(s) => s,
            None => {
                warn!("ENCRYPTION_MASTER_SECRET not set; using development default");
                DEV_MASTER_SECRET
            }
        };
        let salt = match self.encryption_salt.as_deref() {
            Some(s) => s,
            None => {
                warn!("ENCRYPTION_SALT not set; using development default");
                DEV_SALT
            }
        };
        Ok(KeyMaterial::new(secret, salt))
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("app_env", &self.app_env)
            .field("encryption_master_secret", &redact(&self.encryption_master_secret))
            .field("encryption_salt", &redact(&self.encryption_salt))
            .field("field_registry_path", &self.field_registry_path)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

fn check_secret(value: Option<&str>, name: &str, production: bool) -> Result<(), FieldCryptoError> {
    match value {
        Some(v) if v.chars().count() < MIN_SECRET_LEN => Err(FieldCryptoError::Configuration(
            format!("{name} must be at least {MIN_SECRET_LEN} characters"),
        )),
        Some(_) => Ok(()),
        None if production => Err(FieldCryptoError::Configuration(format!(
            "{name} is required in production"
        ))),
        None => Ok(()),
    }
}
