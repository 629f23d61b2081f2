//! Configuration of the migration run.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated `pii-migrate` configuration.
///
/// Engine settings (secret, salt, registry, logging) are read separately by
/// [`fieldcrypt::Config`].
#[derive(Debug, Clone, Deserialize)]
pub struct MigrateConfig {
    /// JSON export to migrate in place. **Required.**
    pub migration_input: String,

    /// Entity type to migrate, e.g. `User`. **Required.**
    pub migration_entity: String,

    /// Comma-separated field names. **Required.**
    pub migration_fields: String,

    /// Records per batch.
    #[serde(default = "default_batch_size")]
    pub migration_batch_size: usize,
}

fn default_batch_size() -> usize {
    100
}

impl MigrateConfig {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build migration configuration")?;

        let c: MigrateConfig = cfg
            .try_deserialize()
            .context("failed to deserialise migration configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Field names parsed from `MIGRATION_FIELDS`.
    pub fn fields(&self) -> Vec<String> {
        self.migration_fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned)
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.migration_input.trim().is_empty() {
            anyhow::bail!("MIGRATION_INPUT is required and must not be empty");
        }
        if self.migration_entity.trim().is_empty() {
            anyhow::bail!("MIGRATION_ENTITY is required and must not be empty");
        }
        if self.fields().is_empty() {
            anyhow::bail!("MIGRATION_FIELDS must name at least one field");
        }
        if self.migration_batch_size == 0 {
            anyhow::bail!("MIGRATION_BATCH_SIZE must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(fields: &str, batch: usize) -> MigrateConfig {
        MigrateConfig {
            migration_input: "export.json".into(),
            migration_entity: "User".into(),
            migration_fields: fields.into(),
            migration_batch_size: batch,
        }
    }

    #[test]
    fn defaults() {
        assert_eq!(default_batch_size(), 100);
    }

    #[test]
    fn fields_are_split_and_trimmed() {
        assert_eq!(cfg(" email, name ,,phone", 10).fields(), ["email", "name", "phone"]);
    }

    #[test]
    fn validate_rejects_empty_fields() {
        assert!(cfg(" , ", 10).validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch() {
        assert!(cfg("email", 0).validate().is_err());
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(cfg("email,name", 100).validate().is_ok());
    }
}
