//! [`EncryptedFieldRegistry`]: which fields of which entity are encrypted, and how.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;

use super::kind::FieldKind;

/// Errors from building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The document is neither valid YAML nor valid JSON of the expected shape.
    #[error("failed to parse field registry: {0}")]
    Parse(String),

    /// An entity or field name is empty.
    #[error("field registry contains an empty name under entity {0:?}")]
    EmptyName(String),
}

/// Field names of one entity mapped to their kinds.
pub type EntityFields = BTreeMap<String, FieldKind>;

/// Static mapping from entity type to the fields the interceptor must encrypt.
///
/// Built once at startup and shared read-only behind an `Arc`.
///
/// # Document format
///
/// ```yaml
/// User:
///   email: email
///   phone: phone
///   name: name
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EncryptedFieldRegistry {
    entities: HashMap<String, EntityFields>,
}

impl EncryptedFieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The entities the application stores PII in.
    pub fn builtin() -> Self {
        Self::new()
            .with_field("User", "email", FieldKind::Email)
            .with_field("User", "name", FieldKind::Name)
            .with_field("User", "phone", FieldKind::Phone)
            .with_field("ContactSubmission", "email", FieldKind::Email)
            .with_field("ContactSubmission", "name", FieldKind::Name)
            .with_field("ContactSubmission", "phone", FieldKind::Phone)
            .with_field("ContactSubmission", "ipAddress", FieldKind::IpAddress)
            .with_field("NewsletterSubscriber", "email", FieldKind::Email)
            .with_field("NewsletterSubscriber", "ipAddress", FieldKind::IpAddress)
            .with_field("SequenceEnrollment", "email", FieldKind::Email)
            .with_field("SequenceEnrollment", "name", FieldKind::Name)
            .with_field("RateLimitEntry", "ipAddress", FieldKind::IpAddress)
    }

    /// Register `field` of `entity` as `kind`, replacing any earlier entry.
    pub fn with_field(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(field.into(), kind);
        self
    }

    /// Parse a registry document, trying YAML first and falling back to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] if neither format matches, or
    /// [`RegistryError::EmptyName`] if an entity or field name is blank.
    pub fn parse(text: &str) -> Result<Self, RegistryError> {
        let registry: Self = if let Ok(parsed) = serde_yaml::from_str(text) {
            parsed
        } else {
            serde_json::from_str(text).map_err(|e| RegistryError::Parse(e.to_string()))?
        };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        for (entity, fields) in &self.entities {
            if entity.trim().is_empty() || fields.keys().any(|f| f.trim().is_empty()) {
                return Err(RegistryError::EmptyName(entity.clone()));
            }
        }
        Ok(())
    }

    /// Registered fields of `entity`, if any.
    pub fn fields_for(&self, entity: &str) -> Option<&EntityFields> {
        self.entities.get(entity).filter(|f| !f.is_empty())
    }

    /// Kind of `field` on `entity`, if registered.
    pub fn kind_of(&self, entity: &str, field: &str) -> Option<FieldKind> {
        self.entities.get(entity)?.get(field).copied()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Return `true` if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over registered entity names.
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_user_fields() {
        let r = EncryptedFieldRegistry::builtin();
        assert_eq!(r.kind_of("User", "email"), Some(FieldKind::Email));
        assert_eq!(r.kind_of("User", "phone"), Some(FieldKind::Phone));
        assert_eq!(r.kind_of("User", "name"), Some(FieldKind::Name));
        assert_eq!(
            r.kind_of("ContactSubmission", "ipAddress"),
            Some(FieldKind::IpAddress)
        );
        assert_eq!(r.kind_of("User", "role"), None);
        assert!(r.fields_for("BlogPost").is_none());
    }

    #[test]
    fn parse_yaml() {
        let yaml = r#"
Customer:
  email: email
  nickname: generic
"#;
        let r = EncryptedFieldRegistry::parse(yaml).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.kind_of("Customer", "nickname"), Some(FieldKind::Generic));
    }

    #[test]
    fn parse_json() {
        let json = r#"{"Lead": {"phone": "phone", "ip": "ip_address"}}"#;
        let r = EncryptedFieldRegistry::parse(json).unwrap();
        assert_eq!(r.kind_of("Lead", "ip"), Some(FieldKind::IpAddress));
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        assert!(EncryptedFieldRegistry::parse(r#"{"Lead": {"ssn": "ssn"}}"#).is_err());
    }

    #[test]
    fn parse_rejects_empty_names() {
        let err = EncryptedFieldRegistry::parse(r#"{"Lead": {"": "email"}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName(_)));
    }

    #[test]
    fn with_field_replaces_kind() {
        let r = EncryptedFieldRegistry::new()
            .with_field("User", "contact", FieldKind::Email)
            .with_field("User", "contact", FieldKind::Phone);
        assert_eq!(r.kind_of("User", "contact"), Some(FieldKind::Phone));
    }
}
