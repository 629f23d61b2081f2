//! [`FieldKind`]: the semantic type of a protected field and its encryption policy.

use serde::{Deserialize, Serialize};

use crate::field_cipher::{DecryptOptions, EncryptOptions};

/// Semantic category of a PII field.
///
/// Each kind fixes the key-derivation context, whether the field is encrypted
/// deterministically, and how a value is normalised before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Email address. Deterministic: equality lookups must work.
    Email,
    /// Phone number. Deterministic: equality lookups must work.
    Phone,
    /// Person name. Randomized.
    Name,
    /// Client IP address. Randomized.
    IpAddress,
    /// Any other sensitive string. Randomized.
    Generic,
}

impl FieldKind {
    /// Every kind, in a stable order.
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Email,
        FieldKind::Phone,
        FieldKind::Name,
        FieldKind::IpAddress,
        FieldKind::Generic,
    ];

    /// Key-derivation context for this kind.
    pub fn context(self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Name => "name",
            FieldKind::IpAddress => "ip_address",
            FieldKind::Generic => "generic",
        }
    }

    /// Whether values of this kind are encrypted deterministically.
    pub fn is_deterministic(self) -> bool {
        matches!(self, FieldKind::Email | FieldKind::Phone)
    }

    /// Canonical form of `value` before encryption.
    ///
    /// Deterministic kinds must normalise so that formatting differences do not
    /// defeat equality lookups.
    pub fn normalize(self, value: &str) -> String {
        match self {
            FieldKind::Email => value.trim().to_ascii_lowercase(),
            FieldKind::Phone => normalize_phone(value),
            FieldKind::Name | FieldKind::IpAddress => value.trim().to_owned(),
            FieldKind::Generic => value.to_owned(),
        }
    }

    /// Cipher options for encrypting a value of this kind.
    pub fn encrypt_options(self) -> EncryptOptions<'static> {
        EncryptOptions {
            deterministic: self.is_deterministic(),
            context: self.context(),
            aad: None,
        }
    }

    /// Cipher options for decrypting a value of this kind.
    pub fn decrypt_options(self) -> DecryptOptions<'static> {
        DecryptOptions {
            context: self.context(),
            aad: None,
        }
    }
}

/// Keep digits and a single leading `+`.
fn normalize_phone(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(char::is_ascii_digit));
    if out == "+" {
        out.clear();
    }
    out
}
