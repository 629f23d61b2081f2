//! Wire and hook types exchanged between the encryption engine and the data layer.
//!
//! The envelope shape is persisted in place of plaintext column values and must
//! stay stable across implementations.

use serde::{Deserialize, Serialize};

/// One stored record: a JSON object whose `id` key holds the record identifier.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Equality filter: field name → literal, `{"equals": literal}` or `{"in": [literal, ...]}`.
pub type Filter = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Encrypted envelope
// ---------------------------------------------------------------------------

/// Serialized form of an encrypted field value.
///
/// ```json
/// {"iv":"<base64>","authTag":"<base64>","encrypted":"<base64>","version":1}
/// ```
///
/// All byte fields use standard, padded base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeWire {
    /// Base64 IV (16 bytes randomized, 12 bytes deterministic).
    pub iv: String,
    /// Base64 GCM authentication tag (16 bytes).
    #[serde(rename = "authTag")]
    pub auth_tag: String,
    /// Base64 ciphertext.
    pub encrypted: String,
    /// Envelope format generation.
    pub version: u32,
}

// ---------------------------------------------------------------------------
// Interceptor hook contract
// ---------------------------------------------------------------------------

/// Kind of data-layer operation seen by the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Insert a new record.
    Create,
    /// Modify an existing record.
    Update,
    /// Fetch at most one record matching a filter.
    FindOne,
    /// Fetch every record matching a filter.
    FindMany,
}

impl Action {
    /// Returns `true` for operations carrying write data.
    pub fn is_write(self) -> bool {
        matches!(self, Action::Create | Action::Update)
    }
}

/// An operation about to be executed against the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// What the caller is doing.
    pub action: Action,
    /// Entity type name, e.g. `"User"`.
    pub model: String,
    /// Write payload for `create` / `update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    /// Read filter (also the `where` clause of an update).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

impl Operation {
    /// Build an operation with no payload sections.
    pub fn new(action: Action, model: impl Into<String>) -> Self {
        Self {
            action,
            model: model.into(),
            data: None,
            filter: None,
        }
    }

    /// Attach a write payload.
    pub fn with_data(mut self, data: Record) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a read filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}
