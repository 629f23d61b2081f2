//! `fieldcrypt`: field-level encryption of PII at rest.
//!
//! Startup order for an embedding service:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise telemetry with [`telemetry::init_telemetry`].
//! 3. Build the [`Engine`] (key material, derived-key cache, field registry).
//! 4. Run [`selftest::self_test`] and refuse to start on failure.
//! 5. Wrap the data layer with [`Engine::wrap`]; migrate legacy rows with
//!    [`Engine::migrator`].

pub mod config;
pub mod crypto;
pub mod engine;
pub mod field_cipher;
pub mod interceptor;
pub mod keys;
pub mod migration;
pub mod registry;
pub mod repository;
pub mod selftest;
pub mod telemetry;

pub use common::{Action, FieldCryptoError, Filter, Operation, Record};
pub use config::Config;
pub use crypto::{is_envelope, EncryptedEnvelope};
pub use engine::Engine;
pub use field_cipher::{DecryptOptions, EncryptOptions, FieldCipher};
pub use interceptor::{EncryptedRepository, FieldInterceptor, StatsSnapshot};
pub use keys::KeyMaterial;
pub use migration::{MigrationReport, Migrator};
pub use registry::{EncryptedFieldRegistry, FieldKind};
pub use repository::{MemoryRepository, Page, Repository};
pub use selftest::self_test;
