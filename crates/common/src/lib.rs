//! Error taxonomy and wire types shared across the field-encryption crates.

pub mod error;
pub mod protocol;

pub use error::FieldCryptoError;
pub use protocol::{Action, EnvelopeWire, Filter, Operation, Record};
