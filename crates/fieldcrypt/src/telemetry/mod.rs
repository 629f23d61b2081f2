//! Structured logging, plus OpenTelemetry traces and metrics when an OTLP
//! endpoint is configured.
//!
//! # Telemetry invariants
//!
//! - **No PII, envelope content or key material** in any span attribute,
//!   metric label, or log field. Entity names, field names, record ids and
//!   counts only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::init_telemetry;
