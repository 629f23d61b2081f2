//! `pii-migrate`: encrypt legacy plaintext PII in a JSON export.
//!
//! Startup sequence:
//! 1. Load and validate engine and migration configuration.
//! 2. Initialise telemetry.
//! 3. Build the engine and run the cipher self-test.
//! 4. Load the export into an in-memory store.
//! 5. Migrate the requested fields; Ctrl+C stops between batches.
//! 6. Write the export back and report.

mod config;
mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fieldcrypt::{self_test, telemetry, Config, Engine};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use config::MigrateConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;
    let mcfg = MigrateConfig::from_env().map_err(|e| {
        eprintln!("ERROR: migration configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level, cfg.otel_exporter_otlp_endpoint.as_deref())?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        entity = %mcfg.migration_entity,
        "pii-migrate starting"
    );

    // -----------------------------------------------------------------------
    // 3. Engine + self-test
    // -----------------------------------------------------------------------
    let engine = Engine::from_config(&cfg).context("field encryption engine failed to start")?;
    if !self_test(engine.cipher()) {
        error!("cipher self-test failed; refusing to touch data");
        bail!("cipher self-test failed");
    }

    // -----------------------------------------------------------------------
    // 4. Load export
    // -----------------------------------------------------------------------
    let path = Path::new(&mcfg.migration_input);
    let repo = Arc::new(store::load(path).await?);

    // -----------------------------------------------------------------------
    // 5. Migrate
    // -----------------------------------------------------------------------
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received Ctrl+C; stopping after the current batch");
            on_signal.cancel();
        }
    });

    let fields = mcfg.fields();
    let report = engine
        .migrator(Arc::clone(&repo))
        .with_cancellation(cancel)
        .migrate(&mcfg.migration_entity, fields.as_slice(), mcfg.migration_batch_size)
        .await?;

    // -----------------------------------------------------------------------
    // 6. Persist + report
    // -----------------------------------------------------------------------
    store::save(&repo, path).await?;
    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "migration report"
    );
    if report.failed > 0 {
        warn!(failed = report.failed, "some records were left unmigrated; re-run to retry");
    }
    Ok(())
}
