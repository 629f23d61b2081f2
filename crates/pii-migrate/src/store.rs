//! JSON export file ↔ [`MemoryRepository`].
//!
//! The export is an object of entity name → array of record objects:
//! `{"User": [{"id": "1", "email": "..."}]}`.

use std::path::Path;

use anyhow::{Context, Result};
use fieldcrypt::repository::memory::Snapshot;
use fieldcrypt::MemoryRepository;
use tracing::{debug, info};

/// Read an export into a fresh in-memory store.
pub async fn load(path: &Path) -> Result<MemoryRepository> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read export {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&text)
        .with_context(|| format!("export {} is not an entity → records object", path.display()))?;
    info!(
        path = %path.display(),
        entities = snapshot.len(),
        records = snapshot.values().map(Vec::len).sum::<usize>(),
        "export loaded"
    );
    Ok(MemoryRepository::from_snapshot(snapshot))
}

/// Write `repo` back to `path`, replacing it atomically.
pub async fn save(repo: &MemoryRepository, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(&repo.snapshot().await)
        .context("failed to serialise export")?;

    // Write to a sibling temp file, then rename over the original.
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &content)
        .await
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("failed to replace {}", path.display()))?;

    debug!(path = %path.display(), bytes = content.len(), "export saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcrypt::Repository;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_load_keeps_records_and_order() {
        let path = std::env::temp_dir().join(format!("export-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(
            &path,
            json!({"User": [{"id": "1", "email": "a@x"}, {"id": "2", "email": "b@x"}]}).to_string(),
        )
        .await
        .unwrap();

        let repo = load(&path).await.unwrap();
        repo.update("User", "2", json!({"email": "c@x"}).as_object().cloned().unwrap())
            .await
            .unwrap();
        save(&repo, &path).await.unwrap();

        let reloaded = load(&path).await.unwrap().snapshot().await;
        assert_eq!(reloaded["User"][0]["email"], "a@x");
        assert_eq!(reloaded["User"][1]["email"], "c@x");
        assert!(!path.with_extension("json.tmp").exists());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn load_rejects_non_object_export() {
        let path = std::env::temp_dir().join(format!("export-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "[1, 2, 3]").await.unwrap();
        assert!(load(&path).await.is_err());
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
