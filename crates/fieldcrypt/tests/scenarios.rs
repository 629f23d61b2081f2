//! End-to-end behaviour through the public API.

use std::sync::{Arc, OnceLock};

use fieldcrypt::{
    is_envelope, self_test, Config, EncryptedFieldRegistry, EncryptedRepository, Engine,
    FieldCipher, FieldInterceptor, FieldKind, KeyMaterial, MemoryRepository, Page, Record,
    Repository,
};
use serde_json::{json, Value};

fn engine() -> Engine {
    static CIPHER: OnceLock<Arc<FieldCipher>> = OnceLock::new();
    let cipher = CIPHER.get_or_init(|| {
        let cipher = FieldCipher::new(KeyMaterial::new(
            "scenario-master-secret-0123456789abcdef",
            "scenario-salt-0123456789abcdef012345",
        ));
        cipher.warm_up().unwrap();
        Arc::new(cipher)
    });
    Engine::new(Arc::clone(cipher), Arc::new(EncryptedFieldRegistry::builtin()))
}

fn rec(v: Value) -> Record {
    v.as_object().cloned().unwrap()
}

#[test]
fn startup_self_test_passes() {
    assert!(self_test(engine().cipher()));
}

#[test]
fn same_email_twice_yields_identical_envelopes() {
    let e = engine();
    let a = e.cipher().encrypt_value("test@example.com", FieldKind::Email).unwrap();
    let b = e.cipher().encrypt_value("test@example.com", FieldKind::Email).unwrap();
    assert_eq!(a, b);
}

#[test]
fn same_name_twice_yields_different_envelopes() {
    let e = engine();
    let a = e.cipher().encrypt_value("John Doe", FieldKind::Name).unwrap();
    let b = e.cipher().encrypt_value("John Doe", FieldKind::Name).unwrap();
    assert_ne!(a, b);
    let a: Value = serde_json::from_str(&a).unwrap();
    let b: Value = serde_json::from_str(&b).unwrap();
    assert_ne!(a["iv"], b["iv"]);
}

#[test]
fn envelope_wire_shape() {
    let env = engine()
        .cipher()
        .encrypt_value("198.51.100.1", FieldKind::IpAddress)
        .unwrap();
    let v: Value = serde_json::from_str(&env).unwrap();
    let keys: Vec<_> = v.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(v["version"], 1);
    for k in ["iv", "authTag", "encrypted"] {
        assert!(v[k].is_string(), "{k}");
    }
}

#[test]
fn weak_secret_refused_in_production() {
    let cfg = Config {
        app_env: "production".into(),
        encryption_master_secret: Some("short-one!".into()),
        encryption_salt: Some("a-salt-that-is-long-enough-0123456789".into()),
        field_registry_path: None,
        log_level: "info".into(),
        otel_exporter_otlp_endpoint: None,
    };
    assert!(Engine::from_config(&cfg).unwrap_err().is_fatal());
}

#[tokio::test]
async fn mixed_dataset_reads_without_error() {
    let e = engine();
    let raw = Arc::new(MemoryRepository::new());
    let stored = e.cipher().encrypt_value("a@b.com", FieldKind::Email).unwrap();
    raw.create("User", rec(json!({"id": "1", "email": stored})))
        .await
        .unwrap();
    raw.create("User", rec(json!({"id": "2", "email": "plain@b.com"})))
        .await
        .unwrap();

    let repo: EncryptedRepository<_> = e.wrap(Arc::clone(&raw));
    let rows = repo
        .find_many("User", &Record::new(), Page { offset: 0, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows[0]["email"], "a@b.com");
    assert_eq!(rows[1]["email"], "plain@b.com");

    let stats = repo.interceptor().stats().snapshot();
    assert_eq!(stats.fields_decrypted, 1);
    assert_eq!(stats.plaintext_passthrough, 1);
}

#[tokio::test]
async fn legacy_phone_migrates_and_reads_back_normalised() {
    let e = engine();
    let raw = Arc::new(MemoryRepository::new());
    raw.create("User", rec(json!({"id": "7", "phone": "555-1234"})))
        .await
        .unwrap();

    let report = e
        .migrator(Arc::clone(&raw))
        .migrate("User", &["phone"], 100)
        .await
        .unwrap();
    assert_eq!(report.updated, 1);

    let snap = raw.snapshot().await;
    assert!(is_envelope(snap["User"][0]["phone"].as_str().unwrap()));

    let row = e
        .wrap(Arc::clone(&raw))
        .find_one("User", &rec(json!({"phone": "555 1234"})))
        .await
        .unwrap()
        .expect("phone lookup should match migrated row");
    assert_eq!(row["phone"], "5551234");
}

#[tokio::test]
async fn migration_is_idempotent_and_resumable() {
    let e = engine();
    let raw = Arc::new(MemoryRepository::new());
    for i in 0..25 {
        raw.create(
            "ContactSubmission",
            rec(json!({
                "id": i.to_string(),
                "email": format!("c{i}@example.com"),
                "ipAddress": "203.0.113.5",
                "message": "hi"
            })),
        )
        .await
        .unwrap();
    }

    // A partial earlier run already encrypted the first rows through the app.
    let interceptor: FieldInterceptor = e.interceptor();
    let mut first = raw.snapshot().await["ContactSubmission"][0].clone();
    interceptor.encrypt_record("ContactSubmission", &mut first).unwrap();
    raw.update("ContactSubmission", "0", first).await.unwrap();

    let migrator = e.migrator(Arc::clone(&raw));
    let fields = ["email", "ipAddress"];
    let r1 = migrator.migrate("ContactSubmission", &fields, 10).await.unwrap();
    assert_eq!(r1.processed, 25);
    assert_eq!(r1.updated, 24);
    assert_eq!(r1.skipped, 1);
    assert_eq!(r1.batches, 3);

    let after = raw.snapshot().await;
    let r2 = migrator.migrate("ContactSubmission", &fields, 10).await.unwrap();
    assert_eq!(r2.updated, 0);
    assert_eq!(raw.snapshot().await, after);

    let rows = e
        .wrap(Arc::clone(&raw))
        .find_many("ContactSubmission", &Record::new(), Page { offset: 20, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["email"], "c20@example.com");
    assert_eq!(rows[0]["ipAddress"], "203.0.113.5");
    assert_eq!(rows[0]["message"], "hi");
}
