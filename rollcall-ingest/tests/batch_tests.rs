//! Batch runner tests over payload files and a file-backed database

use rollcall_common::db::init_database;
use rollcall_ingest::{
    ingest_document, run_batch, BatchOptions, EventHeader, EventStatus, Recompute, SqliteStore,
};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

async fn file_store(dir: &TempDir) -> SqliteStore {
    let pool = init_database(&dir.path().join("rollcall.db")).await.unwrap();
    SqliteStore::new(pool)
}

fn ballot(uid: &str, for_voters: &[&str], against_voters: &[&str]) -> String {
    let votants = |ids: &[&str]| -> serde_json::Value {
        ids.iter().map(|id| json!({"acteurRef": id})).collect::<Vec<_>>().into()
    };

    json!({"scrutin": {
        "uid": uid,
        "ventilationVotes": {"organe": {"groupes": {"groupe": {
            "organeRef": "PO1",
            "vote": {"decompteNominatif": {
                "pours": {"votant": votants(for_voters)},
                "contres": {"votant": votants(against_voters)}
            }}
        }}}}
    }})
    .to_string()
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_batch_ingests_every_event() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let paths = vec![
        write_file(&dir, "v1.json", &ballot("V1", &["PA1", "PA2"], &["PA3"])),
        write_file(&dir, "v2.json", &ballot("V2", &["PA1"], &["PA2", "PA3"])),
        write_file(&dir, "v3.json", &ballot("V3", &["PA1", "PA2", "PA3"], &[])),
    ];

    let options = BatchOptions { concurrency: 3, skip_unchanged: false };
    let report = run_batch(&store, paths.clone(), &options).await;

    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.totals.upserted, 9);
    // Reports come back in input order
    let reported: Vec<PathBuf> = report.events.iter().map(|e| e.path.clone()).collect();
    assert_eq!(reported, paths);

    let v2 = store.load_event("V2").await.unwrap().unwrap();
    assert_eq!(v2.votes_for, Some(1));
    assert_eq!(v2.votes_against, Some(2));
    assert_eq!(v2.outcome_code.as_deref(), Some("rejected"));

    let v3 = store.load_event("V3").await.unwrap().unwrap();
    assert_eq!(v3.outcome_code.as_deref(), Some("adopted"));
}

#[tokio::test]
async fn test_bad_event_does_not_abort_batch() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let paths = vec![
        write_file(&dir, "broken.json", "{\"scrutin\": {"),
        write_file(&dir, "no_uid.json", "{\"scrutin\": {\"numero\": \"4\"}}"),
        dir.path().join("missing.json"),
        write_file(&dir, "good.json", &ballot("V9", &["PA1"], &[])),
    ];

    let report = run_batch(&store, paths, &BatchOptions::default()).await;

    assert_eq!(report.failed(), 3);
    assert_eq!(report.succeeded(), 1);
    assert!(!report.all_failed());
    assert!(report.events[0].event_id.is_none());
    assert!(matches!(report.events[0].status, EventStatus::Failed(_)));
    assert_eq!(report.events[3].event_id.as_deref(), Some("V9"));
    assert!(store.load_event("V9").await.unwrap().is_some());
}

#[tokio::test]
async fn test_all_failed_batch() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let paths = vec![write_file(&dir, "a.json", "not json")];

    let report = run_batch(&store, paths, &BatchOptions::default()).await;

    assert!(report.all_failed());
}

#[tokio::test]
async fn test_skip_unchanged_payload() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let path = write_file(&dir, "v1.json", &ballot("V1", &["PA1"], &["PA2", "PA3"]));
    let options = BatchOptions { concurrency: 1, skip_unchanged: true };

    let first = run_batch(&store, vec![path.clone()], &options).await;
    assert_eq!(first.succeeded(), 1);

    let second = run_batch(&store, vec![path.clone()], &options).await;
    assert_eq!(second.unchanged(), 1);
    assert_eq!(second.events[0].status, EventStatus::Unchanged);

    std::fs::write(&path, ballot("V1", &["PA1", "PA4"], &["PA2", "PA3"])).unwrap();
    let third = run_batch(&store, vec![path], &options).await;
    assert_eq!(third.succeeded(), 1);
    assert_eq!(store.load_event("V1").await.unwrap().unwrap().votes_for, Some(2));
}

#[tokio::test]
async fn test_header_without_votes_is_not_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let content = ballot("V1", &["PA1", "PA2"], &["PA3"]);
    let path = write_file(&dir, "v1.json", &content);

    // Header stored, then the run stopped before any vote
    let payload: serde_json::Value = serde_json::from_str(&content).unwrap();
    let header = EventHeader::from_payload(&payload).unwrap();
    store.upsert_event_header(&header, &content).await.unwrap();
    assert_eq!(store.stored_digest("V1").await.unwrap(), None);

    let options = BatchOptions { concurrency: 1, skip_unchanged: true };
    let report = run_batch(&store, vec![path], &options).await;

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.unchanged(), 0);
    assert_eq!(store.count_votes("V1").await.unwrap(), 3);
    assert!(store.stored_digest("V1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_partial_ingest_is_retried() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let path = write_file(&dir, "v1.json", &ballot("V1", &["PA1", "PA2"], &["PA3"]));
    let options = BatchOptions { concurrency: 1, skip_unchanged: true };

    sqlx::query(
        "CREATE TRIGGER reject_pa2 BEFORE INSERT ON individual_votes \
         WHEN NEW.voter_id = 'PA2' BEGIN SELECT RAISE(ABORT, 'vote rejected'); END",
    )
    .execute(store.pool())
    .await
    .unwrap();

    let first = run_batch(&store, vec![path.clone()], &options).await;
    match &first.events[0].status {
        EventStatus::Ingested { summary, .. } => {
            assert_eq!(summary.upserted, 2);
            assert_eq!(summary.errors, 1);
        }
        other => panic!("expected Ingested, got {:?}", other),
    }
    assert_eq!(store.stored_digest("V1").await.unwrap(), None);

    sqlx::query("DROP TRIGGER reject_pa2")
        .execute(store.pool())
        .await
        .unwrap();

    let second = run_batch(&store, vec![path.clone()], &options).await;
    assert_eq!(second.succeeded(), 1);
    assert_eq!(second.unchanged(), 0);
    assert_eq!(store.count_votes("V1").await.unwrap(), 3);

    let third = run_batch(&store, vec![path], &options).await;
    assert_eq!(third.unchanged(), 1);
}

#[tokio::test]
async fn test_ingest_document_without_ventilation() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;

    let (event_id, status) = ingest_document(&store, "{\"uid\": \"V5\"}", false).await.unwrap();

    assert_eq!(event_id, "V5");
    match status {
        EventStatus::Ingested { summary, recompute } => {
            assert_eq!(summary.upserted, 0);
            assert_eq!(recompute, Recompute::Skipped);
        }
        other => panic!("expected Ingested, got {:?}", other),
    }
    let stored = store.load_event("V5").await.unwrap().unwrap();
    assert_eq!(stored.ballots_cast, None);
    assert!(stored.payload_sha256.is_some());
}
