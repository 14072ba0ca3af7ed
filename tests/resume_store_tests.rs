//! JSON file store: round trips, identity across upserts, and isolation
//! between users.

use careerhub::{JsonFileStore, ResumeData, ResumeStore};

fn sample_content(summary: &str) -> ResumeData {
    ResumeData {
        summary: summary.to_string(),
        skills: vec!["Rust".to_string(), "SQL".to_string()],
        ..ResumeData::default()
    }
}

#[tokio::test]
async fn upsert_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    let saved = store
        .upsert("alice", sample_content("Systems engineer"))
        .await
        .unwrap();
    assert_eq!(saved.user_id, "alice");
    assert_eq!(saved.created_at, saved.updated_at);

    let loaded = store.get("alice").await.unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[tokio::test]
async fn missing_resume_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    assert!(store.get("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn second_upsert_preserves_identity_and_bumps_updated_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    let first = store.upsert("bob", sample_content("v1")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = store.upsert("bob", sample_content("v2")).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.content.summary, "v2");

    let loaded = store.get("bob").await.unwrap().unwrap();
    assert_eq!(loaded.content.summary, "v2");
}

#[tokio::test]
async fn users_do_not_share_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    store
        .upsert("carol", sample_content("storage systems"))
        .await
        .unwrap();
    store
        .upsert("dave", sample_content("frontend"))
        .await
        .unwrap();

    let carol = store.get("carol").await.unwrap().unwrap();
    let dave = store.get("dave").await.unwrap().unwrap();
    assert_eq!(carol.content.summary, "storage systems");
    assert_eq!(dave.content.summary, "frontend");
    assert_ne!(carol.id, dave.id);
}
