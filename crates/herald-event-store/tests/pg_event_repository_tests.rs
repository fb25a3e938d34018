//! Integration tests for `PgEventRepository`.

use chrono::{DateTime, Utc};
use herald_core::error::DomainError;
use herald_core::repository::EventRepository;
use herald_core::stored_event::StoredEvent;
use herald_event_store::pg_event_repository::PgEventRepository;
use herald_test_support::at;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(created_at: DateTime<Utc>) -> StoredEvent {
    StoredEvent::new(
        Uuid::new_v4(),
        created_at,
        Uuid::new_v4(),
        "orders.placed",
        serde_json::json!({"key": "value"}),
    )
}

// --- save + get round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_and_get_round_trips_every_field(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let event = make_stored_event(at(10, 0, 0))
        .with_user_id(Some("alice".into()))
        .with_tenant_id(Some("acme".into()))
        .with_session_id(Some("s-1".into()));

    repo.save(&event).await.unwrap();

    let loaded = repo.get(event.id()).await.unwrap();
    assert_eq!(loaded, event);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_preserves_absent_attributes(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let event = make_stored_event(at(10, 0, 0));

    repo.save(&event).await.unwrap();

    let loaded = repo.get(event.id()).await.unwrap();
    assert_eq!(loaded.user_id(), None);
    assert_eq!(loaded.tenant_id(), None);
    assert_eq!(loaded.session_id(), None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_is_an_upsert_by_id(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let id = Uuid::new_v4();
    let aggregate_id = Uuid::new_v4();
    let version = |v: u32| {
        StoredEvent::new(
            id,
            at(10, 0, 0),
            aggregate_id,
            "orders.placed",
            serde_json::json!({ "v": v }),
        )
    };
    let first = version(1);
    let second = version(2);

    repo.save(&first).await.unwrap();
    repo.save(&second).await.unwrap();

    let all = repo.find_since(at(0, 0, 0)).await.unwrap();
    assert_eq!(all, vec![second]);
}

// --- not found ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_missing_event_returns_not_found(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let id = Uuid::new_v4();

    let result = repo.get(id).await;

    match result {
        Err(DomainError::EventNotFound(missing)) => assert_eq!(missing, id),
        other => panic!("expected EventNotFound, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_missing_event_returns_not_found(pool: PgPool) {
    let repo = PgEventRepository::new(pool);

    let result = repo.delete(Uuid::new_v4()).await;

    assert!(matches!(result, Err(DomainError::EventNotFound(_))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_removes_event(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let event = make_stored_event(at(10, 0, 0));
    repo.save(&event).await.unwrap();

    repo.delete(event.id()).await.unwrap();

    assert!(matches!(
        repo.get(event.id()).await,
        Err(DomainError::EventNotFound(_))
    ));
}

// --- find_since ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_since_is_inclusive_and_ordered_by_time(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let before = make_stored_event(at(9, 59, 59));
    let exactly = make_stored_event(at(10, 0, 0));
    let after = make_stored_event(at(10, 0, 1));
    // Saved out of order on purpose.
    for event in [&after, &before, &exactly] {
        repo.save(event).await.unwrap();
    }

    let found = repo.find_since(at(10, 0, 0)).await.unwrap();

    assert_eq!(found, vec![exactly, after]);
}

// --- delete_older_than ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_older_than_keeps_events_at_cutoff(pool: PgPool) {
    let repo = PgEventRepository::new(pool);
    let old = make_stored_event(at(9, 0, 0));
    let at_cutoff = make_stored_event(at(10, 0, 0));
    let fresh = make_stored_event(at(11, 0, 0));
    for event in [&old, &at_cutoff, &fresh] {
        repo.save(event).await.unwrap();
    }

    let deleted = repo.delete_older_than(at(10, 0, 0)).await.unwrap();
    let deleted_again = repo.delete_older_than(at(10, 0, 0)).await.unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(deleted_again, 0);
    let remaining = repo.find_since(at(0, 0, 0)).await.unwrap();
    assert_eq!(remaining, vec![at_cutoff, fresh]);
}
