//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need Docker, so they are
//! ignored by default. Run with:
//!
//! ```bash
//! cargo test -p outbox --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use outbox::{
    AggregateId, AggregateRecord, AggregateStore, AggregateWrite, ChangeSet, MessageState,
    OutboxError, OutboxMessage, OutboxStore, OutboxStoreExt, PostgresStore, Version,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

const LEASE: Duration = Duration::from_secs(60);

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE aggregates, outbox_messages")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn product_write(id: AggregateId, expected: i64) -> AggregateWrite {
    AggregateWrite {
        expected_version: Version::new(expected),
        record: AggregateRecord::new(
            id,
            "Product",
            Version::new(expected + 1),
            serde_json::json!({ "name": "Widget", "stock": 5 }),
        ),
    }
}

fn message_at(offset_secs: i64) -> OutboxMessage {
    OutboxMessage::new(
        "catalog.product.stock_changed.v1",
        r#"{"newQuantity":5}"#,
        Utc::now() + ChronoDuration::seconds(offset_secs),
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn commit_writes_aggregate_and_messages() {
    let store = get_test_store().await;
    let id = AggregateId::new();

    store
        .commit(ChangeSet {
            aggregates: vec![product_write(id, 0)],
            messages: vec![message_at(0), message_at(1)],
        })
        .await
        .unwrap();

    let record = store.load_aggregate("Product", id).await.unwrap().unwrap();
    assert_eq!(record.version, Version::first());
    assert_eq!(record.state["stock"], 5);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.pending, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn stale_version_rolls_back_everything() {
    let store = get_test_store().await;
    let id = AggregateId::new();

    store
        .commit(ChangeSet {
            aggregates: vec![product_write(id, 0)],
            messages: vec![message_at(0)],
        })
        .await
        .unwrap();

    let result = store
        .commit(ChangeSet {
            aggregates: vec![product_write(id, 0)],
            messages: vec![message_at(1)],
        })
        .await;

    assert!(matches!(
        result,
        Err(OutboxError::ConcurrencyConflict { .. })
    ));
    assert_eq!(store.stats().await.unwrap().pending, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_message_aborts_commit() {
    let store = get_test_store().await;
    let message = message_at(0);

    store
        .commit(ChangeSet {
            aggregates: vec![],
            messages: vec![message.clone()],
        })
        .await
        .unwrap();

    let id = AggregateId::new();
    let result = store
        .commit(ChangeSet {
            aggregates: vec![product_write(id, 0)],
            messages: vec![message.clone()],
        })
        .await;

    assert!(matches!(result, Err(OutboxError::DuplicateMessage(dup)) if dup == message.id));
    assert!(store.load_aggregate("Product", id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn claim_orders_by_occurred_on_and_leases() {
    let store = get_test_store().await;
    let late = message_at(10);
    let early = message_at(-10);
    let middle = message_at(0);

    store
        .commit(ChangeSet {
            aggregates: vec![],
            messages: vec![late.clone(), early.clone(), middle.clone()],
        })
        .await
        .unwrap();

    let claimed = store.claim_pending("w1", 2, LEASE).await.unwrap();
    assert_eq!(claimed.len(), 2);
    assert_eq!(claimed[0].id, early.id);
    assert_eq!(claimed[1].id, middle.id);
    assert_eq!(claimed[0].locked_by.as_deref(), Some("w1"));

    // Only the unleased message is left for a second worker
    let second = store.claim_pending("w2", 10, LEASE).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, late.id);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn status_updates_follow_the_lifecycle() {
    let store = get_test_store().await;
    store
        .commit(ChangeSet {
            aggregates: vec![],
            messages: vec![message_at(0).with_max_retry_count(2), message_at(1)],
        })
        .await
        .unwrap();

    let mut claimed = store.claim_pending("w1", 10, LEASE).await.unwrap();
    claimed[0].record_failure("broker unavailable");
    claimed[0].record_failure("broker unavailable");
    claimed[1].mark_processed(Utc::now());
    store.save_statuses("w1", &claimed).await.unwrap();

    let failed = store.get_message(claimed[0].id).await.unwrap().unwrap();
    assert_eq!(failed.state(), MessageState::PermanentlyFailed);
    assert_eq!(failed.error.as_deref(), Some("broker unavailable"));
    assert!(failed.locked_by.is_none());

    let listed = store.list_permanently_failed(10).await.unwrap();
    assert_eq!(listed.len(), 1);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.permanently_failed, 1);

    assert!(store.claim_pending("w1", 10, LEASE).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn processed_rows_are_not_overwritten() {
    let store = get_test_store().await;
    store
        .commit(ChangeSet {
            aggregates: vec![],
            messages: vec![message_at(0)],
        })
        .await
        .unwrap();

    let mut claimed = store.claim_pending("w1", 1, LEASE).await.unwrap();
    let mut stale = claimed[0].clone();
    claimed[0].mark_processed(Utc::now());
    assert!(store.save_status("w1", &claimed[0]).await.unwrap());

    stale.record_failure("late failure");
    assert!(!store.save_status("w1", &stale).await.unwrap());

    let stored = store.get_message(stale.id).await.unwrap().unwrap();
    assert!(stored.is_processed());
    assert_eq!(stored.retry_count, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn stale_worker_cannot_overwrite_a_reclaimed_message() {
    let store = get_test_store().await;
    store
        .commit(ChangeSet {
            aggregates: vec![],
            messages: vec![message_at(0)],
        })
        .await
        .unwrap();

    let mut stale = store
        .claim_pending("w1", 1, Duration::ZERO)
        .await
        .unwrap();

    for _ in 0..2 {
        let mut claimed = store.claim_pending("w2", 1, LEASE).await.unwrap();
        assert_eq!(claimed.len(), 1);
        claimed[0].record_failure("broker unavailable");
        assert!(store.save_status("w2", &claimed[0]).await.unwrap());
    }

    stale[0].record_failure("late failure");
    assert!(!store.save_status("w1", &stale[0]).await.unwrap());

    let stored = store.get_message(stale[0].id).await.unwrap().unwrap();
    assert_eq!(stored.retry_count, 2);
    assert_eq!(stored.error.as_deref(), Some("broker unavailable"));
}
