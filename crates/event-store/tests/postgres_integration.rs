//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need Docker, so they are
//! ignored by default. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored
//! ```

use std::{sync::Arc, time::Duration};

use event_store::{
    ChangeKind, ChangeRecord, Event, EventLog, EventLogError, EventLogExt, EventRecord, LogConfig, PostgresEventLog,
    PutCondition, ResourceId, Version,
};
use serial_test::serial;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::{OnceCell, broadcast};

const TABLE: &str = "domain_test";

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh log with its own pool and an emptied table
async fn get_test_log() -> PostgresEventLog {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    let log = PostgresEventLog::new(pool, LogConfig::for_table(TABLE).unwrap());
    log.ensure_table().await.unwrap();

    sqlx::query(&format!("TRUNCATE TABLE {TABLE}"))
        .execute(log.pool())
        .await
        .unwrap();

    log
}

fn create_test_record(id: &ResourceId, number: i64, event_type: &str) -> EventRecord {
    EventRecord::new(
        id.clone(),
        Event::new(Version::new(number), event_type).with_field("test", true),
    )
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn put_and_query_events() {
    let log = get_test_log().await;
    let id = ResourceId::new();

    log.put(create_test_record(&id, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();
    log.put(create_test_record(&id, 2, "Updated"), PutCondition::EventAbsent)
        .await
        .unwrap();

    let rows = log.query(&id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].number(), Version::first());
    assert_eq!(rows[0].event.event_type, "Created");
    assert_eq!(rows[1].number(), Version::new(2));
    assert_eq!(
        rows[1].event.payload.get("test"),
        Some(&serde_json::json!(true))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn resource_absent_condition_rejects_existing_id() {
    let log = get_test_log().await;
    let id = ResourceId::new();

    log.put(create_test_record(&id, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();

    let result = log
        .put(create_test_record(&id, 1, "Created"), PutCondition::ResourceAbsent)
        .await;

    assert!(matches!(
        result,
        Err(EventLogError::ConditionalCheckFailed {
            condition: PutCondition::ResourceAbsent,
            ..
        })
    ));
    assert_eq!(log.query(&id).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn event_absent_condition_rejects_taken_number() {
    let log = get_test_log().await;
    let id = ResourceId::new();

    log.put(create_test_record(&id, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();

    let result = log
        .put(create_test_record(&id, 1, "Other"), PutCondition::EventAbsent)
        .await;

    assert!(matches!(
        result,
        Err(EventLogError::ConditionalCheckFailed { .. })
    ));
    let rows = log.query(&id).await.unwrap();
    assert_eq!(rows[0].event.event_type, "Created");
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn concurrent_first_events_have_one_winner() {
    let log = get_test_log().await;
    let id = ResourceId::new();

    let (a, b) = tokio::join!(
        log.put(create_test_record(&id, 1, "A"), PutCondition::ResourceAbsent),
        log.put(create_test_record(&id, 1, "B"), PutCondition::ResourceAbsent),
    );

    assert!(a.is_ok() ^ b.is_ok());
    assert_eq!(log.query(&id).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn scan_returns_all_rows() {
    let log = get_test_log().await;
    let id1 = ResourceId::new();
    let id2 = ResourceId::new();

    log.put(create_test_record(&id1, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();
    log.put(create_test_record(&id1, 2, "Updated"), PutCondition::EventAbsent)
        .await
        .unwrap();
    log.put(create_test_record(&id2, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();

    let rows = log.scan_all().await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        log.query(&id1).await.unwrap().last().map(EventRecord::number),
        Some(Version::new(2))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn empty_table_scans_empty() {
    let log = get_test_log().await;
    assert!(log.scan_all().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn scan_streams_more_rows_than_its_buffer() {
    use futures_util::TryStreamExt;

    let log = get_test_log().await;
    for _ in 0..150 {
        log.put(create_test_record(&ResourceId::new(), 1, "Created"), PutCondition::ResourceAbsent)
            .await
            .unwrap();
    }

    let mut stream = log.scan().await.unwrap();
    let mut count = 0;
    while let Some(record) = stream.try_next().await.unwrap() {
        assert_eq!(record.number(), Version::first());
        count += 1;
    }
    assert_eq!(count, 150);
}

async fn next_change(changes: &mut broadcast::Receiver<ChangeRecord>) -> ChangeRecord {
    tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .expect("no change notification within 5s")
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn change_feed_reports_inserts() {
    let log = get_test_log().await;
    let watcher = log.watch_changes().await.unwrap();
    let mut changes = log.subscribe();
    let id = ResourceId::new();

    let record = create_test_record(&id, 1, "Created");
    log.put(record.clone(), PutCondition::ResourceAbsent)
        .await
        .unwrap();

    let change = next_change(&mut changes).await;
    assert_eq!(change.kind, ChangeKind::Insert);
    assert_eq!(change.id, id);
    let image = change.new_image.as_ref().unwrap();
    assert_eq!(image.event.event_type, "Created");
    assert_eq!(image.event.payload["test"], true);
    assert!(!change.is_anomaly());

    watcher.abort();
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn change_feed_reports_out_of_band_update_and_delete() {
    let log = get_test_log().await;
    let id = ResourceId::new();
    log.put(create_test_record(&id, 1, "Created"), PutCondition::ResourceAbsent)
        .await
        .unwrap();

    let watcher = log.watch_changes().await.unwrap();
    let mut changes = log.subscribe();

    sqlx::query(&format!(
        "UPDATE {TABLE} SET event_type = 'Edited' WHERE id = $1 AND number = 1"
    ))
    .bind(id.as_str())
    .execute(log.pool())
    .await
    .unwrap();

    let modified = next_change(&mut changes).await;
    assert_eq!(modified.kind, ChangeKind::Modify);
    assert!(modified.is_anomaly());
    assert_eq!(modified.number, Version::first());
    assert_eq!(modified.new_image.unwrap().event.event_type, "Edited");

    sqlx::query(&format!("DELETE FROM {TABLE} WHERE id = $1"))
        .bind(id.as_str())
        .execute(log.pool())
        .await
        .unwrap();

    let removed = next_change(&mut changes).await;
    assert_eq!(removed.kind, ChangeKind::Remove);
    assert!(removed.is_anomaly());
    assert_eq!(removed.id, id);
    assert!(removed.new_image.is_none());

    watcher.abort();
}
