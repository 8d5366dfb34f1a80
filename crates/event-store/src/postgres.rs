use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use serde_json::{Map, Value};
use sqlx::{
    PgPool, Row,
    postgres::{PgListener, PgRow},
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

use crate::{
    ChangeRecord, Event, EventLogError, EventRecord, LogConfig, ResourceId, Result, Version,
    store::{EventLog, EventStream, PutCondition},
};

/// SQL text for one configured table.
#[derive(Debug, Clone)]
struct Statements {
    channel: String,
    create_table: String,
    create_notify_function: String,
    drop_trigger: String,
    create_trigger: String,
    insert_if_resource_absent: String,
    insert_if_event_absent: String,
    select_by_id: String,
    select_all: String,
}

impl Statements {
    fn for_config(config: &LogConfig) -> Self {
        let table = config.table.as_str();
        let channel = format!("{table}_changes");
        Self {
            create_table: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT NOT NULL,
                    number BIGINT NOT NULL CHECK (number >= 1),
                    event_type TEXT NOT NULL,
                    created TIMESTAMPTZ NOT NULL,
                    payload JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    PRIMARY KEY (id, number)
                )
                "#
            ),
            // pg_notify payloads are capped at 8000 bytes; oversized rows are
            // announced without their image instead of failing the write.
            create_notify_function: format!(
                r#"
                CREATE OR REPLACE FUNCTION {table}_notify() RETURNS trigger AS $$
                DECLARE
                    change JSONB;
                BEGIN
                    IF TG_OP = 'DELETE' THEN
                        change := jsonb_build_object(
                            'kind', 'REMOVE', 'id', OLD.id, 'number', OLD.number, 'new_image', NULL
                        );
                    ELSE
                        change := jsonb_build_object(
                            'kind', CASE TG_OP WHEN 'INSERT' THEN 'INSERT' ELSE 'MODIFY' END,
                            'id', NEW.id,
                            'number', NEW.number,
                            'new_image', NEW.payload || jsonb_build_object(
                                'id', NEW.id,
                                'number', NEW.number,
                                'type', NEW.event_type,
                                'created', NEW.created
                            )
                        );
                        IF octet_length(change::text) > 7900 THEN
                            change := change || jsonb_build_object('new_image', NULL);
                        END IF;
                    END IF;
                    PERFORM pg_notify('{channel}', change::text);
                    RETURN NULL;
                END
                $$ LANGUAGE plpgsql
                "#
            ),
            drop_trigger: format!("DROP TRIGGER IF EXISTS {channel} ON {table}"),
            create_trigger: format!(
                r#"
                CREATE TRIGGER {channel}
                AFTER INSERT OR UPDATE OR DELETE ON {table}
                FOR EACH ROW EXECUTE PROCEDURE {table}_notify()
                "#
            ),
            channel,
            insert_if_resource_absent: format!(
                r#"
                INSERT INTO {table} (id, number, event_type, created, payload)
                SELECT $1::TEXT, $2::BIGINT, $3::TEXT, $4::TIMESTAMPTZ, $5::JSONB
                WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE id = $1::TEXT)
                ON CONFLICT (id, number) DO NOTHING
                "#
            ),
            insert_if_event_absent: format!(
                r#"
                INSERT INTO {table} (id, number, event_type, created, payload)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id, number) DO NOTHING
                "#
            ),
            select_by_id: format!(
                r#"
                SELECT id, number, event_type, created, payload
                FROM {table}
                WHERE id = $1
                ORDER BY number ASC
                "#
            ),
            select_all: format!("SELECT id, number, event_type, created, payload FROM {table}"),
        }
    }
}

/// Rows buffered between the scan task and its consumer.
const SCAN_BUFFER: usize = 64;

/// PostgreSQL-backed event log.
///
/// One table per [`LogConfig`], keyed by `(id, number)`. Conditional puts
/// rely on the primary key plus `ON CONFLICT DO NOTHING`, so a lost race
/// shows up as zero affected rows rather than a constraint error.
///
/// A row trigger publishes every insert, update and delete on the table via
/// `pg_notify`. Once [`PostgresEventLog::watch_changes`] is running, those
/// notifications are relayed to [`PostgresEventLog::subscribe`] receivers,
/// including writes made by other processes or by hand.
#[derive(Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
    config: LogConfig,
    statements: Statements,
    changes: broadcast::Sender<ChangeRecord>,
}

impl PostgresEventLog {
    /// Creates a new PostgreSQL event log over the configured table.
    pub fn new(pool: PgPool, config: LogConfig) -> Self {
        let statements = Statements::for_config(&config);
        let (changes, _) = broadcast::channel(crate::memory::CHANGE_FEED_CAPACITY);
        Self {
            pool,
            config,
            statements,
            changes,
        }
    }

    /// Subscribes to table changes relayed after this call.
    ///
    /// Nothing is delivered until [`PostgresEventLog::watch_changes`] runs.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.changes.subscribe()
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Creates the event table and its change trigger if they do not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        for sql in [
            &self.statements.create_table,
            &self.statements.create_notify_function,
            &self.statements.drop_trigger,
            &self.statements.create_trigger,
        ] {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        tracing::info!(table = %self.config.table, "event table ready");
        Ok(())
    }

    /// Starts relaying the table's change notifications to subscribers.
    ///
    /// The listener holds its own connection and reconnects on its own.
    /// The task ends once reconnecting fails.
    pub async fn watch_changes(&self) -> Result<JoinHandle<()>> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(&self.statements.channel).await?;
        tracing::info!(channel = %self.statements.channel, "listening for table changes");

        let changes = self.changes.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        match serde_json::from_str::<ChangeRecord>(notification.payload()) {
                            Ok(change) => {
                                let _ = changes.send(change);
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "malformed change notification")
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "change listener stopped");
                        break;
                    }
                }
            }
        }))
    }

    fn row_to_record(row: PgRow) -> Result<EventRecord> {
        let payload = match row.try_get::<Value, _>("payload")? {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => serde_json::from_value(other)?,
        };

        Ok(EventRecord {
            id: ResourceId::from(row.try_get::<String, _>("id")?),
            event: Event {
                number: Version::new(row.try_get("number")?),
                event_type: row.try_get("event_type")?,
                created: row.try_get::<DateTime<Utc>, _>("created")?,
                payload,
            },
        })
    }
}

#[async_trait]
impl EventLog for PostgresEventLog {
    async fn put(&self, record: EventRecord, condition: PutCondition) -> Result<()> {
        let sql = match condition {
            PutCondition::ResourceAbsent => &self.statements.insert_if_resource_absent,
            PutCondition::EventAbsent => &self.statements.insert_if_event_absent,
        };
        let number = record.number();

        let inserted = sqlx::query(sql)
            .bind(record.id.as_str())
            .bind(number.as_i64())
            .bind(&record.event.event_type)
            .bind(record.event.created)
            .bind(Value::Object(record.event.payload.clone()))
            .execute(&self.pool)
            .await?
            .rows_affected();

        if inserted == 0 {
            return Err(EventLogError::ConditionalCheckFailed {
                id: record.id,
                number,
                condition,
            });
        }

        tracing::debug!(id = %record.id, %number, %condition, "row inserted");
        Ok(())
    }

    async fn query(&self, id: &ResourceId) -> Result<Vec<EventRecord>> {
        let rows = sqlx::query(&self.statements.select_by_id)
            .bind(id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn scan(&self) -> Result<EventStream> {
        // The row stream borrows the pool, so a task owns it and forwards rows.
        let pool = self.pool.clone();
        let sql = self.statements.select_all.clone();
        let (tx, rx) = mpsc::channel(SCAN_BUFFER);

        tokio::spawn(async move {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(row) = rows.next().await {
                let item = row.map_err(EventLogError::from).and_then(Self::row_to_record);
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}
