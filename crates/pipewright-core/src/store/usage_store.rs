use async_trait::async_trait;

use crate::db::{millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::usage::UsageRecord;
use crate::usage::UsageSink;

const USAGE_COLUMNS: &str = "id, user_id, app_name, model_name, tokens_input, tokens_output, \
     total_tokens, estimated_cost, trace_id, timestamp";

#[derive(Clone)]
pub struct UsageStore {
    db: Database,
}

impl UsageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: &UsageRecord) -> Result<(), EngineError> {
        let r = record.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO usage_records (id, user_id, app_name, model_name, tokens_input, \
                     tokens_output, total_tokens, estimated_cost, trace_id, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        r.id,
                        r.user_id,
                        r.app_name,
                        r.model_name,
                        r.tokens_input as i64,
                        r.tokens_output as i64,
                        r.total_tokens as i64,
                        r.estimated_cost,
                        r.trace_id,
                        r.timestamp.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<UsageRecord>, EngineError> {
        self.query_by("user_id", user_id).await
    }

    pub async fn list_by_trace(&self, trace_id: &str) -> Result<Vec<UsageRecord>, EngineError> {
        self.query_by("trace_id", trace_id).await
    }

    async fn query_by(&self, column: &'static str, value: &str) -> Result<Vec<UsageRecord>, EngineError> {
        let value = value.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM usage_records WHERE {} = ?1 ORDER BY timestamp ASC",
                    USAGE_COLUMNS, column
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![value], |row| Ok(row_to_usage(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

#[async_trait]
impl UsageSink for UsageStore {
    async fn record(&self, record: UsageRecord) -> Result<(), EngineError> {
        self.insert(&record).await
    }
}

fn row_to_usage(row: &rusqlite::Row<'_>) -> UsageRecord {
    UsageRecord {
        id: row.get(0).unwrap_or_default(),
        user_id: row.get(1).unwrap_or_default(),
        app_name: row.get(2).unwrap_or_default(),
        model_name: row.get(3).unwrap_or_default(),
        tokens_input: row.get::<_, i64>(4).unwrap_or(0).max(0) as u64,
        tokens_output: row.get::<_, i64>(5).unwrap_or(0).max(0) as u64,
        total_tokens: row.get::<_, i64>(6).unwrap_or(0).max(0) as u64,
        estimated_cost: row.get(7).unwrap_or(0.0),
        trace_id: row.get(8).unwrap_or(None),
        timestamp: millis_to_datetime(row.get(9).unwrap_or(0)),
    }
}
