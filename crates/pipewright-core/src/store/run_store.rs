use rusqlite::OptionalExtension;
use serde_json::Value;

use crate::db::{json_column, millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::run::{RunExecution, RunStatus};

const RUN_COLUMNS: &str = "id, workflow_id, status, input_payload, output_payload, log, trace_id, \
     identity, business_context_id, started_at, finished_at";

/// Persists run executions. A run is written once when created and again
/// each time its state changes; the full log is stored as JSON.
#[derive(Clone)]
pub struct RunStore {
    db: Database,
}

impl RunStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn save(&self, run: &RunExecution) -> Result<(), EngineError> {
        let r = run.clone();
        let log = serde_json::to_string(&r.log)
            .map_err(|e| EngineError::Internal(format!("Failed to encode run log: {}", e)))?;
        let output = r.output_payload.as_ref().map(Value::to_string);
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO run_executions (id, workflow_id, status, input_payload, output_payload, \
                     log, trace_id, identity, business_context_id, started_at, finished_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                       status = excluded.status,
                       output_payload = excluded.output_payload,
                       log = excluded.log,
                       started_at = excluded.started_at,
                       finished_at = excluded.finished_at",
                    rusqlite::params![
                        r.id,
                        r.workflow_id,
                        r.status.as_str(),
                        Value::Object(r.input_payload.clone()).to_string(),
                        output,
                        log,
                        r.trace_id,
                        r.identity,
                        r.business_context_id,
                        r.started_at.timestamp_millis(),
                        r.finished_at.map(|t| t.timestamp_millis()),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<RunExecution>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM run_executions WHERE id = ?1", RUN_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_run(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn require(&self, id: &str) -> Result<RunExecution, EngineError> {
        self.get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Run {} not found", id)))
    }

    pub async fn list_by_workflow(&self, workflow_id: &str) -> Result<Vec<RunExecution>, EngineError> {
        let workflow_id = workflow_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM run_executions WHERE workflow_id = ?1 ORDER BY started_at DESC",
                    RUN_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![workflow_id], |row| Ok(row_to_run(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<RunExecution>, EngineError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM run_executions ORDER BY started_at DESC LIMIT ?1",
                    RUN_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![limit as i64], |row| Ok(row_to_run(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn count(&self) -> Result<usize, EngineError> {
        self.db
            .with_conn_async(|conn| {
                conn.query_row("SELECT COUNT(*) FROM run_executions", [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as usize)
            })
            .await
    }
}

fn row_to_run(row: &rusqlite::Row<'_>) -> RunExecution {
    let status: String = row.get(2).unwrap_or_default();
    let output: Option<String> = row.get(4).unwrap_or(None);
    RunExecution {
        id: row.get(0).unwrap_or_default(),
        workflow_id: row.get(1).unwrap_or_default(),
        status: RunStatus::from_str(&status),
        input_payload: json_column(row.get(3).ok()),
        output_payload: output.and_then(|s| serde_json::from_str(&s).ok()),
        log: json_column(row.get(5).ok()),
        trace_id: row.get(6).unwrap_or_default(),
        identity: row.get(7).unwrap_or(None),
        business_context_id: row.get(8).unwrap_or(None),
        started_at: millis_to_datetime(row.get(9).unwrap_or(0)),
        finished_at: row
            .get::<_, Option<i64>>(10)
            .unwrap_or(None)
            .map(millis_to_datetime),
    }
}
