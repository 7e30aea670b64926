use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::db::{json_column, millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::workflow::{CreateWorkflowInput, UpdateWorkflowInput, Workflow};

const WORKFLOW_COLUMNS: &str = "id, name, description, steps, created_at, updated_at";

#[derive(Clone)]
pub struct WorkflowStore {
    db: Database,
}

impl WorkflowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateWorkflowInput) -> Result<Workflow, EngineError> {
        let workflow = Workflow::new(input.name, input.description, input.steps);
        self.save(&workflow).await?;
        Ok(workflow)
    }

    pub async fn save(&self, workflow: &Workflow) -> Result<(), EngineError> {
        let w = workflow.clone();
        let steps = serde_json::to_string(&w.steps)
            .map_err(|e| EngineError::Internal(format!("Failed to encode steps: {}", e)))?;
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO workflows (id, name, description, steps, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       steps = excluded.steps,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        w.id,
                        w.name,
                        w.description,
                        steps,
                        w.created_at.timestamp_millis(),
                        w.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Workflow>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM workflows WHERE id = ?1", WORKFLOW_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_workflow(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn require(&self, id: &str) -> Result<Workflow, EngineError> {
        self.get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Workflow {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, EngineError> {
        self.db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM workflows ORDER BY created_at DESC",
                    WORKFLOW_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_workflow(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateWorkflowInput,
    ) -> Result<Workflow, EngineError> {
        let mut w = self.require(id).await?;
        if let Some(v) = input.name { w.name = v; }
        if let Some(v) = input.description { w.description = v; }
        if let Some(v) = input.steps { w.steps = v; }
        w.updated_at = Utc::now();
        self.save(&w).await?;
        Ok(w)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM workflows WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_workflow(row: &rusqlite::Row<'_>) -> Workflow {
    Workflow {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        description: row.get(2).unwrap_or_default(),
        steps: json_column(row.get(3).ok()),
        created_at: millis_to_datetime(row.get(4).unwrap_or(0)),
        updated_at: millis_to_datetime(row.get(5).unwrap_or(0)),
    }
}
