use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::{millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::ai_model::{AiModel, CreateAiModelInput};

const MODEL_COLUMNS: &str = "id, name, deployment_name, api_version, description, is_active, created_at";

#[derive(Clone)]
pub struct AiModelStore {
    db: Database,
}

impl AiModelStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateAiModelInput) -> Result<AiModel, EngineError> {
        let model = AiModel {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            deployment_name: input.deployment_name,
            api_version: input.api_version,
            description: input.description,
            is_active: input.is_active,
            created_at: Utc::now(),
        };
        let m = model.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO ai_models (id, name, deployment_name, api_version, description, is_active, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        m.id,
                        m.name,
                        m.deployment_name,
                        m.api_version,
                        m.description,
                        m.is_active as i64,
                        m.created_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(model)
    }

    pub async fn get(&self, id: &str) -> Result<Option<AiModel>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM ai_models WHERE id = ?1", MODEL_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_model(row)),
                )
                .optional()
            })
            .await
    }

    /// The oldest active model, used when a chat config names none.
    pub async fn first_active(&self) -> Result<Option<AiModel>, EngineError> {
        self.db
            .with_conn_async(|conn| {
                conn.query_row(
                    &format!(
                        "SELECT {} FROM ai_models WHERE is_active = 1 ORDER BY created_at ASC LIMIT 1",
                        MODEL_COLUMNS
                    ),
                    [],
                    |row| Ok(row_to_model(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<AiModel>, EngineError> {
        self.db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM ai_models ORDER BY created_at ASC",
                    MODEL_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_model(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<bool, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute(
                    "UPDATE ai_models SET is_active = ?1 WHERE id = ?2",
                    rusqlite::params![active as i64, id],
                )?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_model(row: &rusqlite::Row<'_>) -> AiModel {
    AiModel {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        deployment_name: row.get(2).unwrap_or_default(),
        api_version: row.get(3).unwrap_or_default(),
        description: row.get(4).unwrap_or(None),
        is_active: row.get::<_, i64>(5).unwrap_or(0) != 0,
        created_at: millis_to_datetime(row.get(6).unwrap_or(0)),
    }
}
