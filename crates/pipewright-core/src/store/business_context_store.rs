use async_trait::async_trait;
use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::{millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::business_context::{BusinessContext, CreateBusinessContextInput, ManualContext};
use crate::providers::BusinessContextProvider;

const CONTEXT_COLUMNS: &str =
    "id, name, description, department, manual_content, workflow_id, is_active, created_at";

#[derive(Clone)]
pub struct BusinessContextStore {
    db: Database,
}

impl BusinessContextStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        input: CreateBusinessContextInput,
    ) -> Result<BusinessContext, EngineError> {
        let ctx = BusinessContext {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            department: input.department,
            manual_content: input.manual_content,
            workflow_id: input.workflow_id,
            is_active: true,
            created_at: Utc::now(),
        };
        let c = ctx.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO business_contexts (id, name, description, department, manual_content, \
                     workflow_id, is_active, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        c.id,
                        c.name,
                        c.description,
                        c.department,
                        c.manual_content,
                        c.workflow_id,
                        c.is_active as i64,
                        c.created_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(ctx)
    }

    pub async fn get(&self, id: &str) -> Result<Option<BusinessContext>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM business_contexts WHERE id = ?1", CONTEXT_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_context(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<BusinessContext>, EngineError> {
        self.db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM business_contexts ORDER BY name ASC",
                    CONTEXT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_context(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

#[async_trait]
impl BusinessContextProvider for BusinessContextStore {
    async fn manual(&self, context_id: &str) -> Result<Option<ManualContext>, EngineError> {
        let Some(ctx) = self.get(context_id).await? else {
            tracing::warn!(context_id, "Business context not found; running without manual");
            return Ok(None);
        };
        Ok(ctx
            .manual_content
            .filter(|m| !m.trim().is_empty())
            .map(|content| ManualContext {
                name: ctx.name,
                content,
            }))
    }
}

fn row_to_context(row: &rusqlite::Row<'_>) -> BusinessContext {
    BusinessContext {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        description: row.get(2).unwrap_or_default(),
        department: row.get(3).unwrap_or_default(),
        manual_content: row.get(4).unwrap_or(None),
        workflow_id: row.get(5).unwrap_or(None),
        is_active: row.get::<_, i64>(6).unwrap_or(1) != 0,
        created_at: millis_to_datetime(row.get(7).unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, manual: Option<&str>) -> CreateBusinessContextInput {
        CreateBusinessContextInput {
            name: name.into(),
            description: String::new(),
            department: "ops".into(),
            manual_content: manual.map(String::from),
            workflow_id: None,
        }
    }

    #[tokio::test]
    async fn test_manual_only_when_content_present() {
        let store = BusinessContextStore::new(Database::open_in_memory().unwrap());
        let with = store.create(input("Refunds", Some("Always verify the order id."))).await.unwrap();
        let blank = store.create(input("Empty", Some("   "))).await.unwrap();

        let manual = store.manual(&with.id).await.unwrap().unwrap();
        assert_eq!(manual.name, "Refunds");
        assert_eq!(manual.content, "Always verify the order id.");

        assert!(store.manual(&blank.id).await.unwrap().is_none());
        assert!(store.manual("nope").await.unwrap().is_none());
    }
}
