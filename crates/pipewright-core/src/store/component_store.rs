use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::{json_column, millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::component::{Component, CreateComponentInput, UpdateComponentInput};

const COMPONENT_COLUMNS: &str = "id, name, description, input_schema, output_schema, tags, active, \
     configuration, skill_id, created_at, updated_at";

#[derive(Clone)]
pub struct ComponentStore {
    db: Database,
}

impl ComponentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateComponentInput) -> Result<Component, EngineError> {
        let now = Utc::now();
        let component = Component {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: input.name,
            description: input.description,
            input_schema: input.input_schema,
            output_schema: input.output_schema,
            tags: input.tags,
            active: input.active,
            configuration: input.configuration,
            skill_id: input.skill_id,
            created_at: now,
            updated_at: now,
        };
        self.save(&component).await?;
        Ok(component)
    }

    pub async fn save(&self, component: &Component) -> Result<(), EngineError> {
        let c = component.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO components (id, name, description, input_schema, output_schema, tags, \
                     active, configuration, skill_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       input_schema = excluded.input_schema,
                       output_schema = excluded.output_schema,
                       tags = excluded.tags,
                       active = excluded.active,
                       configuration = excluded.configuration,
                       skill_id = excluded.skill_id,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        c.id,
                        c.name,
                        c.description,
                        c.input_schema.to_string(),
                        c.output_schema.to_string(),
                        serde_json::to_string(&c.tags).unwrap_or_default(),
                        c.active as i64,
                        serde_json::Value::Object(c.configuration.clone()).to_string(),
                        c.skill_id,
                        c.created_at.timestamp_millis(),
                        c.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Component>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM components WHERE id = ?1", COMPONENT_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_component(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn require(&self, id: &str) -> Result<Component, EngineError> {
        self.get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Component {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Component>, EngineError> {
        self.db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM components ORDER BY name ASC",
                    COMPONENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_component(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        input: UpdateComponentInput,
    ) -> Result<Component, EngineError> {
        let mut c = self.require(id).await?;
        if let Some(v) = input.name { c.name = v; }
        if let Some(v) = input.description { c.description = v; }
        if let Some(v) = input.input_schema { c.input_schema = v; }
        if let Some(v) = input.output_schema { c.output_schema = v; }
        if let Some(v) = input.tags { c.tags = v; }
        if let Some(v) = input.active { c.active = v; }
        if let Some(v) = input.configuration { c.configuration = v; }
        if let Some(v) = input.skill_id { c.skill_id = Some(v); }
        c.updated_at = Utc::now();
        self.save(&c).await?;
        Ok(c)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM components WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_component(row: &rusqlite::Row<'_>) -> Component {
    Component {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        description: row.get(2).unwrap_or_default(),
        input_schema: json_column(row.get(3).ok()),
        output_schema: json_column(row.get(4).ok()),
        tags: json_column(row.get(5).ok()),
        active: row.get::<_, i64>(6).unwrap_or(1) != 0,
        configuration: json_column(row.get(7).ok()),
        skill_id: row.get(8).unwrap_or(None),
        created_at: millis_to_datetime(row.get(9).unwrap_or(0)),
        updated_at: millis_to_datetime(row.get(10).unwrap_or(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_with_explicit_id_and_update_configuration() {
        let store = ComponentStore::new(Database::open_in_memory().unwrap());
        let mut input = CreateComponentInput::new("echo", json!({"kind": "mock", "payload": {"a": 1}}));
        input.id = Some("echo-1".into());
        input.tags = vec!["demo".into()];
        let created = store.create(input).await.unwrap();
        assert_eq!(created.id, "echo-1");

        let fetched = store.require("echo-1").await.unwrap();
        assert_eq!(fetched.kind(), Some("mock"));
        assert_eq!(fetched.tags, vec!["demo".to_string()]);

        let mut config = fetched.configuration.clone();
        config.insert("payload".into(), json!({"a": 2}));
        store
            .update("echo-1", UpdateComponentInput {
                configuration: Some(config),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.require("echo-1").await.unwrap().configuration["payload"]["a"], 2);
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
