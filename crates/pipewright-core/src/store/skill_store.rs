use chrono::Utc;
use rusqlite::OptionalExtension;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{json_column, millis_to_datetime, Database};
use crate::error::EngineError;
use crate::models::skill::{CreateSkillInput, Skill, SkillType};

const SKILL_COLUMNS: &str = "id, name, description, category, skill_type, input_schema, \
     output_schema, configuration, is_reusable, is_active, created_at, updated_at";

/// Outcome of [`SkillStore::upsert_discovered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Clone)]
pub struct SkillStore {
    db: Database,
}

impl SkillStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateSkillInput) -> Result<Skill, EngineError> {
        if self.get_by_name(&input.name).await?.is_some() {
            return Err(EngineError::BadRequest(format!(
                "Skill '{}' already exists",
                input.name
            )));
        }
        let now = Utc::now();
        let skill = Skill {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            category: input.category,
            skill_type: input.skill_type,
            input_schema: input.input_schema,
            output_schema: input.output_schema,
            configuration: input.configuration,
            is_reusable: input.is_reusable,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.save(&skill).await?;
        Ok(skill)
    }

    pub async fn save(&self, skill: &Skill) -> Result<(), EngineError> {
        let s = skill.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO skills (id, name, description, category, skill_type, input_schema, \
                     output_schema, configuration, is_reusable, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       category = excluded.category,
                       skill_type = excluded.skill_type,
                       input_schema = excluded.input_schema,
                       output_schema = excluded.output_schema,
                       configuration = excluded.configuration,
                       is_reusable = excluded.is_reusable,
                       is_active = excluded.is_active,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        s.id,
                        s.name,
                        s.description,
                        s.category,
                        s.skill_type.as_str(),
                        s.input_schema.to_string(),
                        s.output_schema.to_string(),
                        Value::Object(s.configuration.clone()).to_string(),
                        s.is_reusable as i64,
                        s.is_active as i64,
                        s.created_at.timestamp_millis(),
                        s.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Skill>, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM skills WHERE id = ?1", SKILL_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_skill(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Skill>, EngineError> {
        let name = name.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM skills WHERE name = ?1", SKILL_COLUMNS),
                    rusqlite::params![name],
                    |row| Ok(row_to_skill(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn require(&self, id: &str) -> Result<Skill, EngineError> {
        self.get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Skill {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Skill>, EngineError> {
        self.query_many(format!("SELECT {} FROM skills ORDER BY name ASC", SKILL_COLUMNS))
            .await
    }

    pub async fn list_active(&self) -> Result<Vec<Skill>, EngineError> {
        self.query_many(format!(
            "SELECT {} FROM skills WHERE is_active = 1 ORDER BY name ASC",
            SKILL_COLUMNS
        ))
        .await
    }

    /// Register or refresh a skill found on disk.
    ///
    /// New skills are inserted as active `PYTHON_FUNC` entries. An existing
    /// skill with the same name has its description, category, input schema
    /// and configuration overwritten and is reactivated; its type is kept.
    pub async fn upsert_discovered(
        &self,
        name: &str,
        description: String,
        category: String,
        input_schema: Value,
        configuration: Map<String, Value>,
    ) -> Result<UpsertOutcome, EngineError> {
        match self.get_by_name(name).await? {
            Some(mut existing) => {
                existing.description = description;
                existing.category = category;
                existing.input_schema = input_schema;
                existing.configuration = configuration;
                existing.is_active = true;
                existing.updated_at = Utc::now();
                self.save(&existing).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let mut input = CreateSkillInput::new(name, SkillType::PythonFunc, Value::Null);
                input.description = description;
                input.category = category;
                input.input_schema = input_schema;
                input.configuration = configuration;
                self.create(input).await?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<Skill, EngineError> {
        let mut skill = self.require(id).await?;
        skill.is_active = active;
        skill.updated_at = Utc::now();
        self.save(&skill).await?;
        Ok(skill)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM skills WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }

    async fn query_many(&self, sql: String) -> Result<Vec<Skill>, EngineError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_skill(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

fn row_to_skill(row: &rusqlite::Row<'_>) -> Skill {
    let skill_type: String = row.get(4).unwrap_or_default();
    Skill {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        description: row.get(2).unwrap_or_default(),
        category: row.get(3).unwrap_or_default(),
        skill_type: SkillType::from_str(&skill_type).unwrap_or(SkillType::PythonFunc),
        input_schema: json_column(row.get(5).ok()),
        output_schema: json_column(row.get(6).ok()),
        configuration: json_column(row.get(7).ok()),
        is_reusable: row.get::<_, i64>(8).unwrap_or(1) != 0,
        is_active: row.get::<_, i64>(9).unwrap_or(1) != 0,
        created_at: millis_to_datetime(row.get(10).unwrap_or(0)),
        updated_at: millis_to_datetime(row.get(11).unwrap_or(0)),
    }
}
