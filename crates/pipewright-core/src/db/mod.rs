//! SQLite descriptor store for the Pipewright engine.
//!
//! Uses rusqlite with WAL mode for concurrent read performance.
//! All database operations are executed via `tokio::task::spawn_blocking`
//! to avoid blocking the async runtime.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::EngineError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(db_path: &str) -> Result<Self, EngineError> {
        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| EngineError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| EngineError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EngineError::Database(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| EngineError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EngineError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| EngineError::Database(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| EngineError::Database(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), EngineError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS workflows (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL,
                    description     TEXT NOT NULL DEFAULT '',
                    steps           TEXT NOT NULL DEFAULT '[]',
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_workflows_name ON workflows(name);

                CREATE TABLE IF NOT EXISTS skills (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL UNIQUE,
                    description     TEXT NOT NULL DEFAULT '',
                    category        TEXT NOT NULL DEFAULT 'uncategorized',
                    skill_type      TEXT NOT NULL,
                    input_schema    TEXT NOT NULL DEFAULT '{}',
                    output_schema   TEXT NOT NULL DEFAULT '{}',
                    configuration   TEXT NOT NULL DEFAULT '{}',
                    is_reusable     INTEGER NOT NULL DEFAULT 1,
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category);

                CREATE TABLE IF NOT EXISTS components (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL,
                    description     TEXT NOT NULL DEFAULT '',
                    input_schema    TEXT NOT NULL DEFAULT '{}',
                    output_schema   TEXT NOT NULL DEFAULT '{}',
                    tags            TEXT NOT NULL DEFAULT '[]',
                    active          INTEGER NOT NULL DEFAULT 1,
                    configuration   TEXT NOT NULL DEFAULT '{}',
                    skill_id        TEXT REFERENCES skills(id) ON DELETE SET NULL,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_components_name ON components(name);

                CREATE TABLE IF NOT EXISTS ai_models (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL,
                    deployment_name TEXT NOT NULL,
                    api_version     TEXT NOT NULL,
                    description     TEXT,
                    is_active       INTEGER NOT NULL DEFAULT 0,
                    created_at      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS business_contexts (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL UNIQUE,
                    description     TEXT NOT NULL DEFAULT '',
                    department      TEXT NOT NULL DEFAULT '',
                    manual_content  TEXT,
                    workflow_id     TEXT REFERENCES workflows(id) ON DELETE SET NULL,
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    created_at      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS run_executions (
                    id                  TEXT PRIMARY KEY,
                    workflow_id         TEXT NOT NULL REFERENCES workflows(id) ON DELETE CASCADE,
                    status              TEXT NOT NULL DEFAULT 'PENDING',
                    input_payload       TEXT NOT NULL DEFAULT '{}',
                    output_payload      TEXT,
                    log                 TEXT NOT NULL DEFAULT '[]',
                    trace_id            TEXT NOT NULL,
                    identity            TEXT,
                    business_context_id TEXT,
                    started_at          INTEGER NOT NULL,
                    finished_at         INTEGER
                );
                CREATE INDEX IF NOT EXISTS idx_runs_workflow ON run_executions(workflow_id);

                CREATE TABLE IF NOT EXISTS usage_records (
                    id              TEXT PRIMARY KEY,
                    user_id         TEXT NOT NULL,
                    app_name        TEXT NOT NULL,
                    model_name      TEXT NOT NULL,
                    tokens_input    INTEGER NOT NULL DEFAULT 0,
                    tokens_output   INTEGER NOT NULL DEFAULT 0,
                    total_tokens    INTEGER NOT NULL DEFAULT 0,
                    estimated_cost  REAL NOT NULL DEFAULT 0,
                    trace_id        TEXT,
                    timestamp       INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_usage_user ON usage_records(user_id);
                CREATE INDEX IF NOT EXISTS idx_usage_trace ON usage_records(trace_id);
                ",
            )
        })
    }
}

/// Decode a JSON text column, falling back to the type's default on bad data.
pub(crate) fn json_column<T>(raw: Option<String>) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub(crate) fn millis_to_datetime(ms: i64) -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc
        .timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(chrono::Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_creates_tables() {
        let db = Database::open_in_memory().unwrap();
        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt =
                    conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap();
        for expected in [
            "ai_models",
            "business_contexts",
            "components",
            "run_executions",
            "skills",
            "usage_records",
            "workflows",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
        }
    }

    #[test]
    fn test_json_column_defaults_on_garbage() {
        let v: Vec<String> = json_column(Some("not json".to_string()));
        assert!(v.is_empty());
        let v: Vec<String> = json_column(Some("[\"a\"]".to_string()));
        assert_eq!(v, vec!["a".to_string()]);
    }
}
