use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::instrument;

use crate::domain::{ports::MemoryStore, ChatTurn, DomainError, MessageRole, Session};

fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::external(format!("memory database: {e}"))
}

/// Conversation history in an embedded SQLite database.
#[derive(Clone)]
pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

impl SqliteMemoryStore {
    pub async fn connect(path: &Path) -> Result<Self, DomainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    /// A private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DomainError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_turns_session ON chat_turns(session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    #[instrument(skip(self))]
    async fn ensure_session(&self, session_id: &str) -> Result<bool, DomainError> {
        let session = Session::new(session_id);

        let result = sqlx::query(
            "INSERT INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&session.id)
        .bind(session.created_at.timestamp_millis())
        .bind(session.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let created = result.rows_affected() == 1;
        if created {
            tracing::info!(session_id, "session created");
        }
        Ok(created)
    }

    #[instrument(skip(self, turn), fields(role = turn.role.as_key()))]
    async fn append_turn(&self, session_id: &str, turn: &ChatTurn) -> Result<(), DomainError> {
        let at = turn.created_at.timestamp_millis();
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(at)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "INSERT INTO chat_turns (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(turn.role.as_key())
        .bind(&turn.content)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    #[instrument(skip(self))]
    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, DomainError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT role, content, created_at FROM chat_turns \
             WHERE session_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut turns = rows
            .into_iter()
            .map(|(role, content, created_at)| {
                let role = MessageRole::from_key(&role)
                    .ok_or_else(|| DomainError::internal(format!("unknown role {role:?}")))?;
                Ok(ChatTurn {
                    role,
                    content,
                    created_at: DateTime::<Utc>::from_timestamp_millis(created_at)
                        .unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        turns.reverse();
        Ok(turns)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_err)
    }
}
