use crate::domain::{errors::DomainError, ChatTurn};
use async_trait::async_trait;

/// Per-session conversation history.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Creates the session if it does not exist. Returns `true` when created.
    async fn ensure_session(&self, session_id: &str) -> Result<bool, DomainError>;

    async fn append_turn(&self, session_id: &str, turn: &ChatTurn) -> Result<(), DomainError>;

    /// The last `limit` turns of the session, oldest first.
    async fn recent_turns(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatTurn>, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}
