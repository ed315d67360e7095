use crate::domain::errors::DomainError;

/// Turns raw file bytes into plain text. Implementations are synchronous and
/// may be CPU heavy; callers run them on the blocking pool.
pub trait DocumentParser: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DomainError>;
}
