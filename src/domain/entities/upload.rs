use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Ingestion progress of one uploaded file. Lives only in process memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub file_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
    pub message: Option<String>,
    pub chunks: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn pending(file_id: Uuid, filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            file_id,
            filename: filename.into(),
            status: UploadStatus::Pending,
            message: None,
            chunks: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_processing(&mut self) {
        self.transition(UploadStatus::Processing, None);
    }

    pub fn mark_completed(&mut self, chunks: usize) {
        self.chunks = Some(chunks);
        self.transition(
            UploadStatus::Completed,
            Some(format!("Indexed {chunks} chunks")),
        );
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.transition(UploadStatus::Failed, Some(error.into()));
    }

    fn transition(&mut self, status: UploadStatus, message: Option<String>) {
        self.status = status;
        self.message = message;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut record = UploadRecord::pending(Uuid::new_v4(), "a.pdf");
        assert_eq!(record.status, UploadStatus::Pending);
        assert!(!record.status.is_terminal());

        record.mark_processing();
        assert_eq!(record.status, UploadStatus::Processing);

        record.mark_completed(3);
        assert_eq!(record.status, UploadStatus::Completed);
        assert_eq!(record.chunks, Some(3));
        assert!(record.status.is_terminal());
    }

    #[test]
    fn test_failed_keeps_message() {
        let mut record = UploadRecord::pending(Uuid::new_v4(), "a.pdf");
        record.mark_failed("broken xref");

        assert_eq!(record.status.as_str(), "failed");
        assert_eq!(record.message.as_deref(), Some("broken xref"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&UploadStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }
}
