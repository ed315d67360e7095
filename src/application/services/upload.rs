use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{instrument, Instrument};
use uuid::Uuid;

use crate::application::DocumentService;
use crate::domain::{Document, DomainError, UploadRecord};

type Registry = Arc<RwLock<HashMap<Uuid, UploadRecord>>>;

/// Stores uploaded files and ingests them in the background, keeping an
/// in-memory status record per upload.
pub struct UploadService {
    documents: Arc<DocumentService>,
    upload_dir: PathBuf,
    records: Registry,
}

impl UploadService {
    pub fn new(documents: Arc<DocumentService>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents,
            upload_dir: upload_dir.into(),
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub async fn prepare(&self) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// Saves the file and schedules ingestion. The returned record is the
    /// `pending` snapshot taken before ingestion starts.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn accept(&self, filename: &str, bytes: &[u8]) -> Result<UploadRecord, DomainError> {
        let filename = sanitize_filename(filename)?;
        let file_id = Uuid::new_v4();
        let path = self.upload_dir.join(format!("{file_id}_{filename}"));

        tokio::fs::create_dir_all(&self.upload_dir).await?;
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        let record = UploadRecord::pending(file_id, &filename);
        self.records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .insert(file_id, record.clone());

        tracing::info!(%file_id, %filename, "upload stored, ingestion scheduled");
        self.spawn_ingestion(Document::with_id(file_id, filename, path));

        Ok(record)
    }

    pub fn status(&self, file_id: Uuid) -> Result<UploadRecord, DomainError> {
        self.records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .get(&file_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("File with ID {file_id} not found")))
    }

    /// All uploads of this process, oldest first.
    pub fn list(&self) -> Result<Vec<UploadRecord>, DomainError> {
        let mut records: Vec<_> = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn spawn_ingestion(&self, document: Document) {
        let documents = self.documents.clone();
        let records = self.records.clone();
        let span = tracing::info_span!("ingest", file_id = %document.id);

        tokio::spawn(
            async move {
                update(&records, document.id, |r| r.mark_processing());

                match documents.add_document(&document).await {
                    Ok(chunks) => update(&records, document.id, |r| r.mark_completed(chunks)),
                    Err(e) => {
                        tracing::error!(error = %e, "ingestion failed");
                        update(&records, document.id, |r| r.mark_failed(e.to_string()));
                        if let Err(e) = tokio::fs::remove_file(&document.path).await {
                            tracing::warn!(error = %e, path = %document.path.display(), "could not remove failed upload");
                        }
                    }
                }
            }
            .instrument(span),
        );
    }
}

fn update(records: &Registry, file_id: Uuid, apply: impl FnOnce(&mut UploadRecord)) {
    match records.write() {
        Ok(mut guard) => {
            if let Some(record) = guard.get_mut(&file_id) {
                apply(record);
                tracing::debug!(status = record.status.as_str(), "upload status changed");
            }
        }
        Err(e) => tracing::error!(error = %e, "upload registry poisoned"),
    }
}

/// Keeps only the final path component, replaces characters that are unsafe
/// in file names and requires a `.pdf` extension.
pub fn sanitize_filename(raw: &str) -> Result<String, DomainError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    if !name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(DomainError::validation("Only PDF files are allowed"));
    }
    if name.len() <= ".pdf".len() {
        return Err(DomainError::validation("File name is empty"));
    }

    Ok(name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect())
}
