use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::domain::DomainError;

/// Runs blocking closures on tokio's blocking threads, at most `workers` at a
/// time. Callers await the result; the async runtime is never blocked.
#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
}

impl BlockingPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn run<F, T>(&self, task: F) -> Result<T, DomainError>
    where
        F: FnOnce() -> Result<T, DomainError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| DomainError::internal(format!("worker pool closed: {e}")))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| DomainError::internal(format!("blocking task failed: {e}")))?
    }
}
