//! Admission control for catalog requests.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

/// Counting gate capping simultaneous in-flight operations.
///
/// Clones share the same permits. A permit is returned to the gate when the
/// [`OwnedSemaphorePermit`] is dropped, whichever path the holder exits on.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::Config(
                "gate capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Config("concurrency gate closed".to_string()))
    }
}
