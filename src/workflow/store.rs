use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::WorkflowError;
use super::types::{BoreholeId, Workflow, WorkflowId};

/// Persistence port for workflow aggregates.
///
/// `compare_and_swap` must apply the new state only if the stored version
/// still equals `expected_version`, and must bump the version on success.
/// That is the only mutation path, so two requests racing from the same
/// pre-state can never both be applied.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Create the initial Draft workflow for a newly created borehole
    async fn create(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError>;

    async fn load(&self, borehole_id: BoreholeId) -> Result<Option<Workflow>, WorkflowError>;

    /// Returns the stored workflow with its new version
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        workflow: Workflow,
    ) -> Result<Workflow, WorkflowError>;
}

/// Process-local store, keyed by borehole
#[derive(Debug)]
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<BoreholeId, Workflow>>,
    next_id: AtomicI64,
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn create(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError> {
        let mut workflows = self.workflows.write().await;
        if let Some(existing) = workflows.get(&borehole_id) {
            return Ok(existing.clone());
        }

        let id = WorkflowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let workflow = Workflow::new(id, borehole_id);
        workflows.insert(borehole_id, workflow.clone());
        debug!(borehole = %borehole_id, workflow = %id, "Created workflow");
        Ok(workflow)
    }

    async fn load(&self, borehole_id: BoreholeId) -> Result<Option<Workflow>, WorkflowError> {
        Ok(self.workflows.read().await.get(&borehole_id).cloned())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        mut workflow: Workflow,
    ) -> Result<Workflow, WorkflowError> {
        let mut workflows = self.workflows.write().await;
        let stored = workflows
            .get_mut(&workflow.borehole_id)
            .ok_or(WorkflowError::WorkflowNotFound(workflow.borehole_id))?;

        if stored.version != expected_version {
            return Err(WorkflowError::ConcurrentModification {
                borehole: workflow.borehole_id,
                expected: expected_version,
            });
        }

        workflow.version = expected_version + 1;
        *stored = workflow.clone();
        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Status;

    #[tokio::test]
    async fn test_create_is_idempotent_per_borehole() {
        let store = InMemoryWorkflowStore::new();

        let first = store.create(BoreholeId(1)).await.unwrap();
        let again = store.create(BoreholeId(1)).await.unwrap();
        let other = store.create(BoreholeId(2)).await.unwrap();

        assert_eq!(first.id, again.id);
        assert_ne!(first.id, other.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_compare_and_swap_rejects_stale_version() {
        let store = InMemoryWorkflowStore::new();
        let initial = store.create(BoreholeId(1)).await.unwrap();

        let mut first = initial.clone();
        first.status = Status::InReview;
        let saved = store.compare_and_swap(0, first).await.unwrap();
        assert_eq!(saved.version, 1);

        let mut stale = initial.clone();
        stale.status = Status::Reviewed;
        let err = store.compare_and_swap(0, stale).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ConcurrentModification { expected: 0, .. }));

        let stored = store.load(BoreholeId(1)).await.unwrap().unwrap();
        assert_eq!(stored.status, Status::InReview);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_compare_and_swap_requires_existing_workflow() {
        let store = InMemoryWorkflowStore::new();
        let orphan = Workflow::new(WorkflowId(9), BoreholeId(9));

        let err = store.compare_and_swap(0, orphan).await.unwrap_err();
        assert_eq!(err, WorkflowError::WorkflowNotFound(BoreholeId(9)));
    }
}
