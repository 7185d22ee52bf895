//! Concurrent requests against one workflow
//!
//! Two requests that start from the same persisted state must never both
//! commit; the loser sees ConcurrentModification and leaves no audit entry.

use async_trait::async_trait;
use borehole_workflow::{
    BoreholeId, ChangeRequest, InMemoryWorkflowStore, Status, Workflow, WorkflowError,
    WorkflowSettings, WorkflowStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

mod fixtures;
use fixtures::*;

/// Store whose next `gated` loads wait for each other after reading, so the
/// requests behind them share the same snapshot
struct RendezvousStore {
    inner: InMemoryWorkflowStore,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl RendezvousStore {
    fn new(parties: usize) -> Self {
        Self {
            inner: InMemoryWorkflowStore::new(),
            barrier: Barrier::new(parties),
            gated: AtomicUsize::new(0),
        }
    }

    fn arm(&self, loads: usize) {
        self.gated.store(loads, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkflowStore for RendezvousStore {
    async fn create(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError> {
        self.inner.create(borehole_id).await
    }

    async fn load(&self, borehole_id: BoreholeId) -> Result<Option<Workflow>, WorkflowError> {
        let snapshot = self.inner.load(borehole_id).await?;
        if self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            self.barrier.wait().await;
        }
        Ok(snapshot)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        workflow: Workflow,
    ) -> Result<Workflow, WorkflowError> {
        self.inner.compare_and_swap(expected_version, workflow).await
    }
}

#[tokio::test]
async fn test_same_snapshot_requests_commit_once() {
    let store = Arc::new(RendezvousStore::new(2));
    let env = TestEnv::with_store(store.clone(), WorkflowSettings::default()).await;
    env.lock_for(PUBLISHER).await;
    store.arm(2);

    let (submit, note) = tokio::join!(
        env.engine.request_change(
            PUBLISHER,
            BOREHOLE,
            ChangeRequest::new("submit").with_status(Status::InReview),
        ),
        env.engine.request_change(
            PUBLISHER,
            BOREHOLE,
            ChangeRequest::new("note").with_assignee(CONTROLLER),
        ),
    );

    let results = [submit, note];
    let committed: Vec<&Workflow> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(committed.len(), 1);

    let conflict = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one request must lose");
    assert!(matches!(
        conflict,
        WorkflowError::ConcurrentModification { expected: 0, .. }
    ));
    assert!(conflict.is_retryable());

    let stored = env.workflow().await;
    assert_eq!(stored.version, 1);
    assert_eq!(stored.history.len(), 1);
    assert_eq!(&stored, committed[0]);
}

#[tokio::test]
async fn test_competing_transitions_never_both_succeed() {
    let env = TestEnv::new().await;
    env.lock_for(PUBLISHER).await;

    let (first, second) = tokio::join!(
        env.engine.request_change(
            PUBLISHER,
            BOREHOLE,
            ChangeRequest::new("").with_status(Status::InReview),
        ),
        env.engine.request_change(
            PUBLISHER,
            BOREHOLE,
            ChangeRequest::new("").with_status(Status::InReview),
        ),
    );

    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    let stored = env.workflow().await;
    assert_eq!(stored.status, Status::InReview);
    assert_eq!(stored.history.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_notes_never_lose_audit_entries() {
    let env = Arc::new(TestEnv::new().await);
    env.lock_for(EDITOR).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let env = env.clone();
            tokio::spawn(async move {
                env.engine
                    .request_change(EDITOR, BOREHOLE, ChangeRequest::new(format!("note {i}")))
                    .await
            })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(err) => assert!(matches!(err, WorkflowError::ConcurrentModification { .. })),
        }
    }

    let stored = env.workflow().await;
    assert!(committed >= 1);
    assert_eq!(stored.history.len(), committed);
    assert_eq!(stored.version, committed as u64);
    let sequences: Vec<u64> = stored.history.all().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=committed as u64).collect::<Vec<_>>());
}
