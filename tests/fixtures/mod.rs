//! Shared fixtures for workflow integration tests
//!
//! One workgroup with one user per role, a single borehole, and helpers that
//! take the edit lock on behalf of the acting user before each request.

#![allow(dead_code)]

use borehole_workflow::{
    Borehole, BoreholeId, ChangeRequest, ChecklistKind, InMemoryDirectory, InMemoryWorkflowStore,
    Role, Status, UserId, Workflow, WorkflowError, WorkflowSettings, WorkflowStateMachine,
    WorkflowStore, Workgroup, WorkgroupId,
};
use chrono::Utc;
use std::sync::Arc;

pub const GROUP: WorkgroupId = WorkgroupId(1);
pub const OTHER_GROUP: WorkgroupId = WorkgroupId(2);
pub const BOREHOLE: BoreholeId = BoreholeId(100);

pub const EDITOR: UserId = UserId(1);
pub const CONTROLLER: UserId = UserId(2);
pub const VALIDATOR: UserId = UserId(3);
pub const PUBLISHER: UserId = UserId(4);
pub const VIEWER: UserId = UserId(5);
/// Publisher in OTHER_GROUP only
pub const OUTSIDER: UserId = UserId(6);

pub struct TestEnv {
    pub engine: WorkflowStateMachine,
    pub directory: Arc<InMemoryDirectory>,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_settings(WorkflowSettings::default()).await
    }

    pub async fn with_settings(settings: WorkflowSettings) -> Self {
        Self::with_store(Arc::new(InMemoryWorkflowStore::new()), settings).await
    }

    pub async fn with_store(store: Arc<dyn WorkflowStore>, settings: WorkflowSettings) -> Self {
        let directory = Arc::new(seeded_directory().await);
        let engine = WorkflowStateMachine::new(store, directory.clone(), directory.clone(), settings);
        engine
            .create_workflow(BOREHOLE)
            .await
            .expect("workflow for seeded borehole");
        Self { engine, directory }
    }

    pub async fn lock_for(&self, user: UserId) {
        self.directory
            .lock(BOREHOLE, user, Utc::now())
            .await
            .expect("seeded borehole");
    }

    pub async fn workflow(&self) -> Workflow {
        self.engine.workflow(BOREHOLE).await.expect("seeded workflow")
    }

    /// Take the lock as `actor`, then submit the request
    pub async fn change(
        &self,
        actor: UserId,
        request: ChangeRequest,
    ) -> Result<Workflow, WorkflowError> {
        self.lock_for(actor).await;
        self.engine.request_change(actor, BOREHOLE, request).await
    }

    pub async fn move_to(&self, actor: UserId, status: Status) -> Result<Workflow, WorkflowError> {
        self.change(actor, ChangeRequest::new("").with_status(status))
            .await
    }

    pub async fn check(
        &self,
        actor: UserId,
        kind: ChecklistKind,
        tab: &str,
        value: bool,
    ) -> Result<Workflow, WorkflowError> {
        self.lock_for(actor).await;
        self.engine
            .update_checklist(actor, BOREHOLE, kind, tab, value)
            .await
    }

    /// Drive the seeded workflow forward to `target` as the publisher
    pub async fn advance_to(&self, target: Status) -> Workflow {
        let mut workflow = self.workflow().await;
        while workflow.status != target {
            let next = workflow.status.next().expect("target reachable by advancing");
            workflow = self
                .move_to(PUBLISHER, next)
                .await
                .expect("publisher may advance");
        }
        workflow
    }
}

pub async fn seeded_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory
        .add_workgroup(Workgroup {
            id: GROUP,
            name: "Geology".to_string(),
            enabled: true,
        })
        .await;
    directory
        .add_workgroup(Workgroup {
            id: OTHER_GROUP,
            name: "Hydrogeology".to_string(),
            enabled: true,
        })
        .await;

    directory.grant(EDITOR, GROUP, Role::Editor).await;
    directory.grant(CONTROLLER, GROUP, Role::Controller).await;
    directory.grant(VALIDATOR, GROUP, Role::Validator).await;
    directory.grant(PUBLISHER, GROUP, Role::Publisher).await;
    directory.grant(VIEWER, GROUP, Role::View).await;
    directory.grant(OUTSIDER, OTHER_GROUP, Role::Publisher).await;

    directory.add_borehole(Borehole::new(BOREHOLE, GROUP)).await;
    directory
}
