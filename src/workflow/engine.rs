// Review & publication workflow engine.
//
// Every mutating call runs lock check -> privilege check -> validation ->
// compare-and-swap as one unit. A failed call leaves the stored workflow and
// its audit trail untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn, Instrument};

use super::audit::{AuditEntry, NewAuditEntry};
use super::error::WorkflowError;
use super::lock::{Borehole, BoreholeSource};
use super::roles::{RoleAuthority, RoleGrantSource, RoleLevel};
use super::store::WorkflowStore;
use super::transitions::Move;
use super::types::{BoreholeId, ChangeRequest, ChecklistKind, Status, UserId, Workflow, WorkflowId};
use crate::config::WorkflowSettings;
use crate::observability::{workflow_metrics, OperationTimer, WorkflowMetrics};
use crate::telemetry::{create_workflow_span, generate_correlation_id};

/// Notification published after every successful mutation, so dependent
/// views keyed by borehole can refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub borehole_id: BoreholeId,
    pub workflow_id: WorkflowId,
    pub status: Status,
    pub version: u64,
    pub kind: WorkflowEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowEventKind {
    Created,
    Changed {
        from_status: Option<Status>,
        to_status: Status,
        assignee_id: Option<UserId>,
    },
    ChecklistUpdated {
        checklist: ChecklistKind,
        complete: bool,
    },
}

/// Result of a validated request
enum Applied {
    Saved(Workflow),
    /// Nothing to write; e.g. checklist flags already had the requested values
    Unchanged(Workflow),
}

/// Orchestrates status transitions, assignment and checklist updates
pub struct WorkflowStateMachine {
    store: Arc<dyn WorkflowStore>,
    boreholes: Arc<dyn BoreholeSource>,
    authority: RoleAuthority,
    settings: WorkflowSettings,
    events: broadcast::Sender<WorkflowEvent>,
}

impl fmt::Debug for WorkflowStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowStateMachine")
            .field("settings", &self.settings)
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}

impl WorkflowStateMachine {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        boreholes: Arc<dyn BoreholeSource>,
        grants: Arc<dyn RoleGrantSource>,
        settings: WorkflowSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_channel_capacity.max(1));
        Self {
            store,
            boreholes,
            authority: RoleAuthority::new(grants),
            settings,
            events,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn authority(&self) -> &RoleAuthority {
        &self.authority
    }

    /// Receive change notifications from this point on
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// Create the workflow for a newly created borehole. Calling it again for
    /// the same borehole returns the existing workflow.
    pub async fn create_workflow(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError> {
        self.boreholes
            .borehole(borehole_id)
            .await?
            .ok_or(WorkflowError::BoreholeNotFound(borehole_id))?;

        if let Some(existing) = self.store.load(borehole_id).await? {
            return Ok(existing);
        }

        let workflow = self.store.create(borehole_id).await?;
        info!(borehole = %borehole_id, workflow = %workflow.id, "Workflow created");
        self.publish(&workflow, WorkflowEventKind::Created);
        Ok(workflow)
    }

    pub async fn workflow(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError> {
        self.store
            .load(borehole_id)
            .await?
            .ok_or(WorkflowError::WorkflowNotFound(borehole_id))
    }

    /// Audit trail, oldest first
    pub async fn history(&self, borehole_id: BoreholeId) -> Result<Vec<AuditEntry>, WorkflowError> {
        Ok(self.workflow(borehole_id).await?.history.all().to_vec())
    }

    pub async fn is_fully_reviewed(&self, borehole_id: BoreholeId) -> Result<bool, WorkflowError> {
        Ok(self.workflow(borehole_id).await?.is_fully_reviewed())
    }

    pub async fn is_fully_published(&self, borehole_id: BoreholeId) -> Result<bool, WorkflowError> {
        Ok(self.workflow(borehole_id).await?.is_fully_published())
    }

    /// Apply a status, assignee and/or requested-changes update and record it
    /// in the audit trail
    pub async fn request_change(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
        request: ChangeRequest,
    ) -> Result<Workflow, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("request_change", borehole_id.0, actor.0, &correlation_id);

        async move {
            let timer = OperationTimer::new("request_change");
            let result = self.apply_change(actor, borehole_id, request).await;
            timer.finish();
            self.record_outcome(result, WorkflowMetrics::record_change, |workflow| {
                let latest = workflow.history.latest();
                WorkflowEventKind::Changed {
                    from_status: latest.and_then(|e| e.from_status),
                    to_status: workflow.status,
                    assignee_id: latest.and_then(|e| e.assignee_id),
                }
            })
        }
        .instrument(span)
        .await
    }

    /// Set one checklist flag. Checklist edits are not part of the audit trail.
    pub async fn update_checklist(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
        kind: ChecklistKind,
        tab: &str,
        value: bool,
    ) -> Result<Workflow, WorkflowError> {
        self.update_checklist_many(actor, borehole_id, kind, vec![(tab.to_string(), value)])
            .await
    }

    /// Set several checklist flags at once; an unknown name rejects the whole batch
    pub async fn update_checklist_many(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
        kind: ChecklistKind,
        changes: Vec<(String, bool)>,
    ) -> Result<Workflow, WorkflowError> {
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("update_checklist", borehole_id.0, actor.0, &correlation_id);

        async move {
            let timer = OperationTimer::new("update_checklist");
            let result = self.apply_checklist(actor, borehole_id, kind, &changes).await;
            timer.finish();
            self.record_outcome(
                result,
                WorkflowMetrics::record_checklist_update,
                |workflow| WorkflowEventKind::ChecklistUpdated {
                    checklist: kind,
                    complete: workflow.checklist(kind).is_complete(),
                },
            )
        }
        .instrument(span)
        .await
    }

    async fn apply_change(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
        request: ChangeRequest,
    ) -> Result<Applied, WorkflowError> {
        let borehole = self.locked_borehole(actor, borehole_id).await?;
        let privilege = self
            .authority
            .effective_privilege(actor, borehole.workgroup_id)
            .await?;
        require(privilege, self.settings.thresholds.edit)?;

        if let Some(assignee) = request.new_assignee_id {
            let required = self.settings.thresholds.assignee;
            if !self
                .authority
                .meets_threshold(assignee, borehole.workgroup_id, required)
                .await?
            {
                return Err(WorkflowError::InvalidAssignee { assignee, required });
            }
        }

        let current = self.workflow(borehole_id).await?;
        let mut next = current.clone();
        let mut from_status = None;

        if let Some(target) = request.new_status {
            let kind = Move::classify(current.status, target).ok_or(
                WorkflowError::IllegalTransition {
                    from: current.status,
                    to: target,
                },
            )?;
            require(privilege, self.settings.thresholds.move_threshold(kind, target))?;

            match kind {
                Move::Reject if !request.has_comment() => {
                    return Err(WorkflowError::CommentRequired);
                }
                Move::Advance
                    if target == Status::Published
                        && self.settings.require_complete_publication_checklist
                        && !current.is_fully_published() =>
                {
                    return Err(WorkflowError::PublicationChecklistIncomplete);
                }
                _ => {}
            }

            if let Some(requested) = request.has_requested_changes {
                next.has_requested_changes = requested;
            }
            match kind {
                Move::Reject => next.has_requested_changes = true,
                Move::Restart => next.has_requested_changes = false,
                Move::Advance => {}
            }

            from_status = Some(current.status);
            next.status = target;
        } else if let Some(requested) = request.has_requested_changes {
            next.has_requested_changes = requested;
        }

        if let Some(assignee) = request.new_assignee_id {
            next.assignee_id = Some(assignee);
        }

        let comment = request.comment.trim();
        next.history.append(NewAuditEntry {
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            from_status,
            to_status: next.status,
            created_by: actor,
            created_at: Utc::now(),
            assignee_id: request.new_assignee_id,
        });

        let saved = self.store.compare_and_swap(current.version, next).await?;
        info!(
            from_status = ?from_status,
            to_status = %saved.status,
            assignee = ?saved.assignee_id,
            has_requested_changes = saved.has_requested_changes,
            version = saved.version,
            "Workflow change applied"
        );
        Ok(Applied::Saved(saved))
    }

    async fn apply_checklist(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
        kind: ChecklistKind,
        changes: &[(String, bool)],
    ) -> Result<Applied, WorkflowError> {
        let borehole = self.locked_borehole(actor, borehole_id).await?;
        let privilege = self
            .authority
            .effective_privilege(actor, borehole.workgroup_id)
            .await?;
        require(privilege, self.settings.thresholds.checklist_threshold(kind))?;

        let current = self.workflow(borehole_id).await?;
        let mut next = current.clone();
        let changed = next
            .checklist_mut(kind)
            .apply(changes.iter().map(|(name, value)| (name.as_str(), *value)))?;

        if changed == 0 {
            return Ok(Applied::Unchanged(current));
        }

        let saved = self.store.compare_and_swap(current.version, next).await?;
        info!(
            checklist = %kind,
            changed,
            completed = saved.checklist(kind).completed_count(),
            version = saved.version,
            "Checklist updated"
        );
        Ok(Applied::Saved(saved))
    }

    /// Load the borehole and make sure `actor` currently holds its edit lock
    async fn locked_borehole(
        &self,
        actor: UserId,
        borehole_id: BoreholeId,
    ) -> Result<Borehole, WorkflowError> {
        let borehole = self
            .boreholes
            .borehole(borehole_id)
            .await?
            .ok_or(WorkflowError::BoreholeNotFound(borehole_id))?;

        if !borehole.is_locked_by(actor, Utc::now(), self.settings.lock_timeout()) {
            return Err(WorkflowError::EditLockViolation {
                user: actor,
                borehole: borehole_id,
            });
        }
        Ok(borehole)
    }

    fn record_outcome(
        &self,
        result: Result<Applied, WorkflowError>,
        count: impl FnOnce(&WorkflowMetrics),
        event: impl FnOnce(&Workflow) -> WorkflowEventKind,
    ) -> Result<Workflow, WorkflowError> {
        match result {
            Ok(Applied::Saved(workflow)) => {
                count(workflow_metrics());
                let kind = event(&workflow);
                self.publish(&workflow, kind);
                Ok(workflow)
            }
            Ok(Applied::Unchanged(workflow)) => Ok(workflow),
            Err(error) => {
                workflow_metrics().record_rejection(&error);
                warn!(code = error.code(), error = %error, "Workflow request rejected");
                Err(error)
            }
        }
    }

    fn publish(&self, workflow: &Workflow, kind: WorkflowEventKind) {
        // No subscribers is fine
        let _ = self.events.send(WorkflowEvent {
            borehole_id: workflow.borehole_id,
            workflow_id: workflow.id,
            status: workflow.status,
            version: workflow.version,
            kind,
        });
    }
}

fn require(actual: Option<RoleLevel>, required: RoleLevel) -> Result<(), WorkflowError> {
    if actual.is_some_and(|level| level >= required) {
        Ok(())
    } else {
        Err(WorkflowError::InsufficientPrivilege { required, actual })
    }
}
