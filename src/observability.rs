use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

use crate::workflow::WorkflowError;

/// Counters for workflow engine activity. While disabled, recording is a no-op.
#[derive(Debug)]
pub struct WorkflowMetrics {
    enabled: AtomicBool,
    pub changes_applied: AtomicU64,
    pub checklist_updates: AtomicU64,
    pub edit_lock_violations: AtomicU64,
    pub insufficient_privilege: AtomicU64,
    pub invalid_assignee: AtomicU64,
    pub illegal_transitions: AtomicU64,
    pub comment_required: AtomicU64,
    pub unknown_tabs: AtomicU64,
    pub concurrent_modifications: AtomicU64,
    pub other_failures: AtomicU64,
}

impl Default for WorkflowMetrics {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            changes_applied: AtomicU64::new(0),
            checklist_updates: AtomicU64::new(0),
            edit_lock_violations: AtomicU64::new(0),
            insufficient_privilege: AtomicU64::new(0),
            invalid_assignee: AtomicU64::new(0),
            illegal_transitions: AtomicU64::new(0),
            comment_required: AtomicU64::new(0),
            unknown_tabs: AtomicU64::new(0),
            concurrent_modifications: AtomicU64::new(0),
            other_failures: AtomicU64::new(0),
        }
    }
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record_change(&self) {
        if !self.is_enabled() {
            return;
        }
        self.changes_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checklist_update(&self) {
        if !self.is_enabled() {
            return;
        }
        self.checklist_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, error: &WorkflowError) {
        if !self.is_enabled() {
            return;
        }
        let counter = match error {
            WorkflowError::EditLockViolation { .. } => &self.edit_lock_violations,
            WorkflowError::InsufficientPrivilege { .. } => &self.insufficient_privilege,
            WorkflowError::InvalidAssignee { .. } => &self.invalid_assignee,
            WorkflowError::IllegalTransition { .. } => &self.illegal_transitions,
            WorkflowError::CommentRequired => &self.comment_required,
            WorkflowError::UnknownTab(_) => &self.unknown_tabs,
            WorkflowError::ConcurrentModification { .. } => &self.concurrent_modifications,
            _ => &self.other_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            changes_applied: self.changes_applied.load(Ordering::Relaxed),
            checklist_updates: self.checklist_updates.load(Ordering::Relaxed),
            rejections: self.edit_lock_violations.load(Ordering::Relaxed)
                + self.insufficient_privilege.load(Ordering::Relaxed)
                + self.invalid_assignee.load(Ordering::Relaxed)
                + self.illegal_transitions.load(Ordering::Relaxed)
                + self.comment_required.load(Ordering::Relaxed)
                + self.unknown_tabs.load(Ordering::Relaxed)
                + self.concurrent_modifications.load(Ordering::Relaxed)
                + self.other_failures.load(Ordering::Relaxed),
            concurrent_modifications: self.concurrent_modifications.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        if !self.is_enabled() {
            return;
        }
        let stats = self.get_stats();
        info!(
            "Workflow metrics: changes={}, checklist_updates={}, rejections={}, conflicts={}",
            stats.changes_applied,
            stats.checklist_updates,
            stats.rejections,
            stats.concurrent_modifications
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStats {
    pub changes_applied: u64,
    pub checklist_updates: u64,
    pub rejections: u64,
    pub concurrent_modifications: u64,
}

/// Global metrics instance
static WORKFLOW_METRICS: std::sync::LazyLock<WorkflowMetrics> =
    std::sync::LazyLock::new(WorkflowMetrics::new);

pub fn workflow_metrics() -> &'static WorkflowMetrics {
    &WORKFLOW_METRICS
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}
