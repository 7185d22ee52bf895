use thiserror::Error;

use super::roles::RoleLevel;
use super::types::{BoreholeId, Status, UserId};

/// Business errors surfaced to the caller. Every failure aborts the whole
/// request; nothing is partially applied and no audit entry is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("User {user} does not hold the edit lock on borehole {borehole}")]
    EditLockViolation { user: UserId, borehole: BoreholeId },

    #[error("Insufficient privilege: requires {required}, user has {actual:?}")]
    InsufficientPrivilege {
        required: RoleLevel,
        actual: Option<RoleLevel>,
    },

    #[error("User {assignee} cannot be assigned: requires at least {required}")]
    InvalidAssignee { assignee: UserId, required: RoleLevel },

    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: Status, to: Status },

    #[error("A comment is required when requesting changes")]
    CommentRequired,

    #[error("Unknown checklist tab '{0}'")]
    UnknownTab(String),

    #[error("Publication checklist must be complete before publishing")]
    PublicationChecklistIncomplete,

    #[error("Borehole {0} not found")]
    BoreholeNotFound(BoreholeId),

    #[error("No workflow exists for borehole {0}")]
    WorkflowNotFound(BoreholeId),

    #[error("Workflow for borehole {borehole} was modified concurrently (expected version {expected})")]
    ConcurrentModification { borehole: BoreholeId, expected: u64 },

    #[error("Storage error: {0}")]
    Store(String),
}

impl WorkflowError {
    /// Stable identifier used by request surfaces to map errors 1:1
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::EditLockViolation { .. } => "EDIT_LOCK_VIOLATION",
            WorkflowError::InsufficientPrivilege { .. } => "INSUFFICIENT_PRIVILEGE",
            WorkflowError::InvalidAssignee { .. } => "INVALID_ASSIGNEE",
            WorkflowError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            WorkflowError::CommentRequired => "COMMENT_REQUIRED",
            WorkflowError::UnknownTab(_) => "UNKNOWN_TAB",
            WorkflowError::PublicationChecklistIncomplete => "PUBLICATION_CHECKLIST_INCOMPLETE",
            WorkflowError::BoreholeNotFound(_) => "BOREHOLE_NOT_FOUND",
            WorkflowError::WorkflowNotFound(_) => "WORKFLOW_NOT_FOUND",
            WorkflowError::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            WorkflowError::Store(_) => "STORE_ERROR",
        }
    }

    /// Process exit code for CLI surfaces; each kind maps to its own code
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::EditLockViolation { .. } => 10,
            WorkflowError::InsufficientPrivilege { .. } => 11,
            WorkflowError::InvalidAssignee { .. } => 12,
            WorkflowError::IllegalTransition { .. } => 13,
            WorkflowError::CommentRequired => 14,
            WorkflowError::UnknownTab(_) => 15,
            WorkflowError::PublicationChecklistIncomplete => 16,
            WorkflowError::BoreholeNotFound(_) => 20,
            WorkflowError::WorkflowNotFound(_) => 21,
            WorkflowError::ConcurrentModification { .. } => 30,
            WorkflowError::Store(_) => 40,
        }
    }

    /// Whether re-submitting the same request may succeed without other changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::ConcurrentModification { .. } | WorkflowError::Store(_)
        )
    }
}
