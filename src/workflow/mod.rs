// Borehole review & publication workflow
// Lock check, role check and mutation happen as one compare-and-swap per request

pub mod audit;
pub mod checklist;
pub mod directory;
pub mod engine;
pub mod error;
pub mod lock;
pub mod roles;
pub mod store;
pub mod transitions;
pub mod types;

pub use audit::{AuditEntry, AuditTrail, NewAuditEntry};
pub use checklist::{Tab, TabChecklist};
pub use directory::InMemoryDirectory;
pub use engine::{WorkflowEvent, WorkflowEventKind, WorkflowStateMachine};
pub use error::WorkflowError;
pub use lock::{Borehole, BoreholeSource, EditLock};
pub use roles::{Role, RoleAuthority, RoleGrantSource, RoleLevel, Workgroup, WorkgroupRoleGrant};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
pub use transitions::{Move, Thresholds};
pub use types::{
    BoreholeId, ChangeRequest, ChecklistKind, Status, UserId, Workflow, WorkflowId, WorkgroupId,
};
