// Borehole Workflow Library - review & publication workflow for borehole records
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod database;
pub mod observability;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, init_config, DatabaseConfig, ObservabilityConfig, WorkflowConfig, WorkflowSettings};
#[cfg(feature = "database")]
pub use database::SqliteWorkflowStore;
pub use observability::{workflow_metrics, OperationTimer, WorkflowMetrics, WorkflowStats};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflow::{
    AuditEntry, AuditTrail, Borehole, BoreholeId, BoreholeSource, ChangeRequest, ChecklistKind,
    EditLock, InMemoryDirectory, InMemoryWorkflowStore, Move, Role, RoleAuthority,
    RoleGrantSource, RoleLevel, Status, Tab, TabChecklist, Thresholds, UserId, Workflow,
    WorkflowError, WorkflowEvent, WorkflowEventKind, WorkflowId, WorkflowStateMachine,
    WorkflowStore, Workgroup, WorkgroupId, WorkgroupRoleGrant,
};
