// Invoice Approval Library - state transitions and task assignment for
// incoming-invoice approval workflows

pub mod assignment;
pub mod cli;
pub mod config;
pub mod errors;
pub mod invoice;
pub mod observability;
pub mod state;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use assignment::{AssigneeResolver, PersonRoles, RoleDirectory, TaskAssigner};
pub use config::{config, init_config, ApprovalConfig};
pub use errors::{Result, WorkflowError};
pub use invoice::{
    IncomingInvoice, IncomingInvoiceQueryService, IncomingInvoiceState, IncomingInvoiceTransition,
    IncomingInvoiceTransitionService, IncomingInvoiceTransitionType, InvoiceLookups, LinkedRecords,
};
pub use observability::{create_workflow_span, transition_metrics, OperationTimer, TransitionStats};
pub use state::{
    StateTransitionService, StateTransitionType, SubjectId, SubjectQueryService, Task, TaskId,
    Transition, TransitionId, TransitionRepository, WorkflowState, WorkflowSubject, Role,
};
pub use store::{InMemoryTransitionRepository, InvoiceWorkspace, WorkspaceLock};
pub use telemetry::{create_transition_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
