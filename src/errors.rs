//! Error types for the approval engine

use thiserror::Error;

use crate::state::types::{TaskId, TransitionId};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors surfaced by the transition engine and its repositories
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The subject's current state is not one of the transition's from-states
    #[error("Cannot apply {transition} to {subject}: current state {state} is not a legal from-state")]
    InvalidTransition {
        subject: String,
        transition: String,
        state: String,
    },

    /// The transition's eligibility guard rejected the subject
    #[error("Cannot apply {transition} to {subject}: guard rejected the subject")]
    GuardRejected { subject: String, transition: String },

    /// Another transition is still incomplete for the subject
    #[error("Subject {subject} already has a pending transition ({pending})")]
    TransitionAlreadyPending {
        subject: String,
        pending: TransitionId,
    },

    /// The derived state moved between the caller's check and the write
    #[error("State of {subject} changed: expected {expected}, found {actual}")]
    StaleState {
        subject: String,
        expected: String,
        actual: String,
    },

    /// The follow-up task could not be created; the transition was not kept
    #[error("Task assignment to {role} failed: {reason}")]
    TaskAssignment { role: String, reason: String },

    /// Completion was requested but the subject has nothing pending
    #[error("Subject {0} has no pending transition")]
    NoPendingTransition(String),

    #[error("Transition not found: {0}")]
    TransitionNotFound(TransitionId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Transition {0} is already completed")]
    AlreadyCompleted(TransitionId),

    /// A persisted or user-supplied name did not match any known value
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("Invoice {0} is already registered")]
    AlreadyRegistered(String),

    /// Another process holds the workspace for writing
    #[error("Workspace {0} is locked by another invoice-approval run")]
    WorkspaceLocked(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    /// True for errors caused by the caller invoking an operation it should
    /// have checked first (hidden action, stale view, double submit).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidTransition { .. }
                | WorkflowError::GuardRejected { .. }
                | WorkflowError::TransitionAlreadyPending { .. }
                | WorkflowError::StaleState { .. }
                | WorkflowError::AlreadyCompleted(_)
        )
    }

    pub fn storage<E: std::fmt::Display>(error: E) -> Self {
        WorkflowError::Storage(error.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violations() {
        let pending = WorkflowError::TransitionAlreadyPending {
            subject: "INV-1".into(),
            pending: TransitionId::new(),
        };
        assert!(pending.is_contract_violation());
        assert!(pending.to_string().contains("already has a pending transition"));

        let task = WorkflowError::TaskAssignment {
            role: "TREASURER".into(),
            reason: "nobody holds the role".into(),
        };
        assert!(!task.is_contract_violation());
        assert!(!WorkflowError::storage("disk full").is_contract_violation());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = WorkflowError::InvalidTransition {
            subject: "INV-7".into(),
            transition: "PAY".into(),
            state: "NEW".into(),
        };
        let message = err.to_string();
        assert!(message.contains("PAY"));
        assert!(message.contains("INV-7"));
        assert!(message.contains("NEW"));
    }
}
