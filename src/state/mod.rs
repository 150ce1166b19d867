//! Generic state-transition engine
//!
//! A workflow kind supplies its states, its fixed transition catalog and its
//! subject type; the engine derives current state from transition history,
//! enforces one pending transition per subject, and hands persistence and
//! task creation to a [`TransitionRepository`].

pub mod query;
pub mod service;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod mocks;


pub use query::{derive_current_state, SubjectQueryService};
pub use service::{create_transition, StateTransitionService};
pub use traits::{StateTransitionType, TransitionRepository, WorkflowState, WorkflowSubject};
pub use types::{NewTransition, Role, SubjectId, Task, TaskId, Transition, TransitionId};
