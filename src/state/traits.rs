// Traits at the seams of the engine: workflow kinds plug in their states,
// transition catalog and subject; storage plugs in a repository.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::Result;
use crate::state::types::{NewTransition, Role, SubjectId, Task, TaskId, Transition, TransitionId};

/// Closed, ordered set of states for one workflow kind
pub trait WorkflowState:
    Copy + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// State of a subject that has never been transitioned
    fn initial() -> Self;

    /// Every state, in workflow order
    fn all() -> &'static [Self];

    /// Stable persisted name
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|state| state.name() == name)
    }
}

/// Business object that moves through a workflow
pub trait WorkflowSubject: Send + Sync {
    fn subject_id(&self) -> SubjectId;
}

/// A fixed catalog of named transitions for one workflow kind.
///
/// Each variant declares its legal from-states and single to-state. The
/// provided methods are the defaults every variant gets unless it overrides
/// them: always applicable, no task assignment, no side effect.
pub trait StateTransitionType:
    Copy + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type State: WorkflowState;
    type Subject: WorkflowSubject;
    /// Read-only information guards and role policies may consult
    type Lookups: ?Sized + Send + Sync;

    /// The whole catalog, in declaration order
    fn all() -> &'static [Self];

    /// Stable persisted name
    fn name(&self) -> &'static str;

    /// Legal source states, or `None` for the pseudo-initial variant
    fn from_states(&self) -> Option<&'static [Self::State]>;

    fn to_state(&self) -> Self::State;

    /// Extra eligibility beyond the from-state match
    fn can_apply(&self, _subject: &Self::Subject, _lookups: &Self::Lookups) -> bool {
        true
    }

    /// Role to create a follow-up task for; `None` creates no task
    fn assign_task_to(&self, _lookups: &Self::Lookups) -> Option<Role> {
        None
    }

    /// Side effect on the subject, run after the transition is persisted
    fn apply_to(&self, _subject: &mut Self::Subject, _lookups: &Self::Lookups) {}

    fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.name() == name)
    }

    /// Human-readable rendering of the name, e.g. "Approve As Treasurer"
    fn friendly_name(&self) -> String {
        self.name()
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let lower = word.to_ascii_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether `state` is one of this variant's from-states
    fn is_legal_from(&self, state: Self::State) -> bool {
        self.from_states()
            .map(|states| states.contains(&state))
            .unwrap_or(false)
    }

    /// Build the persistence request for applying this variant from `from_state`
    fn prepare_transition(
        &self,
        subject: &Self::Subject,
        lookups: &Self::Lookups,
        from_state: Option<Self::State>,
    ) -> NewTransition<Self> {
        NewTransition {
            subject: subject.subject_id(),
            transition_type: *self,
            from_state,
            to_state: self.to_state(),
            assigned_role: self.assign_task_to(lookups),
            description: self.friendly_name(),
        }
    }
}

/// Storage of transition records and their linked tasks.
///
/// `create` is the only write that starts work, and it is atomic: inside one
/// unit it re-checks that the subject has no incomplete transition and that
/// its derived state still equals `request.from_state`, inserts the record,
/// and creates the linked task when a role is assigned. If any step fails
/// nothing is kept.
#[async_trait]
pub trait TransitionRepository<T: StateTransitionType>: Send + Sync {
    async fn create(&self, request: NewTransition<T>) -> Result<Transition<T>>;

    /// The subject's single incomplete transition, if any
    async fn find_by_incomplete(&self, subject: &SubjectId) -> Result<Option<Transition<T>>>;

    /// The subject's most recently created transition, complete or not
    async fn find_most_recent(&self, subject: &SubjectId) -> Result<Option<Transition<T>>>;

    async fn find_by_task(&self, task: &TaskId) -> Result<Option<Transition<T>>>;

    /// All transitions of the subject in creation order
    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Vec<Transition<T>>>;

    async fn find_task(&self, task: &TaskId) -> Result<Option<Task>>;

    /// Incomplete tasks, optionally restricted to one role
    async fn open_tasks(&self, role: Option<Role>) -> Result<Vec<Task>>;

    /// Mark the transition and its task (if any) completed
    async fn complete(&self, transition: &TransitionId) -> Result<Transition<T>>;

    /// Bulk teardown of every transition and task; returns the records removed
    async fn delete_all(&self) -> Result<u64>;
}

#[async_trait]
impl<T, R> TransitionRepository<T> for std::sync::Arc<R>
where
    T: StateTransitionType,
    R: TransitionRepository<T> + ?Sized,
{
    async fn create(&self, request: NewTransition<T>) -> Result<Transition<T>> {
        (**self).create(request).await
    }

    async fn find_by_incomplete(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        (**self).find_by_incomplete(subject).await
    }

    async fn find_most_recent(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        (**self).find_most_recent(subject).await
    }

    async fn find_by_task(&self, task: &TaskId) -> Result<Option<Transition<T>>> {
        (**self).find_by_task(task).await
    }

    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Vec<Transition<T>>> {
        (**self).find_by_subject(subject).await
    }

    async fn find_task(&self, task: &TaskId) -> Result<Option<Task>> {
        (**self).find_task(task).await
    }

    async fn open_tasks(&self, role: Option<Role>) -> Result<Vec<Task>> {
        (**self).open_tasks(role).await
    }

    async fn complete(&self, transition: &TransitionId) -> Result<Transition<T>> {
        (**self).complete(transition).await
    }

    async fn delete_all(&self) -> Result<u64> {
        (**self).delete_all().await
    }
}
