// Read side: the current state of a subject is derived from its transition
// history, never stored on the subject.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::Result;
use crate::state::traits::{StateTransitionType, TransitionRepository, WorkflowState, WorkflowSubject};
use crate::state::types::{Role, Task, TaskId, Transition};

/// Derive a subject's state from at most two indexed lookups.
///
/// An incomplete transition means the subject still sits in that
/// transition's from-state. Otherwise the last completed transition's
/// to-state applies, and a subject with no history is in the initial state.
pub fn derive_current_state<T: StateTransitionType>(
    incomplete: Option<&Transition<T>>,
    most_recent: Option<&Transition<T>>,
) -> T::State {
    match (incomplete, most_recent) {
        (Some(pending), _) => pending.from_state.unwrap_or_else(T::State::initial),
        (None, Some(last)) => last.resulting_state(),
        (None, None) => T::State::initial(),
    }
}

/// Answers "where is this subject" questions for one workflow kind
pub struct SubjectQueryService<T: StateTransitionType, R: TransitionRepository<T>> {
    repository: Arc<R>,
    _kind: PhantomData<T>,
}

impl<T: StateTransitionType, R: TransitionRepository<T>> Clone for SubjectQueryService<T, R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            _kind: PhantomData,
        }
    }
}

impl<T: StateTransitionType, R: TransitionRepository<T>> SubjectQueryService<T, R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            _kind: PhantomData,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// The subject's single incomplete transition, if the workflow has one
    pub async fn current_transition_of(&self, subject: &T::Subject) -> Result<Option<Transition<T>>> {
        self.find_incomplete(subject).await
    }

    pub async fn current_state_of(&self, subject: &T::Subject) -> Result<T::State> {
        let id = subject.subject_id();
        let incomplete = self.repository.find_by_incomplete(&id).await?;
        if let Some(pending) = &incomplete {
            return Ok(derive_current_state(Some(pending), None));
        }
        let most_recent = self.repository.find_most_recent(&id).await?;
        Ok(derive_current_state(None, most_recent.as_ref()))
    }

    /// Current state when nothing is pending, `None` while a transition is open
    pub async fn state_if_idle(&self, subject: &T::Subject) -> Result<Option<T::State>> {
        let id = subject.subject_id();
        if self.repository.find_by_incomplete(&id).await?.is_some() {
            return Ok(None);
        }
        let most_recent = self.repository.find_most_recent(&id).await?;
        Ok(Some(derive_current_state(None, most_recent.as_ref())))
    }

    /// The fixed catalog, for callers enumerating which actions to offer
    pub fn all_transition_types(&self) -> &'static [T] {
        T::all()
    }

    pub async fn find_incomplete(&self, subject: &T::Subject) -> Result<Option<Transition<T>>> {
        self.repository.find_by_incomplete(&subject.subject_id()).await
    }

    pub async fn find_for(&self, task: &TaskId) -> Result<Option<Transition<T>>> {
        self.repository.find_by_task(task).await
    }

    pub async fn history_of(&self, subject: &T::Subject) -> Result<Vec<Transition<T>>> {
        self.repository.find_by_subject(&subject.subject_id()).await
    }

    pub async fn open_tasks_for(&self, role: Option<Role>) -> Result<Vec<Task>> {
        self.repository.open_tasks(role).await
    }
}
