// Write side: applying and completing transitions

use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use crate::errors::{Result, WorkflowError};
use crate::observability::transition_metrics;
use crate::state::query::{derive_current_state, SubjectQueryService};
use crate::state::traits::{StateTransitionType, TransitionRepository, WorkflowSubject};
use crate::state::types::{TaskId, Transition};
use crate::telemetry::create_transition_span;

/// Persist a transition of `transition_type` for `subject` from `from_state`.
///
/// Fails fast when `from_state` is not a legal from-state of the variant or
/// the variant's guard rejects the subject. The repository re-checks the
/// single-pending invariant inside its own atomic unit.
pub async fn create_transition<T, R>(
    transition_type: T,
    subject: &T::Subject,
    lookups: &T::Lookups,
    from_state: Option<T::State>,
    repository: &R,
) -> Result<Transition<T>>
where
    T: StateTransitionType,
    R: TransitionRepository<T> + ?Sized,
{
    let subject_id = subject.subject_id();

    let legal = from_state
        .map(|state| transition_type.is_legal_from(state))
        .unwrap_or(false);
    if !legal {
        return Err(WorkflowError::InvalidTransition {
            subject: subject_id.to_string(),
            transition: transition_type.name().to_string(),
            state: from_state
                .map(|state| state.to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        });
    }

    if !transition_type.can_apply(subject, lookups) {
        transition_metrics().record_guard_rejection();
        return Err(WorkflowError::GuardRejected {
            subject: subject_id.to_string(),
            transition: transition_type.name().to_string(),
        });
    }

    let request = transition_type.prepare_transition(subject, lookups, from_state);
    match repository.create(request).await {
        Ok(transition) => {
            transition_metrics().record_created();
            info!(
                subject = %transition.subject,
                transition = %transition.transition_type,
                from_state = ?transition.from_state,
                to_state = %transition.to_state,
                role = ?transition.assigned_role,
                task = ?transition.task,
                "Transition created"
            );
            Ok(transition)
        }
        Err(err) => {
            match &err {
                WorkflowError::TransitionAlreadyPending { .. } => {
                    transition_metrics().record_double_pending()
                }
                WorkflowError::TaskAssignment { .. } => {
                    transition_metrics().record_task_assignment_failure()
                }
                _ => {}
            }
            warn!(
                subject = %subject_id,
                transition = %transition_type,
                error = %err,
                "Transition creation failed"
            );
            Err(err)
        }
    }
}

/// Applies and completes transitions for one workflow kind
pub struct StateTransitionService<T: StateTransitionType, R: TransitionRepository<T>> {
    query: SubjectQueryService<T, R>,
}

impl<T: StateTransitionType, R: TransitionRepository<T>> Clone for StateTransitionService<T, R> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
        }
    }
}

impl<T: StateTransitionType, R: TransitionRepository<T>> StateTransitionService<T, R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            query: SubjectQueryService::new(repository),
        }
    }

    pub fn query(&self) -> &SubjectQueryService<T, R> {
        &self.query
    }

    pub fn repository(&self) -> &Arc<R> {
        self.query.repository()
    }

    /// Whether `transition_type` may be applied now: nothing pending, the
    /// current state is a from-state of the variant, and its guard passes.
    pub async fn can_apply(
        &self,
        subject: &T::Subject,
        transition_type: T,
        lookups: &T::Lookups,
    ) -> Result<bool> {
        let Some(current) = self.query.state_if_idle(subject).await? else {
            return Ok(false);
        };
        Ok(transition_type.is_legal_from(current) && transition_type.can_apply(subject, lookups))
    }

    /// Every catalog entry that `can_apply` would accept, in catalog order
    pub async fn applicable_transitions(
        &self,
        subject: &T::Subject,
        lookups: &T::Lookups,
    ) -> Result<Vec<T>> {
        let Some(current) = self.query.state_if_idle(subject).await? else {
            return Ok(Vec::new());
        };
        Ok(T::all()
            .iter()
            .copied()
            .filter(|t| t.is_legal_from(current) && t.can_apply(subject, lookups))
            .collect())
    }

    /// Apply `transition_type` to the subject, leaving it pending
    pub async fn apply(
        &self,
        subject: &mut T::Subject,
        transition_type: T,
        lookups: &T::Lookups,
    ) -> Result<Transition<T>> {
        let subject_id = subject.subject_id();
        let span = create_transition_span(
            "apply",
            subject_id.as_str(),
            Some(transition_type.name()),
            None,
        );

        async {
            if let Some(pending) = self.query.find_incomplete(subject).await? {
                transition_metrics().record_double_pending();
                return Err(WorkflowError::TransitionAlreadyPending {
                    subject: subject_id.to_string(),
                    pending: pending.id,
                });
            }

            let most_recent = self.repository().find_most_recent(&subject_id).await?;
            let current = derive_current_state(None, most_recent.as_ref());
            let transition = create_transition(
                transition_type,
                subject,
                lookups,
                Some(current),
                &**self.repository(),
            )
            .await?;

            transition_type.apply_to(subject, lookups);
            Ok::<Transition<T>, WorkflowError>(transition)
        }
        .instrument(span)
        .await
    }

    /// Complete the subject's pending transition
    pub async fn complete_transition(&self, subject: &T::Subject) -> Result<Transition<T>> {
        let pending = self
            .query
            .find_incomplete(subject)
            .await?
            .ok_or_else(|| WorkflowError::NoPendingTransition(subject.subject_id().to_string()))?;
        self.complete(pending).await
    }

    /// Close out a task and complete the transition it was created for
    pub async fn complete_task(&self, task: &TaskId) -> Result<Transition<T>> {
        let transition = self
            .query
            .find_for(task)
            .await?
            .ok_or(WorkflowError::TaskNotFound(*task))?;
        if transition.completed {
            return Err(WorkflowError::AlreadyCompleted(transition.id));
        }
        self.complete(transition).await
    }

    async fn complete(&self, transition: Transition<T>) -> Result<Transition<T>> {
        let completed = self.repository().complete(&transition.id).await?;
        transition_metrics().record_completed();
        info!(
            subject = %completed.subject,
            transition = %completed.transition_type,
            to_state = %completed.to_state,
            "Transition completed"
        );
        debug!(transition_id = %completed.id, task = ?completed.task, "Completion recorded");
        Ok(completed)
    }
}
