// Test doubles for the engine - no I/O

use std::sync::Mutex;

use async_trait::async_trait;

use crate::assignment::TaskAssigner;
use crate::errors::{Result, WorkflowError};
use crate::invoice::{IncomingInvoice, InvoiceLookups};
use crate::state::traits::*;
use crate::state::types::*;
use crate::store::InMemoryTransitionRepository;

/// Repository that records every create request and can be told to fail
/// or to lose a race against a competing writer.
pub struct MockTransitionRepository<T: StateTransitionType> {
    inner: InMemoryTransitionRepository<T>,
    pub create_requests: Mutex<Vec<NewTransition<T>>>,
    fail_next_create: Mutex<Option<WorkflowError>>,
    competitor: Mutex<Option<NewTransition<T>>>,
    incomplete_lookups: Mutex<usize>,
}

impl<T: StateTransitionType> Default for MockTransitionRepository<T> {
    fn default() -> Self {
        Self::new(TaskAssigner::default())
    }
}

impl<T: StateTransitionType> MockTransitionRepository<T> {
    pub fn new(assigner: TaskAssigner) -> Self {
        Self {
            inner: InMemoryTransitionRepository::new(assigner),
            create_requests: Mutex::new(Vec::new()),
            fail_next_create: Mutex::new(None),
            competitor: Mutex::new(None),
            incomplete_lookups: Mutex::new(0),
        }
    }

    /// The next `create` returns `error` without storing anything
    pub fn fail_next_create(&self, error: WorkflowError) {
        *self.fail_next_create.lock().unwrap() = Some(error);
    }

    /// Just before the next `create`, store `request` as if another caller
    /// had got there first
    pub fn race_next_create_with(&self, request: NewTransition<T>) {
        *self.competitor.lock().unwrap() = Some(request);
    }

    pub fn create_count(&self) -> usize {
        self.create_requests.lock().unwrap().len()
    }

    pub fn incomplete_lookup_count(&self) -> usize {
        *self.incomplete_lookups.lock().unwrap()
    }

    pub async fn stored(&self, subject: &SubjectId) -> Vec<Transition<T>> {
        self.inner.find_by_subject(subject).await.unwrap()
    }
}

#[async_trait]
impl<T: StateTransitionType> TransitionRepository<T> for MockTransitionRepository<T> {
    async fn create(&self, request: NewTransition<T>) -> Result<Transition<T>> {
        self.create_requests.lock().unwrap().push(request.clone());

        let failure = self.fail_next_create.lock().unwrap().take();
        if let Some(error) = failure {
            return Err(error);
        }

        let competitor = self.competitor.lock().unwrap().take();
        if let Some(competing) = competitor {
            self.inner.create(competing).await?;
        }

        self.inner.create(request).await
    }

    async fn find_by_incomplete(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        *self.incomplete_lookups.lock().unwrap() += 1;
        self.inner.find_by_incomplete(subject).await
    }

    async fn find_most_recent(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        self.inner.find_most_recent(subject).await
    }

    async fn find_by_task(&self, task: &TaskId) -> Result<Option<Transition<T>>> {
        self.inner.find_by_task(task).await
    }

    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Vec<Transition<T>>> {
        self.inner.find_by_subject(subject).await
    }

    async fn find_task(&self, task: &TaskId) -> Result<Option<Task>> {
        self.inner.find_task(task).await
    }

    async fn open_tasks(&self, role: Option<Role>) -> Result<Vec<Task>> {
        self.inner.open_tasks(role).await
    }

    async fn complete(&self, transition: &TransitionId) -> Result<Transition<T>> {
        self.inner.complete(transition).await
    }

    async fn delete_all(&self) -> Result<u64> {
        self.create_requests.lock().unwrap().clear();
        self.inner.delete_all().await
    }
}

/// Invoice lookups with fixed answers, ignoring the invoice's own links
#[derive(Debug, Clone, Copy, Default)]
pub struct MockLookups {
    pub has_project: bool,
    pub has_fixed_asset: bool,
}

impl MockLookups {
    pub fn project() -> Self {
        Self {
            has_project: true,
            has_fixed_asset: false,
        }
    }

    pub fn fixed_asset() -> Self {
        Self {
            has_project: false,
            has_fixed_asset: true,
        }
    }
}

impl InvoiceLookups for MockLookups {
    fn has_project(&self, _invoice: &IncomingInvoice) -> bool {
        self.has_project
    }

    fn has_fixed_asset(&self, _invoice: &IncomingInvoice) -> bool {
        self.has_fixed_asset
    }
}
