//! In-process transition repository
//!
//! One mutex guards transitions, tasks and the per-subject pending slots, so
//! every `create` observes and updates them as a single unit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use statig::prelude::*;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::assignment::TaskAssigner;
use crate::errors::{Result, WorkflowError};
use crate::state::{
    derive_current_state, NewTransition, Role, StateTransitionType, SubjectId, Task, TaskId,
    Transition, TransitionId, TransitionRepository,
};
use crate::store::slot::{PendingSlot, SlotEvent};

/// Serializable copy of a repository's contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RepositorySnapshot<T: StateTransitionType> {
    pub transitions: Vec<Transition<T>>,
    pub tasks: Vec<Task>,
}

impl<T: StateTransitionType> Default for RepositorySnapshot<T> {
    fn default() -> Self {
        Self {
            transitions: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

struct Records<T: StateTransitionType> {
    /// Creation order
    transitions: Vec<Transition<T>>,
    tasks: HashMap<TaskId, Task>,
    slots: HashMap<SubjectId, StateMachine<PendingSlot>>,
    last_sequence: u64,
}

impl<T: StateTransitionType> Records<T> {
    fn empty() -> Self {
        Self {
            transitions: Vec::new(),
            tasks: HashMap::new(),
            slots: HashMap::new(),
            last_sequence: 0,
        }
    }

    fn pending_id(&self, subject: &SubjectId) -> Option<TransitionId> {
        self.slots.get(subject).and_then(|slot| slot.inner().pending())
    }

    fn get(&self, id: &TransitionId) -> Option<&Transition<T>> {
        self.transitions.iter().find(|t| t.id == *id)
    }

    fn incomplete_for(&self, subject: &SubjectId) -> Option<&Transition<T>> {
        self.pending_id(subject).and_then(|id| self.get(&id))
    }

    fn most_recent_for(&self, subject: &SubjectId) -> Option<&Transition<T>> {
        self.transitions.iter().rev().find(|t| t.subject == *subject)
    }

    fn slot_mut(&mut self, subject: &SubjectId) -> &mut StateMachine<PendingSlot> {
        self.slots
            .entry(subject.clone())
            .or_insert_with(|| PendingSlot::new(subject.clone()).state_machine())
    }
}

/// Transition repository held entirely in memory
pub struct InMemoryTransitionRepository<T: StateTransitionType> {
    records: Mutex<Records<T>>,
    assigner: TaskAssigner,
}

impl<T: StateTransitionType> Default for InMemoryTransitionRepository<T> {
    fn default() -> Self {
        Self::new(TaskAssigner::default())
    }
}

impl<T: StateTransitionType> InMemoryTransitionRepository<T> {
    pub fn new(assigner: TaskAssigner) -> Self {
        Self {
            records: Mutex::new(Records::empty()),
            assigner,
        }
    }

    /// Rebuild a repository from a snapshot, replaying each subject's
    /// transitions through its pending slot.
    pub fn from_snapshot(snapshot: RepositorySnapshot<T>, assigner: TaskAssigner) -> Result<Self> {
        let mut records = Records::empty();
        let mut transitions = snapshot.transitions;
        transitions.sort_by_key(|t| t.sequence);

        for transition in &transitions {
            let slot = records.slot_mut(&transition.subject);
            if !transition.completed {
                if let Some(pending) = slot.inner().pending() {
                    return Err(WorkflowError::Storage(format!(
                        "snapshot has two incomplete transitions for {} ({} and {})",
                        transition.subject, pending, transition.id
                    )));
                }
                slot.handle(&SlotEvent::Open {
                    transition: transition.id,
                });
            }
            records.last_sequence = records.last_sequence.max(transition.sequence);
        }

        records.tasks = snapshot
            .tasks
            .into_iter()
            .map(|task| (task.id, task))
            .collect();
        records.transitions = transitions;

        debug!(
            transitions = records.transitions.len(),
            tasks = records.tasks.len(),
            "Repository restored from snapshot"
        );

        Ok(Self {
            records: Mutex::new(records),
            assigner,
        })
    }

    pub async fn snapshot(&self) -> RepositorySnapshot<T> {
        let records = self.records.lock().await;
        let mut tasks: Vec<Task> = records.tasks.values().cloned().collect();
        tasks.sort_by_key(|task| task.created_at);
        RepositorySnapshot {
            transitions: records.transitions.clone(),
            tasks,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.transitions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<T: StateTransitionType> TransitionRepository<T> for InMemoryTransitionRepository<T> {
    async fn create(&self, request: NewTransition<T>) -> Result<Transition<T>> {
        let mut records = self.records.lock().await;

        if let Some(pending) = records.pending_id(&request.subject) {
            return Err(WorkflowError::TransitionAlreadyPending {
                subject: request.subject.to_string(),
                pending,
            });
        }

        if let Some(expected) = request.from_state {
            let actual = derive_current_state(None, records.most_recent_for(&request.subject));
            if actual != expected {
                return Err(WorkflowError::StaleState {
                    subject: request.subject.to_string(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let sequence = records.last_sequence + 1;
        let mut transition = Transition::from_request(request, sequence, None);

        // Nothing is written until the task exists
        let task = match transition.assigned_role {
            Some(role) => Some(self.assigner.create_task(
                role,
                transition.id,
                &transition.subject,
                &transition.description,
            )?),
            None => None,
        };
        transition.task = task.as_ref().map(|task| task.id);

        records.last_sequence = sequence;
        records
            .slot_mut(&transition.subject)
            .handle(&SlotEvent::Open {
                transition: transition.id,
            });
        if let Some(task) = task {
            records.tasks.insert(task.id, task);
        }
        records.transitions.push(transition.clone());

        debug!(
            subject = %transition.subject,
            transition_id = %transition.id,
            sequence,
            "Transition stored"
        );
        Ok(transition)
    }

    async fn find_by_incomplete(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        let records = self.records.lock().await;
        Ok(records.incomplete_for(subject).cloned())
    }

    async fn find_most_recent(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        let records = self.records.lock().await;
        Ok(records.most_recent_for(subject).cloned())
    }

    async fn find_by_task(&self, task: &TaskId) -> Result<Option<Transition<T>>> {
        let records = self.records.lock().await;
        Ok(records
            .transitions
            .iter()
            .find(|t| t.task.as_ref() == Some(task))
            .cloned())
    }

    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Vec<Transition<T>>> {
        let records = self.records.lock().await;
        Ok(records
            .transitions
            .iter()
            .filter(|t| t.subject == *subject)
            .cloned()
            .collect())
    }

    async fn find_task(&self, task: &TaskId) -> Result<Option<Task>> {
        let records = self.records.lock().await;
        Ok(records.tasks.get(task).cloned())
    }

    async fn open_tasks(&self, role: Option<Role>) -> Result<Vec<Task>> {
        let records = self.records.lock().await;
        let mut tasks: Vec<Task> = records
            .tasks
            .values()
            .filter(|task| task.is_open())
            .filter(|task| role.map_or(true, |role| task.assigned_to == role))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.created_at);
        Ok(tasks)
    }

    async fn complete(&self, id: &TransitionId) -> Result<Transition<T>> {
        let mut records = self.records.lock().await;
        let now = Utc::now();

        let transition = records
            .transitions
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or(WorkflowError::TransitionNotFound(*id))?;
        if transition.completed {
            return Err(WorkflowError::AlreadyCompleted(*id));
        }
        transition.completed = true;
        transition.completed_at = Some(now);
        let completed = transition.clone();

        if let Some(task_id) = completed.task {
            if let Some(task) = records.tasks.get_mut(&task_id) {
                task.completed_at = Some(now);
            }
        }
        records
            .slot_mut(&completed.subject)
            .handle(&SlotEvent::Complete { transition: *id });

        Ok(completed)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut records = self.records.lock().await;
        let removed = (records.transitions.len() + records.tasks.len()) as u64;
        *records = Records::empty();
        info!(removed, "Deleted all transitions and tasks");
        Ok(removed)
    }
}
