// Core records shared by every workflow kind

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::WorkflowError;
use crate::state::traits::{StateTransitionType, WorkflowState};

/// Identifier of a persisted transition record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub Uuid);

impl TransitionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a follow-up task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TaskId).map_err(|_| WorkflowError::UnknownName {
            kind: "task id",
            name: s.to_string(),
        })
    }
}

/// Reference to the business object moving through a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Roles that follow-up work can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    ProjectManager,
    AssetManager,
    CountryDirector,
    Treasurer,
    OfficeAdministrator,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::ProjectManager,
        Role::AssetManager,
        Role::CountryDirector,
        Role::Treasurer,
        Role::OfficeAdministrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProjectManager => "PROJECT_MANAGER",
            Role::AssetManager => "ASSET_MANAGER",
            Role::CountryDirector => "COUNTRY_DIRECTOR",
            Role::Treasurer => "TREASURER",
            Role::OfficeAdministrator => "OFFICE_ADMINISTRATOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| WorkflowError::UnknownName {
                kind: "role",
                name: s.to_string(),
            })
    }
}

/// Request handed to a repository to persist a new transition
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransition<T: StateTransitionType> {
    pub subject: SubjectId,
    pub transition_type: T,
    pub from_state: Option<T::State>,
    pub to_state: T::State,
    pub assigned_role: Option<Role>,
    pub description: String,
}

/// One applied or pending state change of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Transition<T: StateTransitionType> {
    pub id: TransitionId,
    /// Creation order within the repository
    pub sequence: u64,
    pub subject: SubjectId,
    pub transition_type: T,
    pub from_state: Option<T::State>,
    pub to_state: T::State,
    pub assigned_role: Option<Role>,
    pub task: Option<TaskId>,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl<T: StateTransitionType> Transition<T> {
    pub fn is_pending(&self) -> bool {
        !self.completed
    }

    /// Build the record for a request; the repository supplies id and order
    pub fn from_request(request: NewTransition<T>, sequence: u64, task: Option<TaskId>) -> Self {
        Self {
            id: TransitionId::new(),
            sequence,
            subject: request.subject,
            transition_type: request.transition_type,
            from_state: request.from_state,
            to_state: request.to_state,
            assigned_role: request.assigned_role,
            task,
            description: request.description,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// State the subject is in once this record has been applied
    pub fn resulting_state(&self) -> T::State {
        if self.completed {
            self.to_state
        } else {
            self.from_state.unwrap_or_else(T::State::initial)
        }
    }
}

/// Assigned follow-up work linked one-to-one with a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub transition: TransitionId,
    pub subject: SubjectId,
    pub assigned_to: Role,
    /// Person holding the role when the task was created, if known
    pub person_assigned_to: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }
}
