//! Task assignment: who picks up the follow-up work a transition creates
//!
//! Tasks are always created for a role. When a person holding that role is
//! known, the task also records that person. With `require_assignee` set, a
//! role nobody holds is an assignment failure, and the repository must not
//! keep the transition that asked for the task.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use crate::errors::{Result, WorkflowError};
use crate::state::{Role, SubjectId, Task, TaskId, TransitionId};

/// Resolves the person a role's task should go to
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait AssigneeResolver: Send + Sync {
    fn person_for(&self, role: Role) -> Option<String>;
}

/// A person and the roles they hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRoles {
    pub reference: String,
    pub roles: Vec<Role>,
}

impl PersonRoles {
    pub fn new(reference: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            reference: reference.into(),
            roles,
        }
    }
}

/// People and roles known to the application
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory {
    people: Vec<PersonRoles>,
}

impl RoleDirectory {
    pub fn new(people: Vec<PersonRoles>) -> Self {
        Self { people }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add(&mut self, person: PersonRoles) {
        self.people.push(person);
    }

    pub fn holders_of(&self, role: Role) -> Vec<&PersonRoles> {
        self.people
            .iter()
            .filter(|person| person.roles.contains(&role))
            .collect()
    }
}

impl AssigneeResolver for RoleDirectory {
    /// First registered holder of the role
    fn person_for(&self, role: Role) -> Option<String> {
        self.holders_of(role)
            .first()
            .map(|person| person.reference.clone())
    }
}

/// Builds the task linked to a newly created transition
#[derive(Clone)]
pub struct TaskAssigner {
    resolver: Arc<dyn AssigneeResolver>,
    require_assignee: bool,
}

impl std::fmt::Debug for TaskAssigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAssigner")
            .field("require_assignee", &self.require_assignee)
            .finish()
    }
}

impl Default for TaskAssigner {
    fn default() -> Self {
        Self::new(Arc::new(RoleDirectory::empty()), false)
    }
}

impl TaskAssigner {
    pub fn new(resolver: Arc<dyn AssigneeResolver>, require_assignee: bool) -> Self {
        Self {
            resolver,
            require_assignee,
        }
    }

    pub fn create_task(
        &self,
        role: Role,
        transition: TransitionId,
        subject: &SubjectId,
        description: &str,
    ) -> Result<Task> {
        let person = self.resolver.person_for(role);
        if person.is_none() && self.require_assignee {
            warn!(role = %role, subject = %subject, "No one holds the role for the new task");
            return Err(WorkflowError::TaskAssignment {
                role: role.to_string(),
                reason: "no person holds this role".to_string(),
            });
        }

        debug!(role = %role, person = ?person, subject = %subject, "Task assigned");
        Ok(Task {
            id: TaskId::new(),
            transition,
            subject: subject.clone(),
            assigned_to: role,
            person_assigned_to: person,
            description: description.to_string(),
            created_at: Utc::now(),
            completed_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn directory() -> RoleDirectory {
        RoleDirectory::new(vec![
            PersonRoles::new("dylan", vec![Role::OfficeAdministrator]),
            PersonRoles::new("tara", vec![Role::Treasurer, Role::CountryDirector]),
            PersonRoles::new("terry", vec![Role::Treasurer]),
        ])
    }

    #[test]
    fn test_first_holder_wins() {
        let directory = directory();
        assert_eq!(directory.person_for(Role::Treasurer), Some("tara".to_string()));
        assert_eq!(directory.holders_of(Role::Treasurer).len(), 2);
        assert_eq!(directory.person_for(Role::ProjectManager), None);
    }

    #[test]
    fn test_lenient_assigner_creates_role_only_task() {
        let assigner = TaskAssigner::new(Arc::new(directory()), false);
        let task = assigner
            .create_task(
                Role::ProjectManager,
                TransitionId::new(),
                &SubjectId::new("INV-1"),
                "Approve As Project Manager",
            )
            .unwrap();
        assert_eq!(task.assigned_to, Role::ProjectManager);
        assert_eq!(task.person_assigned_to, None);
        assert!(task.is_open());
    }

    #[test]
    fn test_strict_assigner_rejects_unheld_role() {
        let mut resolver = MockAssigneeResolver::new();
        resolver
            .expect_person_for()
            .with(eq(Role::AssetManager))
            .times(1)
            .returning(|_| None);

        let assigner = TaskAssigner::new(Arc::new(resolver), true);
        let err = assigner
            .create_task(
                Role::AssetManager,
                TransitionId::new(),
                &SubjectId::new("INV-2"),
                "Approve As Asset Manager",
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TaskAssignment { .. }));
    }

    #[test]
    fn test_strict_assigner_records_person() {
        let mut resolver = MockAssigneeResolver::new();
        resolver
            .expect_person_for()
            .returning(|_| Some("tara".to_string()));

        let assigner = TaskAssigner::new(Arc::new(resolver), true);
        let transition = TransitionId::new();
        let task = assigner
            .create_task(Role::Treasurer, transition, &SubjectId::new("INV-3"), "Pay")
            .unwrap();
        assert_eq!(task.person_assigned_to.as_deref(), Some("tara"));
        assert_eq!(task.transition, transition);
    }
}
