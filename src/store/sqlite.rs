//! SQLite transition repository
//!
//! The single-pending rule is enforced twice: `create` checks inside the
//! same `BEGIN IMMEDIATE` transaction that inserts, and a partial unique
//! index on `state_transitions(subject_id) WHERE completed = 0` rejects any
//! write that slips past the check. Both report `TransitionAlreadyPending`.

use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::assignment::TaskAssigner;
use crate::config::DatabaseConfig;
use crate::errors::{Result, WorkflowError};
use crate::state::{
    derive_current_state, NewTransition, Role, StateTransitionType, SubjectId, Task, TaskId,
    Transition, TransitionId, TransitionRepository, WorkflowState,
};

const TRANSITION_COLUMNS: &str = "id, sequence, subject_id, transition_type, from_state, to_state, \
     assigned_role, task_id, description, completed, created_at, completed_at";

const TASK_COLUMNS: &str =
    "id, transition_id, subject_id, assigned_to, person_assigned_to, description, created_at, completed_at";

pub struct SqliteTransitionRepository<T: StateTransitionType> {
    pool: SqlitePool,
    assigner: TaskAssigner,
    _kind: PhantomData<fn() -> T>,
}

impl<T: StateTransitionType> SqliteTransitionRepository<T> {
    /// Open (creating if needed) the database described by `config`
    pub async fn connect(config: &DatabaseConfig, assigner: TaskAssigner) -> Result<Self> {
        if !Sqlite::database_exists(&config.url).await? {
            info!("Creating database at {}", config.url);
            Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        if config.auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(WorkflowError::storage)?;
            info!("Database migrations completed");
        }

        Ok(Self::with_pool(pool, assigner))
    }

    pub fn with_pool(pool: SqlitePool, assigner: TaskAssigner) -> Self {
        Self {
            pool,
            assigner,
            _kind: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }

    async fn create_in(&self, conn: &mut SqliteConnection, request: NewTransition<T>) -> Result<Transition<T>> {
        let subject = request.subject.clone();

        if let Some(pending) = fetch_pending_id(conn, &subject).await? {
            return Err(WorkflowError::TransitionAlreadyPending {
                subject: subject.to_string(),
                pending,
            });
        }

        if let Some(expected) = request.from_state {
            let most_recent = fetch_most_recent::<T>(conn, &subject).await?;
            let actual = derive_current_state(None, most_recent.as_ref());
            if actual != expected {
                return Err(WorkflowError::StaleState {
                    subject: subject.to_string(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }

        let mut transition = Transition::from_request(request, 0, None);
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

        let insert = sqlx::query(
            r#"
            INSERT INTO state_transitions
                (id, subject_id, transition_type, from_state, to_state, assigned_role,
                 task_id, description, completed, created_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, NULL)
            "#,
        )
        .bind(transition.id.to_string())
        .bind(transition.subject.as_str())
        .bind(transition.transition_type.name())
        .bind(transition.from_state.map(|state| state.name()))
        .bind(transition.to_state.name())
        .bind(transition.assigned_role.map(|role| role.as_str()))
        .bind(transition.task.map(|task| task.to_string()))
        .bind(&transition.description)
        .bind(transition.created_at.to_rfc3339())
        .execute(&mut *conn)
        .await;
        let inserted = match insert {
            Ok(done) => done,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(match fetch_pending_id(conn, &subject).await? {
                    Some(pending) => WorkflowError::TransitionAlreadyPending {
                        subject: subject.to_string(),
                        pending,
                    },
                    None => WorkflowError::Storage(db.to_string()),
                });
            }
            Err(err) => return Err(err.into()),
        };
        transition.sequence = inserted.last_insert_rowid() as u64;

        if let Some(task) = &task {
            sqlx::query(
                r#"
                INSERT INTO tasks
                    (id, transition_id, subject_id, assigned_to, person_assigned_to,
                     description, created_at, completed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
                "#,
            )
            .bind(task.id.to_string())
            .bind(task.transition.to_string())
            .bind(task.subject.as_str())
            .bind(task.assigned_to.as_str())
            .bind(task.person_assigned_to.as_deref())
            .bind(&task.description)
            .bind(task.created_at.to_rfc3339())
            .execute(&mut *conn)
            .await?;
        }

        Ok(transition)
    }

    async fn complete_in(&self, conn: &mut SqliteConnection, id: &TransitionId) -> Result<Transition<T>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM state_transitions WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(WorkflowError::TransitionNotFound(*id))?;
        let mut transition = transition_from_row::<T>(&row)?;
        if transition.completed {
            return Err(WorkflowError::AlreadyCompleted(*id));
        }

        let now = Utc::now();
        sqlx::query("UPDATE state_transitions SET completed = 1, completed_at = ?1 WHERE id = ?2")
            .bind(now.to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;
        sqlx::query("UPDATE tasks SET completed_at = ?1 WHERE transition_id = ?2")
            .bind(now.to_rfc3339())
            .bind(id.to_string())
            .execute(&mut *conn)
            .await?;

        transition.completed = true;
        transition.completed_at = Some(now);
        Ok(transition)
    }
}

#[async_trait]
impl<T: StateTransitionType> TransitionRepository<T> for SqliteTransitionRepository<T> {
    async fn create(&self, request: NewTransition<T>) -> Result<Transition<T>> {
        // Take the write lock before reading so concurrent creates queue up
        // instead of racing past the pending check. Dropping the transaction
        // on error rolls back.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let transition = self.create_in(&mut tx, request).await?;
        tx.commit().await?;
        debug!(
            subject = %transition.subject,
            transition_id = %transition.id,
            sequence = transition.sequence,
            "Transition stored"
        );
        Ok(transition)
    }

    async fn find_by_incomplete(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM state_transitions WHERE subject_id = ?1 AND completed = 0"
        ))
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(transition_from_row::<T>).transpose()
    }

    async fn find_most_recent(&self, subject: &SubjectId) -> Result<Option<Transition<T>>> {
        let mut conn = self.pool.acquire().await?;
        fetch_most_recent::<T>(&mut conn, subject).await
    }

    async fn find_by_task(&self, task: &TaskId) -> Result<Option<Transition<T>>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM state_transitions WHERE task_id = ?1"
        ))
        .bind(task.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(transition_from_row::<T>).transpose()
    }

    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Vec<Transition<T>>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSITION_COLUMNS} FROM state_transitions WHERE subject_id = ?1 ORDER BY sequence ASC"
        ))
        .bind(subject.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(transition_from_row::<T>).collect()
    }

    async fn find_task(&self, task: &TaskId) -> Result<Option<Task>> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
            .bind(task.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    async fn open_tasks(&self, role: Option<Role>) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE completed_at IS NULL AND (?1 IS NULL OR assigned_to = ?1)
            ORDER BY created_at ASC
            "#
        ))
        .bind(role.map(|role| role.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn complete(&self, id: &TransitionId) -> Result<Transition<T>> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let transition = self.complete_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(transition)
    }

    async fn delete_all(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let tasks = sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;
        let transitions = sqlx::query("DELETE FROM state_transitions")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        let removed = tasks.rows_affected() + transitions.rows_affected();
        info!(removed, "Deleted all transitions and tasks");
        Ok(removed)
    }
}

async fn fetch_pending_id(conn: &mut SqliteConnection, subject: &SubjectId) -> Result<Option<TransitionId>> {
    let row = sqlx::query(
        "SELECT id FROM state_transitions WHERE subject_id = ?1 AND completed = 0 LIMIT 1",
    )
    .bind(subject.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    row.map(|row| parse_uuid(&row, "id").map(TransitionId)).transpose()
}

async fn fetch_most_recent<T: StateTransitionType>(
    conn: &mut SqliteConnection,
    subject: &SubjectId,
) -> Result<Option<Transition<T>>> {
    let row = sqlx::query(&format!(
        "SELECT {TRANSITION_COLUMNS} FROM state_transitions WHERE subject_id = ?1 ORDER BY sequence DESC LIMIT 1"
    ))
    .bind(subject.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(transition_from_row::<T>).transpose()
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(WorkflowError::storage)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(WorkflowError::storage)
}

fn unknown(kind: &'static str, name: &str) -> WorkflowError {
    WorkflowError::UnknownName {
        kind,
        name: name.to_string(),
    }
}

fn transition_from_row<T: StateTransitionType>(row: &SqliteRow) -> Result<Transition<T>> {
    let transition_type: String = row.try_get("transition_type")?;
    let from_state: Option<String> = row.try_get("from_state")?;
    let to_state: String = row.try_get("to_state")?;
    let assigned_role: Option<String> = row.try_get("assigned_role")?;
    let task_id: Option<String> = row.try_get("task_id")?;
    let sequence: i64 = row.try_get("sequence")?;
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(Transition {
        id: TransitionId(parse_uuid(row, "id")?),
        sequence: sequence as u64,
        subject: SubjectId::new(row.try_get::<String, _>("subject_id")?),
        transition_type: T::from_name(&transition_type)
            .ok_or_else(|| unknown("transition type", &transition_type))?,
        from_state: from_state
            .map(|name| T::State::from_name(&name).ok_or_else(|| unknown("state", &name)))
            .transpose()?,
        to_state: T::State::from_name(&to_state).ok_or_else(|| unknown("state", &to_state))?,
        assigned_role: assigned_role.map(|name| Role::from_str(&name)).transpose()?,
        task: task_id
            .map(|raw| Uuid::parse_str(&raw).map(TaskId).map_err(WorkflowError::storage))
            .transpose()?,
        description: row.try_get("description")?,
        completed: row.try_get("completed")?,
        created_at: parse_time(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_time).transpose()?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let assigned_to: String = row.try_get("assigned_to")?;
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(Task {
        id: TaskId(parse_uuid(row, "id")?),
        transition: TransitionId(parse_uuid(row, "transition_id")?),
        subject: SubjectId::new(row.try_get::<String, _>("subject_id")?),
        assigned_to: Role::from_str(&assigned_to)?,
        person_assigned_to: row.try_get("person_assigned_to")?,
        description: row.try_get("description")?,
        created_at: parse_time(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_time).transpose()?,
    })
}
