use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use taskmint_core::domain::task::{Priority, Task, TaskDraft, TaskId, TaskStatus};
use taskmint_core::domain::user::{ContactAlias, User, UserId};

pub mod task;
pub mod user;

pub use task::SqlTaskRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// True when the underlying failure was a UNIQUE constraint violation
    /// (duplicate email on registration, most commonly).
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::Database(db_error)) if db_error.is_unique_violation()
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TaskSortKey {
    #[default]
    DueDate,
    Priority,
    CreatedAt,
}

impl TaskSortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dueDate" | "due_date" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TaskListFilter {
    pub priority: Option<Priority>,
    pub sort: TaskSortKey,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for TaskListFilter {
    fn default() -> Self {
        Self {
            priority: None,
            sort: TaskSortKey::default(),
            order: SortOrder::default(),
            page: 1,
            limit: 20,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Partial update; `None` fields are left untouched. Clearing the optional
/// description requires an explicit `Some(None)`.
#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub task_name: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub description: Option<Option<String>>,
    pub confidence: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub p1: u64,
    pub p2: u64,
    pub p3: u64,
    pub p4: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub todo: u64,
    pub in_progress: u64,
    pub completed: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: u64,
    pub by_priority: PriorityCounts,
    pub by_status: StatusCounts,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Bulk create; all drafts are inserted in one transaction and come back
    /// with identity, ownership, and a creation timestamp assigned.
    async fn insert_many(
        &self,
        owner: &UserId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<Task>, RepositoryError>;

    async fn list(
        &self,
        owner: &UserId,
        filter: &TaskListFilter,
    ) -> Result<TaskPage, RepositoryError>;

    async fn find(&self, owner: &UserId, id: &TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Returns the updated task, or `None` when the id does not exist for
    /// this owner. A foreign owner's task behaves exactly like not-found.
    async fn update(
        &self,
        owner: &UserId,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, owner: &UserId, id: &TaskId) -> Result<bool, RepositoryError>;

    async fn stats(&self, owner: &UserId) -> Result<TaskStats, RepositoryError>;
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub contacts: Vec<ContactAlias>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
}
