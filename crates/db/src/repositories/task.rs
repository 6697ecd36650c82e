use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use taskmint_core::domain::task::{Priority, Task, TaskDraft, TaskId, TaskStatus};
use taskmint_core::domain::user::UserId;

use super::{
    PriorityCounts, RepositoryError, SortOrder, StatusCounts, TaskListFilter, TaskPage, TaskPatch,
    TaskRepository, TaskSortKey, TaskStats,
};
use crate::DbPool;

const TASK_COLUMNS: &str = "id,
                task_name,
                assignee,
                due_date,
                priority,
                status,
                description,
                created_by,
                confidence,
                created_at";

pub struct SqlTaskRepository {
    pool: DbPool,
}

impl SqlTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn insert_many(
        &self,
        owner: &UserId,
        drafts: Vec<TaskDraft>,
    ) -> Result<Vec<Task>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let task = Task {
                id: TaskId(Uuid::new_v4().to_string()),
                task_name: draft.task_name,
                assignee: draft.assignee,
                due_date: draft.due_date,
                priority: draft.priority,
                status: draft.status,
                description: draft.description,
                created_by: owner.clone(),
                confidence: draft.confidence,
                created_at: Utc::now(),
            };

            sqlx::query(
                "INSERT INTO tasks (
                    id,
                    task_name,
                    assignee,
                    due_date,
                    priority,
                    status,
                    description,
                    created_by,
                    confidence,
                    created_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&task.id.0)
            .bind(&task.task_name)
            .bind(&task.assignee)
            .bind(task.due_date.to_rfc3339())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.description.as_deref())
            .bind(&task.created_by.0)
            .bind(task.confidence)
            .bind(task.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

            created.push(task);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list(
        &self,
        owner: &UserId,
        filter: &TaskListFilter,
    ) -> Result<TaskPage, RepositoryError> {
        // Priority labels sort lexically in rank order (P1 < P2 < P3 < P4),
        // so every sort key is a plain column sort.
        let order_clause = match (filter.sort, filter.order) {
            (TaskSortKey::DueDate, SortOrder::Asc) => "due_date ASC, created_at ASC",
            (TaskSortKey::DueDate, SortOrder::Desc) => "due_date DESC, created_at ASC",
            (TaskSortKey::Priority, SortOrder::Asc) => "priority ASC, due_date ASC",
            (TaskSortKey::Priority, SortOrder::Desc) => "priority DESC, due_date ASC",
            (TaskSortKey::CreatedAt, SortOrder::Asc) => "created_at ASC",
            (TaskSortKey::CreatedAt, SortOrder::Desc) => "created_at DESC",
        };

        let page = filter.page.max(1);
        let limit = i64::from(filter.limit.max(1));
        let offset = i64::from(page - 1) * limit;

        let (total, rows) = if let Some(priority) = filter.priority {
            let total = sqlx::query(
                "SELECT COUNT(*) AS count FROM tasks WHERE created_by = ? AND priority = ?",
            )
            .bind(&owner.0)
            .bind(priority.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get::<i64, _>("count")?;

            let rows = sqlx::query(&format!(
                "SELECT {TASK_COLUMNS}
                 FROM tasks
                 WHERE created_by = ? AND priority = ?
                 ORDER BY {order_clause}
                 LIMIT ? OFFSET ?"
            ))
            .bind(&owner.0)
            .bind(priority.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

            (total, rows)
        } else {
            let total = sqlx::query("SELECT COUNT(*) AS count FROM tasks WHERE created_by = ?")
                .bind(&owner.0)
                .fetch_one(&self.pool)
                .await?
                .try_get::<i64, _>("count")?;

            let rows = sqlx::query(&format!(
                "SELECT {TASK_COLUMNS}
                 FROM tasks
                 WHERE created_by = ?
                 ORDER BY {order_clause}
                 LIMIT ? OFFSET ?"
            ))
            .bind(&owner.0)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

            (total, rows)
        };

        let tasks =
            rows.into_iter().map(task_from_row).collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(TaskPage { tasks, total: total.max(0) as u64, page, limit: filter.limit.max(1) })
    }

    async fn find(&self, owner: &UserId, id: &TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks
             WHERE id = ? AND created_by = ?"
        ))
        .bind(&id.0)
        .bind(&owner.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(task_from_row).transpose()
    }

    async fn update(
        &self,
        owner: &UserId,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Option<Task>, RepositoryError> {
        let Some(mut task) = self.find(owner, id).await? else {
            return Ok(None);
        };

        if let Some(task_name) = patch.task_name {
            task.task_name = task_name;
        }
        if let Some(assignee) = patch.assignee {
            task.assignee = assignee;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(description) = patch.description {
            task.description = description;
        }
        if let Some(confidence) = patch.confidence {
            task.confidence = confidence;
        }

        sqlx::query(
            "UPDATE tasks SET
                task_name = ?,
                assignee = ?,
                due_date = ?,
                priority = ?,
                status = ?,
                description = ?,
                confidence = ?
             WHERE id = ? AND created_by = ?",
        )
        .bind(&task.task_name)
        .bind(&task.assignee)
        .bind(task.due_date.to_rfc3339())
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.description.as_deref())
        .bind(task.confidence)
        .bind(&task.id.0)
        .bind(&owner.0)
        .execute(&self.pool)
        .await?;

        Ok(Some(task))
    }

    async fn delete(&self, owner: &UserId, id: &TaskId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND created_by = ?")
            .bind(&id.0)
            .bind(&owner.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, owner: &UserId) -> Result<TaskStats, RepositoryError> {
        let priority_rows = sqlx::query(
            "SELECT priority, COUNT(*) AS count
             FROM tasks
             WHERE created_by = ?
             GROUP BY priority",
        )
        .bind(&owner.0)
        .fetch_all(&self.pool)
        .await?;

        let mut by_priority = PriorityCounts::default();
        let mut total = 0u64;
        for row in priority_rows {
            let label = row.try_get::<String, _>("priority")?;
            let count = row.try_get::<i64, _>("count")?.max(0) as u64;
            total += count;
            match label.parse::<Priority>() {
                Ok(Priority::P1) => by_priority.p1 = count,
                Ok(Priority::P2) => by_priority.p2 = count,
                Ok(Priority::P3) => by_priority.p3 = count,
                Ok(Priority::P4) => by_priority.p4 = count,
                Err(_) => {
                    return Err(RepositoryError::Decode(format!("unknown priority `{label}`")))
                }
            }
        }

        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) AS count
             FROM tasks
             WHERE created_by = ?
             GROUP BY status",
        )
        .bind(&owner.0)
        .fetch_all(&self.pool)
        .await?;

        let mut by_status = StatusCounts::default();
        for row in status_rows {
            let label = row.try_get::<String, _>("status")?;
            let count = row.try_get::<i64, _>("count")?.max(0) as u64;
            match label.parse::<TaskStatus>() {
                Ok(TaskStatus::Todo) => by_status.todo = count,
                Ok(TaskStatus::InProgress) => by_status.in_progress = count,
                Ok(TaskStatus::Completed) => by_status.completed = count,
                Err(_) => {
                    return Err(RepositoryError::Decode(format!("unknown status `{label}`")))
                }
            }
        }

        Ok(TaskStats { total, by_priority, by_status })
    }
}

fn task_from_row(row: SqliteRow) -> Result<Task, RepositoryError> {
    let priority_raw = row.try_get::<String, _>("priority")?;
    let priority = priority_raw
        .parse::<Priority>()
        .map_err(|_| RepositoryError::Decode(format!("unknown priority `{priority_raw}`")))?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = status_raw
        .parse::<TaskStatus>()
        .map_err(|_| RepositoryError::Decode(format!("unknown status `{status_raw}`")))?;

    Ok(Task {
        id: TaskId(row.try_get("id")?),
        task_name: row.try_get("task_name")?,
        assignee: row.try_get("assignee")?,
        due_date: parse_timestamp("due_date", row.try_get("due_date")?)?,
        priority,
        status,
        description: row.try_get("description")?,
        created_by: UserId(row.try_get("created_by")?),
        confidence: row.try_get("confidence")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use taskmint_core::domain::task::{Priority, TaskDraft, TaskId, TaskStatus};
    use taskmint_core::domain::user::UserId;

    use super::SqlTaskRepository;
    use crate::migrations;
    use crate::repositories::{
        NewUser, SortOrder, SqlUserRepository, TaskListFilter, TaskPatch, TaskRepository,
        TaskSortKey, UserRepository,
    };
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn seed_user(pool: &DbPool, email: &str) -> UserId {
        let users = SqlUserRepository::new(pool.clone());
        let user = users
            .create(NewUser {
                name: "Alex Chen".to_string(),
                email: email.to_string(),
                password_hash: "pbkdf2-sha256$1$00$00".to_string(),
                contacts: Vec::new(),
            })
            .await
            .expect("create user");
        user.id
    }

    fn draft(name: &str, priority: Priority) -> TaskDraft {
        TaskDraft {
            task_name: name.to_string(),
            assignee: "Alex Chen".to_string(),
            due_date: Utc::now() + Duration::days(1),
            priority,
            status: TaskStatus::Todo,
            description: None,
            confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn insert_many_assigns_identity_and_round_trips() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let created = repo
            .insert_many(&owner, vec![draft("One", Priority::P1), draft("Two", Priority::P3)])
            .await
            .expect("insert");
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);

        let fetched = repo.find(&owner, &created[0].id).await.expect("find").expect("exists");
        assert_eq!(fetched, created[0]);
    }

    #[tokio::test]
    async fn list_filters_by_priority_and_reports_total() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        repo.insert_many(
            &owner,
            vec![
                draft("Critical", Priority::P1),
                draft("Normal a", Priority::P3),
                draft("Normal b", Priority::P3),
            ],
        )
        .await
        .expect("insert");

        let filter = TaskListFilter { priority: Some(Priority::P3), ..TaskListFilter::default() };
        let page = repo.list(&owner, &filter).await.expect("list");

        assert_eq!(page.total, 2);
        assert!(page.tasks.iter().all(|task| task.priority == Priority::P3));
    }

    #[tokio::test]
    async fn list_paginates_with_stable_totals() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let drafts = (0..5).map(|n| draft(&format!("Task {n}"), Priority::P3)).collect();
        repo.insert_many(&owner, drafts).await.expect("insert");

        let filter = TaskListFilter {
            sort: TaskSortKey::CreatedAt,
            limit: 2,
            page: 3,
            ..TaskListFilter::default()
        };
        let page = repo.list(&owner, &filter).await.expect("list");

        assert_eq!(page.total, 5);
        assert_eq!(page.tasks.len(), 1, "third page of five holds the remainder");
        assert_eq!(page.page, 3);
    }

    #[tokio::test]
    async fn list_sorts_by_priority_rank() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        repo.insert_many(
            &owner,
            vec![
                draft("Low", Priority::P4),
                draft("Critical", Priority::P1),
                draft("Normal", Priority::P3),
            ],
        )
        .await
        .expect("insert");

        let filter = TaskListFilter {
            sort: TaskSortKey::Priority,
            order: SortOrder::Asc,
            ..TaskListFilter::default()
        };
        let page = repo.list(&owner, &filter).await.expect("list");

        let names = page.tasks.iter().map(|task| task.task_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Critical", "Normal", "Low"]);
    }

    #[tokio::test]
    async fn foreign_owner_sees_not_found_everywhere() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let stranger = seed_user(&pool, "sam@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let created =
            repo.insert_many(&owner, vec![draft("Private", Priority::P2)]).await.expect("insert");
        let id = &created[0].id;

        assert!(repo.find(&stranger, id).await.expect("find").is_none());
        assert!(repo
            .update(&stranger, id, TaskPatch::default())
            .await
            .expect("update")
            .is_none());
        assert!(!repo.delete(&stranger, id).await.expect("delete"));

        // The owner still sees the task untouched.
        assert!(repo.find(&owner, id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn update_applies_patch_and_clears_description() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let mut seeded = draft("Original", Priority::P3);
        seeded.description = Some("keep me".to_string());
        let created = repo.insert_many(&owner, vec![seeded]).await.expect("insert");

        let patch = TaskPatch {
            task_name: Some("Renamed".to_string()),
            status: Some(TaskStatus::Completed),
            description: Some(None),
            ..TaskPatch::default()
        };
        let updated =
            repo.update(&owner, &created[0].id, patch).await.expect("update").expect("exists");

        assert_eq!(updated.task_name, "Renamed");
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.description, None);
        assert_eq!(updated.assignee, created[0].assignee, "unpatched fields keep their values");

        let reloaded = repo.find(&owner, &created[0].id).await.expect("find").expect("exists");
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let created =
            repo.insert_many(&owner, vec![draft("Done soon", Priority::P3)]).await.expect("insert");

        assert!(repo.delete(&owner, &created[0].id).await.expect("delete"));
        assert!(repo.find(&owner, &created[0].id).await.expect("find").is_none());
        assert!(!repo.delete(&owner, &created[0].id).await.expect("second delete"));
    }

    #[tokio::test]
    async fn missing_id_is_not_found_rather_than_error() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let ghost = TaskId("no-such-task".to_string());
        assert!(repo.find(&owner, &ghost).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn stats_count_by_priority_and_status() {
        let pool = setup_pool().await;
        let owner = seed_user(&pool, "alex@example.com").await;
        let repo = SqlTaskRepository::new(pool);

        let mut completed = draft("Shipped", Priority::P1);
        completed.status = TaskStatus::Completed;
        repo.insert_many(
            &owner,
            vec![completed, draft("Pending a", Priority::P3), draft("Pending b", Priority::P3)],
        )
        .await
        .expect("insert");

        let stats = repo.stats(&owner).await.expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_priority.p1, 1);
        assert_eq!(stats.by_priority.p3, 2);
        assert_eq!(stats.by_status.completed, 1);
        assert_eq!(stats.by_status.todo, 2);
    }
}
