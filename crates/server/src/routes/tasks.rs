use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use taskmint_core::domain::candidate::TaskCandidate;
use taskmint_core::domain::task::{
    Priority, TaskDraft, TaskId, TaskStatus, MAX_DESCRIPTION_CHARS, MAX_TASK_NAME_CHARS,
};
use taskmint_core::domain::user::User;
use taskmint_core::errors::DomainError;
use taskmint_db::repositories::{SortOrder, TaskListFilter, TaskPatch, TaskSortKey};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::ApiState;

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub priority: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub task_name: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub description: Option<String>,
    pub confidence: Option<f64>,
}

fn task_not_found() -> ApiError {
    ApiError::not_found("Task not found")
}

/// The prompt needs the caller's display name and contact list, neither of
/// which travels in the token, so extraction re-reads the account row.
async fn account_for(state: &ApiState, user: &AuthUser) -> Result<User, ApiError> {
    state
        .users
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid token. Please login again."))
}

fn draft_from_candidate(candidate: TaskCandidate) -> TaskDraft {
    TaskDraft {
        task_name: candidate.task_name,
        assignee: candidate.assignee,
        due_date: candidate.due_date,
        priority: candidate.priority,
        status: TaskStatus::default(),
        description: None,
        confidence: candidate.confidence,
    }
}

pub async fn extract(
    State(state): State<ApiState>,
    user: AuthUser,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<Value>, ApiError> {
    let account = account_for(&state, &user).await?;
    let candidates =
        state.extractor.extract(&request.text, &account.name, &account.contacts).await?;

    Ok(Json(json!({
        "success": true,
        "count": candidates.len(),
        "tasks": candidates,
    })))
}

pub async fn parse(
    State(state): State<ApiState>,
    user: AuthUser,
    Json(request): Json<ExtractRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let account = account_for(&state, &user).await?;
    let candidates =
        state.extractor.extract(&request.text, &account.name, &account.contacts).await?;

    let drafts: Vec<TaskDraft> = candidates.into_iter().map(draft_from_candidate).collect();
    let created = state.tasks.insert_many(&user.id, drafts).await?;
    tracing::info!(
        event_name = "api.tasks.parsed",
        user_id = %user.id.0,
        created = created.len(),
        "tasks extracted and persisted"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "count": created.len(),
            "message": format!("{} task(s) created", created.len()),
            "tasks": created,
        })),
    ))
}

pub async fn create(
    State(state): State<ApiState>,
    user: AuthUser,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    draft.validate()?;

    let mut created = state.tasks.insert_many(&user.id, vec![draft]).await?;
    let task = created
        .pop()
        .ok_or_else(|| ApiError::internal("Task creation did not return a record."))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Task created successfully",
            "task": task,
        })),
    ))
}

pub async fn list(
    State(state): State<ApiState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = list_filter(&query)?;
    let page = state.tasks.list(&user.id, &filter).await?;

    Ok(Json(json!({
        "success": true,
        "count": page.tasks.len(),
        "total": page.total,
        "page": page.page,
        "limit": page.limit,
        "tasks": page.tasks,
    })))
}

fn list_filter(query: &ListQuery) -> Result<TaskListFilter, ApiError> {
    let mut filter = TaskListFilter::default();

    if let Some(priority) = &query.priority {
        filter.priority = Some(priority.parse().map_err(|_| {
            ApiError::bad_request(format!(
                "Invalid priority `{priority}`. Expected one of P1, P2, P3, P4."
            ))
        })?);
    }
    if let Some(sort_by) = &query.sort_by {
        filter.sort = TaskSortKey::parse(sort_by).ok_or_else(|| {
            ApiError::bad_request(format!(
                "Invalid sortBy `{sort_by}`. Expected dueDate, priority, or createdAt."
            ))
        })?;
    }
    if let Some(order) = &query.order {
        filter.order = SortOrder::parse(order).ok_or_else(|| {
            ApiError::bad_request(format!("Invalid order `{order}`. Expected asc or desc."))
        })?;
    }
    if let Some(page) = query.page {
        filter.page = page.max(1);
    }
    if let Some(limit) = query.limit {
        filter.limit = limit.clamp(1, MAX_PAGE_SIZE);
    }

    Ok(filter)
}

pub async fn stats(
    State(state): State<ApiState>,
    user: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let stats = state.tasks.stats(&user.id).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

pub async fn find(
    State(state): State<ApiState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = state.tasks.find(&user.id, &TaskId(id)).await?.ok_or_else(task_not_found)?;
    Ok(Json(json!({ "success": true, "task": task })))
}

pub async fn update(
    State(state): State<ApiState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let patch = patch_from_request(request)?;
    let task =
        state.tasks.update(&user.id, &TaskId(id), patch).await?.ok_or_else(task_not_found)?;

    Ok(Json(json!({
        "success": true,
        "message": "Task updated successfully",
        "task": task,
    })))
}

fn patch_from_request(request: UpdateTaskRequest) -> Result<TaskPatch, ApiError> {
    if let Some(task_name) = &request.task_name {
        let chars = task_name.trim().chars().count();
        if chars == 0 || chars > MAX_TASK_NAME_CHARS {
            return Err(DomainError::InvalidTaskNameLength(chars).into());
        }
    }
    if let Some(assignee) = &request.assignee {
        if assignee.trim().is_empty() {
            return Err(ApiError::bad_request("Assignee must not be empty."));
        }
    }
    if let Some(confidence) = request.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DomainError::ConfidenceOutOfRange(confidence).into());
        }
    }
    if let Some(description) = &request.description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ApiError::bad_request(format!(
                "Description cannot exceed {MAX_DESCRIPTION_CHARS} characters."
            )));
        }
    }

    Ok(TaskPatch {
        task_name: request.task_name,
        assignee: request.assignee,
        due_date: request.due_date,
        priority: request.priority,
        status: request.status,
        // An omitted description leaves the stored value alone; clearing it
        // is not exposed over the API.
        description: request.description.map(Some),
        confidence: request.confidence,
    })
}

pub async fn remove(
    State(state): State<ApiState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.tasks.delete(&user.id, &TaskId(id)).await? {
        return Err(task_not_found());
    }
    Ok(Json(json!({ "success": true, "message": "Task deleted successfully" })))
}
