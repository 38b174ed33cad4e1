//! In-memory stand-in for the todo-me API, used by the client's
//! integration tests.
//!
//! Every response is an envelope: `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"code", "message", "details"?}}`. Routes
//! are mounted under `/api/v1`; everything but register and login needs
//! `Authorization: Bearer <token>`.

pub mod model;
pub mod nlp;

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

use model::{Project, Status, Store, Task, UndoEntry, User, PRIORITY_RANGE};

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/today", get(today_tasks))
        .route("/tasks/upcoming", get(upcoming_tasks))
        .route("/tasks/overdue", get(overdue_tasks))
        .route("/tasks/{id}", get(get_task).patch(update_task).delete(delete_task))
        .route("/tasks/{id}/status", patch(set_status))
        .route("/batch", post(batch))
        .route("/search", get(search))
        .route("/parse", post(parse))
        .route("/undo/{token}", post(undo))
        .route("/projects", get(list_projects).post(create_project))
        .route("/tags", get(list_tags))
        .with_state(db);
    Router::new().nest("/api/v1", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A failed call, rendered as an error envelope.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl ApiFailure {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            details: Some(json!({ "field": field })),
            ..Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
        }
    }

    fn task_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "TASK_NOT_FOUND", "Task not found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut error = json!({ "code": self.code, "message": self.message });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (self.status, Json(json!({ "success": false, "error": error }))).into_response()
    }
}

type ApiResult = Result<Response, ApiFailure>;

fn ok<T: Serialize>(status: StatusCode, data: T) -> ApiResult {
    Ok((status, Json(json!({ "success": true, "data": data }))).into_response())
}

fn json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiFailure> {
    serde_json::from_slice(body)
        .map_err(|e| ApiFailure::new(StatusCode::BAD_REQUEST, "INVALID_JSON", e.to_string()))
}

/// Resolve the bearer token to a user email.
fn authorize(store: &Store, headers: &HeaderMap) -> Result<String, ApiFailure> {
    bearer(headers)
        .and_then(|token| store.sessions.get(token).cloned())
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Missing or invalid token"))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CredentialsBody {
    email: String,
    password: String,
}

async fn register(State(db): State<Db>, body: Bytes) -> ApiResult {
    let input: CredentialsBody = json_body(&body)?;
    if !input.email.contains('@') {
        return Err(ApiFailure::validation("email", "Invalid email address"));
    }
    if input.password.len() < 8 {
        return Err(ApiFailure::validation("password", "Password must be at least 8 characters"));
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.email) {
        return Err(ApiFailure::new(StatusCode::CONFLICT, "EMAIL_EXISTS", "Email already registered"));
    }
    let user = User {
        id: model::new_id(),
        password: input.password,
    };
    let user_id = user.id.clone();
    store.users.insert(input.email.clone(), user);
    let token = store.issue_token(&input.email);
    ok(
        StatusCode::CREATED,
        json!({ "token": token, "user": { "id": user_id, "email": input.email } }),
    )
}

async fn login(State(db): State<Db>, body: Bytes) -> ApiResult {
    let input: CredentialsBody = json_body(&body)?;
    let mut store = db.write().await;
    let valid = store
        .users
        .get(&input.email)
        .is_some_and(|u| u.password == input.password);
    if !valid {
        return Err(ApiFailure::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password",
        ));
    }
    let token = store.issue_token(&input.email);
    ok(StatusCode::OK, json!({ "token": token }))
}

async fn refresh(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let mut store = db.write().await;
    let email = authorize(&store, &headers)?;
    if let Some(old) = bearer(&headers) {
        store.sessions.remove(old);
    }
    let token = store.issue_token(&email);
    ok(StatusCode::OK, json!({ "token": token }))
}

// ---------------------------------------------------------------------------
// Task queries
// ---------------------------------------------------------------------------

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiFailure> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ApiFailure::validation(field, format!("{field} must be an ISO-8601 timestamp")))
}

fn parse_number(params: &HashMap<String, String>, field: &str) -> Result<Option<i64>, ApiFailure> {
    params
        .get(field)
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| ApiFailure::validation(field, format!("{field} must be an integer")))
        })
        .transpose()
}

fn task_list(tasks: Vec<Task>) -> Value {
    json!({ "tasks": tasks })
}

async fn list_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;

    let page = parse_number(&params, "page")?.unwrap_or(1).max(1);
    let limit = parse_number(&params, "limit")?.unwrap_or(20).clamp(1, 100);
    let status = match params.get("status").map(String::as_str) {
        None => None,
        Some("pending") => Some(Status::Pending),
        Some("completed") => Some(Status::Completed),
        Some(_) => return Err(ApiFailure::validation("status", "Unknown status")),
    };
    let priority_min = parse_number(&params, "priority_min")?;
    let priority_max = parse_number(&params, "priority_max")?;
    let project_ids: Option<Vec<&str>> = params.get("project_ids").map(|v| v.split(',').collect());
    let tag_ids: Option<Vec<&str>> = params.get("tag_ids").map(|v| v.split(',').collect());
    let search = params.get("search").map(|s| s.to_lowercase());
    let due_before = params
        .get("due_before")
        .map(|raw| parse_timestamp("due_before", raw))
        .transpose()?;
    let due_after = params
        .get("due_after")
        .map(|raw| parse_timestamp("due_after", raw))
        .transpose()?;

    let matching: Vec<Task> = store
        .tasks
        .iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .filter(|t| priority_min.is_none_or(|min| t.priority >= min))
        .filter(|t| priority_max.is_none_or(|max| t.priority <= max))
        .filter(|t| {
            project_ids
                .as_ref()
                .is_none_or(|ids| t.project_id.as_deref().is_some_and(|p| ids.contains(&p)))
        })
        .filter(|t| {
            tag_ids
                .as_ref()
                .is_none_or(|ids| t.tag_ids.iter().any(|tag| ids.contains(&tag.as_str())))
        })
        .filter(|t| search.as_deref().is_none_or(|q| matches_text(t, q)))
        .filter(|t| due_before.is_none_or(|b| t.due_date.is_some_and(|d| d < b)))
        .filter(|t| due_after.is_none_or(|a| t.due_date.is_some_and(|d| d > a)))
        .cloned()
        .collect();

    let total = matching.len() as i64;
    let tasks: Vec<Task> = matching
        .into_iter()
        .skip(((page - 1) * limit) as usize)
        .take(limit as usize)
        .collect();
    ok(
        StatusCode::OK,
        json!({
            "tasks": tasks,
            "meta": {
                "total": total,
                "page": page,
                "limit": limit,
                "totalPages": (total + limit - 1) / limit,
            }
        }),
    )
}

fn matches_text(task: &Task, needle: &str) -> bool {
    task.title.to_lowercase().contains(needle)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

fn pending_due(store: &Store, keep: impl Fn(DateTime<Utc>) -> bool) -> Vec<Task> {
    store
        .tasks
        .iter()
        .filter(|t| t.status == Status::Pending && t.due_date.is_some_and(&keep))
        .cloned()
        .collect()
}

fn end_of_today(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::default()).and_utc() + Duration::days(1)
}

async fn today_tasks(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let end = end_of_today(Utc::now());
    ok(StatusCode::OK, task_list(pending_due(&store, |due| due < end)))
}

async fn upcoming_tasks(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let days = parse_number(&params, "days")?.unwrap_or(7);
    let now = Utc::now();
    let until = end_of_today(now) + Duration::days(days);
    ok(StatusCode::OK, task_list(pending_due(&store, |due| due >= now && due < until)))
}

async fn overdue_tasks(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let now = Utc::now();
    ok(StatusCode::OK, task_list(pending_due(&store, |due| due < now)))
}

async fn get_task(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let task = store.task(&id).cloned().ok_or_else(ApiFailure::task_not_found)?;
    ok(StatusCode::OK, task)
}

async fn search(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let query = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiFailure::validation("q", "Search query is required"));
    }
    let limit = parse_number(&params, "limit")?.unwrap_or(20).max(0) as usize;
    let tasks = store
        .tasks
        .iter()
        .filter(|t| matches_text(t, &query))
        .take(limit)
        .cloned()
        .collect();
    ok(StatusCode::OK, task_list(tasks))
}

// ---------------------------------------------------------------------------
// Task mutations
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateFlags {
    #[serde(default)]
    parse_natural_language: Option<String>,
}

fn check_priority(priority: i64) -> Result<i64, ApiFailure> {
    if PRIORITY_RANGE.contains(&priority) {
        Ok(priority)
    } else {
        Err(ApiFailure::validation(
            "priority",
            format!(
                "Priority must be between {} and {}",
                PRIORITY_RANGE.start(),
                PRIORITY_RANGE.end()
            ),
        ))
    }
}

/// Apply a sparse field mapping to `task`. Unknown keys are ignored.
fn apply_fields(store: &Store, task: &mut Task, fields: &Map<String, Value>) -> Result<(), ApiFailure> {
    for (key, value) in fields {
        match key.as_str() {
            "title" => {
                let title = value.as_str().map(str::trim).unwrap_or_default();
                if title.is_empty() {
                    return Err(ApiFailure::validation("title", "Title is required"));
                }
                task.title = title.to_string();
            }
            "description" => task.description = value.as_str().map(String::from),
            "priority" => {
                let priority = value
                    .as_i64()
                    .ok_or_else(|| ApiFailure::validation("priority", "Priority must be an integer"))?;
                task.priority = check_priority(priority)?;
            }
            "dueDate" => {
                task.due_date = match value.as_str() {
                    Some(raw) => Some(parse_timestamp("dueDate", raw)?),
                    None => None,
                }
            }
            "status" => {
                task.status = serde_json::from_value(value.clone())
                    .map_err(|_| ApiFailure::validation("status", "Status must be pending or completed"))?;
            }
            "projectId" => {
                let project_id = value.as_str().map(String::from);
                if let Some(id) = &project_id {
                    if !store.projects.iter().any(|p| &p.id == id) {
                        return Err(ApiFailure::new(StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND", "Project not found"));
                    }
                }
                task.project_id = project_id;
            }
            "tagIds" => {
                let ids: Vec<String> = serde_json::from_value(value.clone())
                    .map_err(|_| ApiFailure::validation("tagIds", "tagIds must be a list of ids"))?;
                if let Some(missing) = ids.iter().find(|id| !store.tags.iter().any(|t| &t.id == *id)) {
                    return Err(ApiFailure::new(
                        StatusCode::NOT_FOUND,
                        "TAG_NOT_FOUND",
                        format!("Tag {missing} not found"),
                    ));
                }
                task.tag_ids = ids;
            }
            _ => {}
        }
    }
    task.updated_at = Utc::now();
    Ok(())
}

async fn create_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(flags): Query<CreateFlags>,
    body: Bytes,
) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let fields: Map<String, Value> = json_body(&body)?;

    if flags.parse_natural_language.as_deref() == Some("true") {
        let text = fields
            .get("input_text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiFailure::validation("input_text", "input_text is required"))?;
        let parsed = nlp::parse(text, Utc::now());
        let mut task = Task::new(parsed.title.clone());
        task.due_date = parsed.due_date;
        task.priority = parsed.priority.unwrap_or(model::DEFAULT_PRIORITY);
        task.tag_ids = parsed.tags.iter().map(|name| store.tag_id_for(name)).collect();
        store.tasks.push(task.clone());
        return ok(
            StatusCode::CREATED,
            json!({ "task": task, "parsed": parsed_json(&parsed) }),
        );
    }

    if !fields.contains_key("title") {
        return Err(ApiFailure::validation("title", "Title is required"));
    }
    let mut task = Task::new(String::new());
    apply_fields(&store, &mut task, &fields)?;
    store.tasks.push(task.clone());
    ok(StatusCode::CREATED, task)
}

async fn update_task(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let fields: Map<String, Value> = json_body(&body)?;
    let before = store.task(&id).cloned().ok_or_else(ApiFailure::task_not_found)?;
    let mut task = before.clone();
    apply_fields(&store, &mut task, &fields)?;
    store.put_task(task.clone());
    let undo_token = store.issue_undo(UndoEntry::Revert(before));
    ok(StatusCode::OK, json!({ "task": task, "undoToken": undo_token }))
}

#[derive(Deserialize)]
struct StatusBody {
    status: Value,
}

async fn set_status(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let input: StatusBody = json_body(&body)?;
    let status: Status = serde_json::from_value(input.status)
        .map_err(|_| ApiFailure::validation("status", "Status must be pending or completed"))?;
    let before = store.task(&id).cloned().ok_or_else(ApiFailure::task_not_found)?;
    let mut task = before.clone();
    task.status = status;
    task.updated_at = Utc::now();
    store.put_task(task.clone());
    let undo_token = store.issue_undo(UndoEntry::Revert(before));
    ok(StatusCode::OK, json!({ "task": task, "undoToken": undo_token }))
}

async fn delete_task(State(db): State<Db>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let task = store.remove_task(&id).ok_or_else(ApiFailure::task_not_found)?;
    let undo_token = store.issue_undo(UndoEntry::Restore(task));
    ok(StatusCode::OK, json!({ "undoToken": undo_token }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem {
    action: String,
    task_id: String,
}

#[derive(Deserialize)]
struct BatchBody {
    operations: Vec<BatchItem>,
}

/// Apply each operation independently; a failing item does not stop the rest.
async fn batch(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let input: BatchBody = json_body(&body)?;
    if input.operations.is_empty() {
        return Err(ApiFailure::validation("operations", "At least one operation is required"));
    }

    let mut results = Vec::with_capacity(input.operations.len());
    for op in input.operations {
        let outcome = match op.action.as_str() {
            "complete" => match store.task(&op.task_id).cloned() {
                Some(before) => {
                    let mut task = before.clone();
                    task.status = Status::Completed;
                    task.updated_at = Utc::now();
                    store.put_task(task);
                    Ok(store.issue_undo(UndoEntry::Revert(before)))
                }
                None => Err(("TASK_NOT_FOUND", "Task not found")),
            },
            "delete" => match store.remove_task(&op.task_id) {
                Some(task) => Ok(store.issue_undo(UndoEntry::Restore(task))),
                None => Err(("TASK_NOT_FOUND", "Task not found")),
            },
            _ => Err(("INVALID_ACTION", "Unknown batch action")),
        };
        results.push(match outcome {
            Ok(undo_token) => json!({
                "action": op.action,
                "taskId": op.task_id,
                "success": true,
                "undoToken": undo_token,
            }),
            Err((code, message)) => json!({
                "action": op.action,
                "taskId": op.task_id,
                "success": false,
                "error": { "code": code, "message": message },
            }),
        });
    }
    ok(StatusCode::OK, json!({ "results": results }))
}

async fn undo(State(db): State<Db>, headers: HeaderMap, Path(token): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let entry = store.undo.remove(&token).ok_or_else(|| {
        ApiFailure::new(
            StatusCode::NOT_FOUND,
            "UNDO_TOKEN_NOT_FOUND",
            "Undo token not found or already used",
        )
    })?;
    let (task, message) = match entry {
        UndoEntry::Revert(task) => (task, "Change reverted"),
        UndoEntry::Restore(task) => (task, "Task restored"),
    };
    store.put_task(task.clone());
    ok(StatusCode::OK, json!({ "task": task, "message": message }))
}

// ---------------------------------------------------------------------------
// Parse, projects, tags
// ---------------------------------------------------------------------------

fn parsed_json(parsed: &nlp::Parsed) -> Value {
    json!({
        "title": parsed.title,
        "dueDate": parsed.due_date,
        "priority": parsed.priority,
        "tags": parsed.tags,
    })
}

#[derive(Deserialize)]
struct ParseBody {
    text: String,
}

async fn parse(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    let input: ParseBody = json_body(&body)?;
    ok(StatusCode::OK, parsed_json(&nlp::parse(&input.text, Utc::now())))
}

async fn list_projects(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    ok(StatusCode::OK, json!({ "projects": store.projects }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectBody {
    name: String,
    description: Option<String>,
    parent_id: Option<String>,
}

async fn create_project(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let input: CreateProjectBody = json_body(&body)?;
    if input.name.trim().is_empty() {
        return Err(ApiFailure::validation("name", "Name is required"));
    }
    if let Some(parent) = &input.parent_id {
        if !store.projects.iter().any(|p| &p.id == parent) {
            return Err(ApiFailure::new(StatusCode::NOT_FOUND, "PROJECT_NOT_FOUND", "Parent project not found"));
        }
    }
    let project = Project {
        id: model::new_id(),
        name: input.name,
        description: input.description,
        parent_id: input.parent_id,
    };
    store.projects.push(project.clone());
    ok(StatusCode::CREATED, json!({ "project": project }))
}

async fn list_tags(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let store = db.read().await;
    authorize(&store, &headers)?;
    ok(StatusCode::OK, json!({ "tags": store.tags }))
}
