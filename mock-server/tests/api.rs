use axum::{
    http::{self, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{uri}"))
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(body.map(|b| b.to_string()).unwrap_or_default())
        .unwrap()
}

async fn call(app: &Router, req: Request<String>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn signed_up(app: &Router) -> String {
    let (status, body) = call(
        app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({"email": "ada@example.com", "password": "correct horse"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["token"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = app();
    let (status, body) = call(&app, request("GET", "/tasks", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = app();
    signed_up(&app).await;
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/auth/token",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    signed_up(&app).await;
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(json!({"email": "ada@example.com", "password": "another one"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "EMAIL_EXISTS");
}

#[tokio::test]
async fn refresh_revokes_old_token() {
    let app = app();
    let old = signed_up(&app).await;
    let (status, body) = call(&app, request("POST", "/auth/refresh", Some(&old), None)).await;
    assert_eq!(status, StatusCode::OK);
    let new = body["data"]["token"].as_str().unwrap().to_string();
    assert_ne!(new, old);

    let (status, _) = call(&app, request("GET", "/tags", Some(&old), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, request("GET", "/tags", Some(&new), None)).await;
    assert_eq!(status, StatusCode::OK);
}

// --- tasks ---

#[tokio::test]
async fn list_tasks_empty_has_meta() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(&app, request("GET", "/tasks?page=1&limit=20", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tasks"], json!([]));
    assert_eq!(body["data"]["meta"]["total"], 0);
}

#[tokio::test]
async fn create_rejects_out_of_range_priority() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(
        &app,
        request("POST", "/tasks", Some(&token), Some(json!({"title": "x", "priority": 9}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "priority");
}

#[tokio::test]
async fn natural_language_creation_tags_and_dates() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/tasks?parse_natural_language=true",
            Some(&token),
            Some(json!({"input_text": "Buy milk tomorrow #errands"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task = &body["data"]["task"];
    assert_eq!(task["title"], "Buy milk");
    assert!(task["dueDate"].is_string());
    assert_eq!(task["tagIds"].as_array().unwrap().len(), 1);

    let (_, tags) = call(&app, request("GET", "/tags", Some(&token), None)).await;
    assert_eq!(tags["data"]["tags"][0]["name"], "errands");
    assert_eq!(tags["data"]["tags"][0]["id"], task["tagIds"][0]);
}

#[tokio::test]
async fn filters_by_priority_and_tag() {
    let app = app();
    let token = signed_up(&app).await;
    for (title, priority) in [("low", 0), ("mid", 2), ("high", 4)] {
        call(
            &app,
            request("POST", "/tasks", Some(&token), Some(json!({"title": title, "priority": priority}))),
        )
        .await;
    }
    let (_, body) = call(&app, request("GET", "/tasks?priority_min=0&priority_max=2", Some(&token), None)).await;
    let titles: Vec<&str> = body["data"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["low", "mid"]);

    let (_, body) = call(&app, request("GET", "/tasks?tag_ids=none", Some(&token), None)).await;
    assert_eq!(body["data"]["meta"]["total"], 0);
}

#[tokio::test]
async fn get_unknown_task_is_not_found() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(&app, request("GET", "/tasks/missing", Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TASK_NOT_FOUND");
}

#[tokio::test]
async fn delete_then_undo_restores_once() {
    let app = app();
    let token = signed_up(&app).await;
    let (_, created) = call(
        &app,
        request("POST", "/tasks", Some(&token), Some(json!({"title": "Walk dog"}))),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (_, deleted) = call(&app, request("DELETE", &format!("/tasks/{id}"), Some(&token), None)).await;
    let undo_token = deleted["data"]["undoToken"].as_str().unwrap().to_string();
    let (status, _) = call(&app, request("GET", &format!("/tasks/{id}"), Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, undone) = call(&app, request("POST", &format!("/undo/{undo_token}"), Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(undone["data"]["task"]["id"], id.as_str());

    let (status, again) = call(&app, request("POST", &format!("/undo/{undo_token}"), Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(again["error"]["code"], "UNDO_TOKEN_NOT_FOUND");
}

#[tokio::test]
async fn batch_reports_each_item_in_order() {
    let app = app();
    let token = signed_up(&app).await;
    let (_, created) = call(
        &app,
        request("POST", "/tasks", Some(&token), Some(json!({"title": "One"}))),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/batch",
            Some(&token),
            Some(json!({"operations": [
                {"action": "complete", "taskId": id},
                {"action": "complete", "taskId": "ghost"},
            ]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["taskId"], id.as_str());
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["error"]["code"], "TASK_NOT_FOUND");
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(
        &app,
        request("POST", "/batch", Some(&token), Some(json!({"operations": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_json_is_an_error_envelope() {
    let app = app();
    let token = signed_up(&app).await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/tasks")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body("{not json".to_string())
        .unwrap();
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_JSON");
}

// --- projects ---

#[tokio::test]
async fn nested_project_requires_existing_parent() {
    let app = app();
    let token = signed_up(&app).await;
    let (status, body) = call(
        &app,
        request("POST", "/projects", Some(&token), Some(json!({"name": "Q3", "parentId": "nope"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PROJECT_NOT_FOUND");

    let (_, parent) = call(
        &app,
        request("POST", "/projects", Some(&token), Some(json!({"name": "Work"}))),
    )
    .await;
    let parent_id = parent["data"]["project"]["id"].clone();
    let (status, child) = call(
        &app,
        request("POST", "/projects", Some(&token), Some(json!({"name": "Q3", "parentId": parent_id}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(child["data"]["project"]["parentId"], parent_id);
}
