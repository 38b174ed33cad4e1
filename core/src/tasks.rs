//! Task operations: listing, views, CRUD and status changes.
//!
//! Update, status change and delete return the undo token the service
//! issues for that mutation (see `crate::undo`).

use serde_json::{json, Map, Value};

use crate::client::{segment, TodoMeClient};
use crate::error::Result;
use crate::filter::ListFilter;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{CreateTask, DeleteResult, Task, TaskList, TaskMutation, TaskPayload, TaskStatus};

/// Days covered by `upcoming_tasks` when the caller has no preference.
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

impl<T: Transport> TodoMeClient<T> {
    pub fn build_list_tasks(&self, filter: &ListFilter) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, "tasks");
        req.query = filter.to_query();
        req
    }

    pub fn build_today_tasks(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "tasks/today")
    }

    pub fn build_upcoming_tasks(&self, days: u32) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, "tasks/upcoming");
        req.query.push(("days".to_string(), days.to_string()));
        req
    }

    pub fn build_overdue_tasks(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "tasks/overdue")
    }

    pub fn build_get_task(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("tasks/{}", segment(id)))
    }

    pub fn build_create_task(&self, input: &CreateTask) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "tasks", input)
    }

    /// Creation where the service parses `text` into title, due date,
    /// priority and tags.
    pub fn build_create_task_natural(&self, text: &str) -> Result<HttpRequest> {
        let mut req = self.json_request(HttpMethod::Post, "tasks", &json!({ "input_text": text }))?;
        req.query
            .push(("parse_natural_language".to_string(), "true".to_string()));
        Ok(req)
    }

    pub fn build_update_task(&self, id: &str, fields: &Map<String, Value>) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Patch, &format!("tasks/{}", segment(id)), fields)
    }

    pub fn build_set_task_status(&self, id: &str, status: TaskStatus) -> Result<HttpRequest> {
        self.json_request(
            HttpMethod::Patch,
            &format!("tasks/{}/status", segment(id)),
            &json!({ "status": status }),
        )
    }

    pub fn build_delete_task(&self, id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("tasks/{}", segment(id)))
    }

    /// List tasks matching `filter`, one page at a time.
    pub fn list_tasks(&self, filter: &ListFilter) -> Result<TaskList> {
        self.send(self.build_list_tasks(filter))
    }

    /// Tasks due today plus overdue ones.
    pub fn today_tasks(&self) -> Result<TaskList> {
        self.send(self.build_today_tasks())
    }

    pub fn upcoming_tasks(&self, days: u32) -> Result<TaskList> {
        self.send(self.build_upcoming_tasks(days))
    }

    pub fn overdue_tasks(&self) -> Result<TaskList> {
        self.send(self.build_overdue_tasks())
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        self.send::<TaskPayload>(self.build_get_task(id)).map(TaskPayload::into_task)
    }

    pub fn create_task(&self, input: &CreateTask) -> Result<Task> {
        self.send::<TaskPayload>(self.build_create_task(input)?)
            .map(TaskPayload::into_task)
    }

    pub fn create_task_natural(&self, text: &str) -> Result<Task> {
        self.send::<TaskPayload>(self.build_create_task_natural(text)?)
            .map(TaskPayload::into_task)
    }

    /// Apply an arbitrary field mapping, e.g. `{"title": "x", "priority": 1}`.
    pub fn update_task(&self, id: &str, fields: &Map<String, Value>) -> Result<TaskMutation> {
        self.send(self.build_update_task(id, fields)?)
    }

    pub fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<TaskMutation> {
        self.send(self.build_set_task_status(id, status)?)
    }

    pub fn complete_task(&self, id: &str) -> Result<TaskMutation> {
        self.set_task_status(id, TaskStatus::Completed)
    }

    pub fn uncomplete_task(&self, id: &str) -> Result<TaskMutation> {
        self.set_task_status(id, TaskStatus::Pending)
    }

    pub fn delete_task(&self, id: &str) -> Result<DeleteResult> {
        self.send(self.build_delete_task(id))
    }
}
