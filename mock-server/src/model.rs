//! In-memory state of the mock service.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PRIORITY: i64 = 3;
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 0..=4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Status,
    pub project_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title,
            description: None,
            priority: DEFAULT_PRIORITY,
            due_date: None,
            status: Status::Pending,
            project_id: None,
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: String,
    pub password: String,
}

/// What redeeming an undo token puts back.
#[derive(Clone, Debug)]
pub enum UndoEntry {
    /// Restore this earlier version of an existing task.
    Revert(Task),
    /// Re-insert a deleted task.
    Restore(Task),
}

#[derive(Debug, Default)]
pub struct Store {
    /// Keyed by email.
    pub users: HashMap<String, User>,
    /// Bearer token -> email.
    pub sessions: HashMap<String, String>,
    /// Insertion order is list order.
    pub tasks: Vec<Task>,
    pub projects: Vec<Project>,
    pub tags: Vec<Tag>,
    pub undo: HashMap<String, UndoEntry>,
}

impl Store {
    pub fn issue_token(&mut self, email: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), email.to_string());
        token
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn remove_task(&mut self, id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    /// Put a task back, replacing any current version with the same id.
    pub fn put_task(&mut self, task: Task) {
        match self.task_mut(&task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    pub fn issue_undo(&mut self, entry: UndoEntry) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.undo.insert(token.clone(), entry);
        token
    }

    /// Look up a tag by case-insensitive name, creating it when missing.
    pub fn tag_id_for(&mut self, name: &str) -> String {
        if let Some(tag) = self.tags.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
            return tag.id.clone();
        }
        let tag = Tag {
            id: new_id(),
            name: name.to_lowercase(),
        };
        let id = tag.id.clone();
        self.tags.push(tag);
        id
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
