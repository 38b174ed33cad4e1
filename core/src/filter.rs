//! Translates a `ListFilter` into query parameters for `GET /tasks`.
//!
//! Only options the caller supplied end up in the query, and presence is
//! decided by `Option`, never by value: `priority_min: Some(0)` and
//! `search: Some(String::new())` are both sent. `page` and `limit` are
//! always sent.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::TaskStatus;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;

/// Optional constraints for listing tasks. `Default` means "no constraint"
/// on every option plus the first page of 20.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<TaskStatus>,
    /// Inclusive lower bound.
    pub priority_min: Option<i64>,
    /// Inclusive upper bound.
    pub priority_max: Option<i64>,
    pub project_id: Option<String>,
    /// Tasks holding any of these tags.
    pub tag_ids: Option<Vec<String>>,
    pub search: Option<String>,
    pub due_before: Option<DateTime<Utc>>,
    pub due_after: Option<DateTime<Utc>>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority_min: None,
            priority_max: None,
            project_id: None,
            tag_ids: None,
            search: None,
            due_before: None,
            due_after: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.priority_min = min;
        self.priority_max = max;
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn tags<I, S>(mut self, tag_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_ids = Some(tag_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn due_between(mut self, after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Self {
        self.due_after = after;
        self.due_before = before;
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    /// Flatten into `(name, value)` query pairs.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        let mut push = |name: &str, value: String| query.push((name.to_string(), value));

        if let Some(status) = self.status {
            push("status", status.to_string());
        }
        if let Some(min) = self.priority_min {
            push("priority_min", min.to_string());
        }
        if let Some(max) = self.priority_max {
            push("priority_max", max.to_string());
        }
        if let Some(project_id) = &self.project_id {
            push("project_ids", project_id.clone());
        }
        if let Some(tag_ids) = &self.tag_ids {
            push("tag_ids", tag_ids.join(","));
        }
        if let Some(search) = &self.search {
            push("search", search.clone());
        }
        if let Some(before) = &self.due_before {
            push("due_before", format_timestamp(before));
        }
        if let Some(after) = &self.due_after {
            push("due_after", format_timestamp(after));
        }
        query
    }
}

/// ISO-8601 with a `Z` suffix, e.g. `2024-05-01T17:00:00Z`. Fractional
/// seconds are kept when present (`17:00:00.500Z`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
