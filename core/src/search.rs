//! Full-text search and parse-only previews of natural-language input.

use serde_json::json;

use crate::client::TodoMeClient;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{ParseResult, TaskList};

pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

impl<T: Transport> TodoMeClient<T> {
    pub fn build_search(&self, query: &str, limit: u32) -> HttpRequest {
        let mut req = self.request(HttpMethod::Get, "search");
        req.query = vec![
            ("q".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        req
    }

    pub fn build_parse(&self, text: &str) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "parse", &json!({ "text": text }))
    }

    pub fn search(&self, query: &str, limit: u32) -> Result<TaskList> {
        self.send(self.build_search(query, limit))
    }

    /// Parse `text` the way natural-language creation would, without
    /// creating anything.
    pub fn parse_natural(&self, text: &str) -> Result<ParseResult> {
        self.send(self.build_parse(text)?)
    }
}
