//! Blocking client SDK for the todo-me task API.
//!
//! # Overview
//! Every endpoint answers with an envelope, `{success, data | error}`.
//! `TodoMeClient` builds requests, attaches the bearer credential, sends
//! them through a `Transport` and unwraps the envelope into typed values
//! or an `ApiError` carrying the service's `code`, `message` and
//! `details`.
//!
//! # Design
//! - Each operation is split into `build_*` (pure, produces an
//!   `HttpRequest`) and a call that executes it, so hosts can bring their
//!   own HTTP stack.
//! - One network call per operation. No caching, no retries, no local
//!   validation of business rules; the service decides and the client
//!   reports.
//! - Ids and undo tokens are opaque strings issued by the service.

pub mod auth;
pub mod batch;
pub mod client;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod http;
pub mod projects;
pub mod search;
pub mod tasks;
pub mod transport;
pub mod types;
pub mod undo;

pub use batch::batch_operations;
pub use client::{ClientBuilder, TodoMeClient};
pub use envelope::{parse_response, Envelope, ErrorInfo};
pub use error::{ApiError, Result};
pub use filter::ListFilter;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AuthToken, BatchAction, BatchItemResult, BatchOperation, BatchResult, CreateProject, CreateTask,
    DeleteResult, PaginationMeta, ParseResult, Project, Tag, Task, TaskList, TaskMutation,
    TaskStatus, UndoResult,
};
