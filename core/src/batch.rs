//! Several per-task actions in one request.
//!
//! The service reports success or failure per item, in request order. A
//! batch is not atomic: some items may succeed while others fail, and
//! nothing is rolled back. Callers inspect `BatchResult::results`.

use serde::Serialize;

use crate::client::TodoMeClient;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{BatchAction, BatchOperation, BatchResult};

#[derive(Serialize)]
struct BatchBody<'a> {
    operations: &'a [BatchOperation],
}

/// One `action` per id, in input order.
pub fn batch_operations<S: AsRef<str>>(action: BatchAction, task_ids: &[S]) -> Vec<BatchOperation> {
    task_ids
        .iter()
        .map(|id| BatchOperation {
            action,
            task_id: id.as_ref().to_string(),
        })
        .collect()
}

impl<T: Transport> TodoMeClient<T> {
    /// Build `POST /batch`. An empty operation list is rejected here,
    /// before anything is sent.
    pub fn build_batch(&self, operations: &[BatchOperation]) -> Result<HttpRequest> {
        if operations.is_empty() {
            return Err(ApiError::InvalidRequest(
                "batch requires at least one operation".to_string(),
            ));
        }
        self.json_request(HttpMethod::Post, "batch", &BatchBody { operations })
    }

    pub fn batch(&self, operations: &[BatchOperation]) -> Result<BatchResult> {
        self.send(self.build_batch(operations)?)
    }

    pub fn batch_apply<S: AsRef<str>>(&self, action: BatchAction, task_ids: &[S]) -> Result<BatchResult> {
        self.batch(&batch_operations(action, task_ids))
    }

    pub fn batch_complete<S: AsRef<str>>(&self, task_ids: &[S]) -> Result<BatchResult> {
        self.batch_apply(BatchAction::Complete, task_ids)
    }

    pub fn batch_delete<S: AsRef<str>>(&self, task_ids: &[S]) -> Result<BatchResult> {
        self.batch_apply(BatchAction::Delete, task_ids)
    }
}
