//! Redeeming undo tokens.
//!
//! Tokens are single-use and expire on the service's schedule. The client
//! keeps no record of redeemed tokens, so a second redemption reaches the
//! service and comes back as a service error.

use crate::client::{segment, TodoMeClient};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::UndoResult;

impl<T: Transport> TodoMeClient<T> {
    pub fn build_undo(&self, token: &str) -> HttpRequest {
        self.request(HttpMethod::Post, &format!("undo/{}", segment(token)))
    }

    /// Reverse the mutation that issued `token`.
    pub fn undo(&self, token: &str) -> Result<UndoResult> {
        self.send(self.build_undo(token))
    }
}
