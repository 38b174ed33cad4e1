//! Executes `HttpRequest` values over the network.
//!
//! `Transport` is the only seam where I/O happens. The default
//! `UreqTransport` is blocking and keeps 4xx/5xx responses as data: the
//! envelope's `success` flag decides whether a call failed, not the status
//! code. No retries are attempted at this layer.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Default request timeout for `UreqTransport`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Performs one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %req.method, url = %req.path, "sending request");

        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(&req.path), &req).call(),
            (HttpMethod::Delete, _) => prepare(self.agent.delete(&req.path), &req).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(self.agent.post(&req.path), &req).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => prepare(self.agent.post(&req.path), &req).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                prepare(self.agent.patch(&req.path), &req).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => prepare(self.agent.patch(&req.path), &req).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        tracing::debug!(status, url = %req.path, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Copy headers and query parameters onto a ureq request builder.
fn prepare<B>(mut builder: ureq::RequestBuilder<B>, req: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.query_pairs(req.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
