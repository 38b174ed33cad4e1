//! `TodoMeClient`: request construction, credential handling and dispatch.
//!
//! # Design
//! Every operation is split into a `build_*` method that produces an
//! `HttpRequest` and a call that sends it through the client's
//! `Transport` and unwraps the envelope. The build half is public so a
//! host with its own HTTP stack can execute requests itself and hand the
//! response to `envelope::parse_response`.
//!
//! The bearer credential is the only mutable state. It sits behind an
//! `RwLock` and is read once per request when the request is built. A
//! refresh swaps it in place after the service confirms the new token, so
//! a request built concurrently with a refresh may still carry the old
//! token. That token stays valid until the service supersedes it.

use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::{parse_response, unwrap_body};
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::{Transport, UreqTransport, DEFAULT_TIMEOUT};

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "TODOME_BASE_URL";

/// Environment variable holding a bearer token.
pub const TOKEN_ENV: &str = "TODOME_API_TOKEN";

/// Characters escaped when an opaque id is placed in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Blocking client for the todo-me API.
///
/// Safe to share between threads (`Arc<TodoMeClient>`): operations take
/// `&self`, including `refresh_token`.
///
/// ```no_run
/// use todome_core::TodoMeClient;
///
/// # fn example() -> todome_core::Result<()> {
/// let client = TodoMeClient::login("http://localhost:8080/api/v1", "me@example.com", "secret")?;
/// let task = client.create_task_natural("Buy milk tomorrow #errands")?;
/// println!("{} due {:?}", task.title, task.due_date);
/// # Ok(())
/// # }
/// ```
pub struct TodoMeClient<T = UreqTransport> {
    base_url: String,
    token: RwLock<Option<String>>,
    transport: T,
}

// The bearer token never reaches log output.
impl<T: fmt::Debug> fmt::Debug for TodoMeClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_token = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("TodoMeClient")
            .field("base_url", &self.base_url)
            .field("token", &if has_token { "<redacted>" } else { "<none>" })
            .field("transport", &self.transport)
            .finish()
    }
}

impl TodoMeClient<UreqTransport> {
    /// Authenticated client using the default blocking transport.
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self::with_transport(base_url, Some(token.into()), UreqTransport::default())
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Transport> TodoMeClient<T> {
    /// Client over a caller-supplied transport. `None` means anonymous.
    pub fn with_transport(base_url: &str, token: Option<String>, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential currently attached to requests.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request construction
    // -----------------------------------------------------------------------

    /// Build a body-less request for `path`, relative to the base URL.
    pub fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(token) = self.token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        HttpRequest {
            method,
            path: format!("{}/{}", self.base_url, path.trim_start_matches('/')),
            query: Vec::new(),
            headers,
            body: None,
        }
    }

    /// Build a request carrying `body` serialized as JSON.
    pub fn json_request<B>(&self, method: HttpMethod, path: &str, body: &B) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let body =
            serde_json::to_string(body).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut req = self.request(method, path);
        req.body = Some(body);
        Ok(req)
    }

    /// Request without the bearer credential, for register and login.
    pub(crate) fn anonymous_json_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
    ) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let mut req = self.json_request(method, path, body)?;
        req.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
        Ok(req)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Execute `request` and decode the envelope's `data` into `R`.
    pub fn send<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R> {
        let response = self.transport.execute(request)?;
        parse_response(&response)
    }

    /// Execute `request` and return the envelope's `data` untouched.
    pub fn call_raw(&self, request: HttpRequest) -> Result<Value> {
        let response = self.transport.execute(request)?;
        unwrap_body(&response.body)
    }
}

/// Escape an opaque id for use as a single path segment.
pub(crate) fn segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

/// Builder for `TodoMeClient`.
pub struct ClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Seed the builder from `TODOME_BASE_URL` and `TODOME_API_TOKEN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientBuilder::from_env`], reading variables through `lookup`.
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::new();
        builder.base_url = lookup(BASE_URL_ENV).filter(|v| !v.is_empty());
        builder.token = lookup(TOKEN_ENV).filter(|v| !v.is_empty());
        builder
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Per-request timeout enforced by the transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a client over the default blocking transport.
    pub fn build(self) -> Result<TodoMeClient> {
        let transport = UreqTransport::new(self.timeout);
        self.build_with(transport)
    }

    /// Build a client over a custom transport. `timeout` is ignored.
    pub fn build_with<T: Transport>(self, transport: T) -> Result<TodoMeClient<T>> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Config("base_url is required".to_string()))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ApiError::Config(format!(
                "base_url must be an http(s) URL, got {base_url:?}"
            )));
        }
        Ok(TodoMeClient::with_transport(&base_url, self.token, transport))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
