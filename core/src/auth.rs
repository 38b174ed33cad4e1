//! Credential acquisition (register, login) and renewal (refresh).
//!
//! Register and login are anonymous calls: any credential the client
//! holds is stripped from the request. Failures surface the service's
//! code and message unchanged; nothing is retried.

use crate::client::TodoMeClient;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::{Transport, UreqTransport};
use crate::types::{AuthToken, Credentials};

impl TodoMeClient<UreqTransport> {
    /// Create an account and return a client holding its token.
    pub fn register(base_url: &str, email: &str, password: &str) -> Result<Self> {
        Self::register_with(base_url, UreqTransport::default(), email, password)
    }

    /// Log in and return a client holding the issued token.
    pub fn login(base_url: &str, email: &str, password: &str) -> Result<Self> {
        Self::login_with(base_url, UreqTransport::default(), email, password)
    }
}

impl<T: Transport> TodoMeClient<T> {
    pub fn register_with(base_url: &str, transport: T, email: &str, password: &str) -> Result<Self> {
        let client = Self::with_transport(base_url, None, transport);
        let auth: AuthToken = client.send(client.build_register(email, password)?)?;
        client.set_token(auth.token);
        Ok(client)
    }

    pub fn login_with(base_url: &str, transport: T, email: &str, password: &str) -> Result<Self> {
        let client = Self::with_transport(base_url, None, transport);
        let auth: AuthToken = client.send(client.build_login(email, password)?)?;
        client.set_token(auth.token);
        Ok(client)
    }

    pub fn build_register(&self, email: &str, password: &str) -> Result<HttpRequest> {
        self.anonymous_json_request(HttpMethod::Post, "auth/register", &Credentials { email, password })
    }

    pub fn build_login(&self, email: &str, password: &str) -> Result<HttpRequest> {
        self.anonymous_json_request(HttpMethod::Post, "auth/token", &Credentials { email, password })
    }

    pub fn build_refresh(&self) -> HttpRequest {
        self.request(HttpMethod::Post, "auth/refresh")
    }

    /// Exchange the held token for a new one and start using it.
    ///
    /// The held token is replaced only after the service confirms the new
    /// one; on failure the client keeps its current token.
    pub fn refresh_token(&self) -> Result<String> {
        let auth: AuthToken = self.send(self.build_refresh())?;
        self.set_token(auth.token.clone());
        tracing::info!("bearer token refreshed");
        Ok(auth.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{client_with, Recorder};
    use crate::error::ApiError;

    #[test]
    fn login_is_anonymous_and_stores_token() {
        let transport = Recorder::replying([r#"{"success":true,"data":{"token":"fresh"}}"#]);
        let client =
            TodoMeClient::login_with("http://h/api/v1", transport, "a@b.c", "pw").unwrap();
        assert_eq!(client.token().as_deref(), Some("fresh"));

        let sent = client.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].path, "http://h/api/v1/auth/token");
        assert_eq!(sent[0].header("authorization"), None);
        let body: serde_json::Value = serde_json::from_str(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"email": "a@b.c", "password": "pw"}));
    }

    #[test]
    fn register_hits_register_endpoint() {
        let transport = Recorder::replying([r#"{"success":true,"data":{"token":"t","user":{"id":1}}}"#]);
        let client = TodoMeClient::register_with("http://h", transport, "a@b.c", "pw").unwrap();
        assert_eq!(client.transport().sent()[0].path, "http://h/auth/register");
        assert_eq!(client.token().as_deref(), Some("t"));
    }

    #[test]
    fn build_login_drops_existing_credential() {
        let client = client_with(&[]);
        let req = client.build_login("a@b.c", "pw").unwrap();
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn rejected_login_surfaces_service_error() {
        let transport = Recorder::replying([
            r#"{"success":false,"error":{"code":"INVALID_CREDENTIALS","message":"Invalid email or password"}}"#,
        ]);
        let err = TodoMeClient::login_with("http://h", transport, "a@b.c", "bad").unwrap_err();
        assert!(err.is_auth_error());
        assert_eq!(err.to_string(), "INVALID_CREDENTIALS: Invalid email or password");
    }

    #[test]
    fn login_without_token_is_deserialization_error() {
        let transport = Recorder::replying([r#"{"success":true,"data":{}}"#]);
        let err = TodoMeClient::login_with("http://h", transport, "a@b.c", "pw").unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn refresh_rotates_the_credential() {
        let client = client_with(&[
            r#"{"success":true,"data":{"token":"tok-2"}}"#,
            r#"{"success":true,"data":{"tags":[]}}"#,
        ]);
        assert_eq!(client.refresh_token().unwrap(), "tok-2");
        client.list_tags().unwrap();

        let sent = client.transport().sent();
        assert_eq!(sent[0].path, "http://localhost:8080/api/v1/auth/refresh");
        assert_eq!(sent[0].header("authorization"), Some("Bearer tok-1"));
        assert_eq!(sent[1].header("authorization"), Some("Bearer tok-2"));
    }

    #[test]
    fn failed_refresh_keeps_old_token() {
        let client = client_with(&[
            r#"{"success":false,"error":{"code":"INVALID_TOKEN","message":"Token expired"}}"#,
        ]);
        assert!(client.refresh_token().is_err());
        assert_eq!(client.token().as_deref(), Some("tok-1"));
    }
}
