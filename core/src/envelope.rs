//! The `{success, data | error}` wrapper around every API response.
//!
//! # Design
//! The `success` flag is the only source of truth: a 200 carrying
//! `success: false` is a failure and a 4xx carrying `success: true` is
//! not. A missing or falsy flag counts as failure. Missing error fields
//! fall back to `UNKNOWN_ERROR` / `"Unknown error"`, and a missing `data`
//! on success becomes an empty object so typed decoding can apply its own
//! defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result, UNKNOWN_ERROR_CODE, UNKNOWN_ERROR_MESSAGE};
use crate::http::HttpResponse;

/// Error payload of a failed envelope, or of one failed batch item.
/// A missing `code` or `message` takes the `UNKNOWN_ERROR` defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(default = "unknown_code")]
    pub code: String,
    #[serde(default = "unknown_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

fn unknown_code() -> String {
    UNKNOWN_ERROR_CODE.to_string()
}

fn unknown_message() -> String {
    UNKNOWN_ERROR_MESSAGE.to_string()
}

impl From<ErrorInfo> for ApiError {
    fn from(info: ErrorInfo) -> Self {
        ApiError::Service {
            code: info.code,
            message: info.message,
            details: info.details,
        }
    }
}

/// A decoded response envelope. Exactly one branch is meaningful.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure(ErrorInfo),
}

impl Envelope {
    /// Classify a parsed response body.
    pub fn from_value(mut body: Value) -> Self {
        let success = body.get("success").is_some_and(is_truthy);
        if success {
            let data = match body.get_mut("data").map(Value::take) {
                None | Some(Value::Null) => Value::Object(Map::new()),
                Some(data) => data,
            };
            return Envelope::Success(data);
        }

        let error = body.get_mut("error").map(Value::take).unwrap_or(Value::Null);
        let text = |key: &str, default: &str| match error.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let details = match error.get("details") {
            None | Some(Value::Null) => None,
            Some(details) => Some(details.clone()),
        };
        Envelope::Failure(ErrorInfo {
            code: text("code", UNKNOWN_ERROR_CODE),
            message: text("message", UNKNOWN_ERROR_MESSAGE),
            details,
        })
    }

    /// Unwrap to the `data` payload or raise the service error.
    pub fn into_result(self) -> Result<Value> {
        match self {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(info) => {
                tracing::warn!(code = %info.code, "service reported failure");
                Err(info.into())
            }
        }
    }
}

/// Parse a raw response body and unwrap its envelope.
pub fn unwrap_body(body: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    Envelope::from_value(value).into_result()
}

/// Unwrap a response and decode its `data` payload into `T`.
pub fn parse_response<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    let data = unwrap_body(&response.body)?;
    serde_json::from_value(data).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// JSON truthiness: `false`, `null`, `0`, `""`, `[]` and `{}` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_returns_data_unchanged() {
        let data = unwrap_body(r#"{"success":true,"data":{"tasks":[],"meta":{"page":1}}}"#).unwrap();
        assert_eq!(data, json!({"tasks": [], "meta": {"page": 1}}));
    }

    #[test]
    fn success_without_data_is_empty_object() {
        let data = unwrap_body(r#"{"success":true}"#).unwrap();
        assert_eq!(data, json!({}));
    }

    #[test]
    fn success_is_independent_of_http_status() {
        let response = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body: r#"{"success":true,"data":{"token":"abc"}}"#.to_string(),
        };
        let data: Value = parse_response(&response).unwrap();
        assert_eq!(data["token"], "abc");
    }

    #[test]
    fn failure_carries_code_message_and_details() {
        let err = unwrap_body(
            r#"{"success":false,"error":{"code":"VALIDATION_ERROR","message":"Invalid priority","details":{"field":"priority"}}}"#,
        )
        .unwrap_err();
        match err {
            ApiError::Service {
                code,
                message,
                details,
            } => {
                assert_eq!(code, "VALIDATION_ERROR");
                assert_eq!(message, "Invalid priority");
                assert_eq!(details, Some(json!({"field": "priority"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_success_is_failure_with_defaults() {
        let err = unwrap_body(r#"{"data":{"id":"1"}}"#).unwrap_err();
        match err {
            ApiError::Service {
                code,
                message,
                details,
            } => {
                assert_eq!(code, "UNKNOWN_ERROR");
                assert_eq!(message, "Unknown error");
                assert!(details.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falsy_success_values_are_failures() {
        for body in [
            r#"{"success":false}"#,
            r#"{"success":null}"#,
            r#"{"success":0}"#,
            r#"{"success":""}"#,
        ] {
            assert!(unwrap_body(body).is_err(), "{body} should fail");
        }
    }

    #[test]
    fn partial_error_object_fills_in_defaults() {
        let err = unwrap_body(r#"{"success":false,"error":{"message":"boom"}}"#).unwrap_err();
        assert_eq!(err.code(), Some("UNKNOWN_ERROR"));
        assert_eq!(err.to_string(), "UNKNOWN_ERROR: boom");
    }

    #[test]
    fn non_string_error_fields_are_kept_as_text() {
        let err = unwrap_body(r#"{"success":false,"error":{"code":404,"message":["bad","input"]}}"#)
            .unwrap_err();
        assert_eq!(err.code(), Some("404"));
        assert_eq!(err.to_string(), r#"404: ["bad","input"]"#);
    }

    #[test]
    fn null_error_fields_take_defaults() {
        let err = unwrap_body(r#"{"success":false,"error":{"code":null,"message":null}}"#).unwrap_err();
        assert_eq!(err.to_string(), "UNKNOWN_ERROR: Unknown error");
    }

    #[test]
    fn non_json_body_is_deserialization_error() {
        let err = unwrap_body("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn mismatched_payload_is_deserialization_error() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: r#"{"success":true,"data":{"token":42}}"#.to_string(),
        };
        let result: Result<crate::types::AuthToken> = parse_response(&response);
        assert!(matches!(result, Err(ApiError::DeserializationError(_))));
    }
}
