//! Classification of transport outcomes and envelope unwrapping.
//!
//! Every response `AuthClient` receives passes through `classify`, so a new
//! endpoint cannot skip the error mapping. The rules:
//! - 2xx is success and the body is returned for decoding.
//! - 422 with an `errors` map becomes `AuthError::Validation`.
//! - Any other non-2xx becomes `AuthError::Api` with its status and the
//!   body's `message`, or `HTTP {status}` when there is none.

use serde_json::Value;
use tracing::warn;

use crate::config::ResponseEnvelope;
use crate::error::{AuthError, DecodingError, FieldErrors, UnexpectedResponse};
use crate::http::HttpResponse;
use crate::transport::TransportError;

const DEFAULT_VALIDATION_MESSAGE: &str = "Validation failed";

/// Map a transport outcome to a successful response or a typed error.
pub fn classify(outcome: Result<HttpResponse, TransportError>) -> Result<HttpResponse, AuthError> {
    let response = outcome.map_err(|e| {
        warn!(error = %e, "transport failure");
        AuthError::api_with_source(e.message.clone(), None, e)
    })?;
    if response.is_success() {
        return Ok(response);
    }
    let err = classify_failure(&response);
    warn!(status = response.status, error = %err, "request failed");
    Err(err)
}

fn classify_failure(response: &HttpResponse) -> AuthError {
    let status = response.status;
    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if status == 422 {
        if let Some(errors) = body.as_ref().and_then(|b| b.get("errors")).and_then(field_errors) {
            return AuthError::Validation {
                message: message.unwrap_or_else(|| DEFAULT_VALIDATION_MESSAGE.to_string()),
                errors,
                status,
            };
        }
    }

    match message {
        Some(message) => AuthError::api(message, Some(status)),
        None => AuthError::api_with_source(
            format!("HTTP {status}"),
            Some(status),
            UnexpectedResponse {
                body: response.body.clone(),
            },
        ),
    }
}

/// `{"field": ["msg", ...]}`; a bare string message is accepted as a
/// one-element list. Anything else is not a field-error map.
fn field_errors(value: &Value) -> Option<FieldErrors> {
    value
        .as_object()?
        .iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .map(|m| m.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()?,
                _ => return None,
            };
            Some((field.clone(), messages))
        })
        .collect()
}

/// Parse a success body as JSON. An unreadable body is an `Api` failure
/// wrapping the parser error.
pub(crate) fn json_body(response: &HttpResponse) -> Result<Value, AuthError> {
    serde_json::from_str(&response.body)
        .map_err(|e| AuthError::api_with_source("malformed response body", None, e))
}

impl ResponseEnvelope {
    /// Name used when reporting decoding failures of the unwrapped payload.
    pub(crate) fn field(&self) -> &'static str {
        match self {
            ResponseEnvelope::Data => "data",
            ResponseEnvelope::Bare => "body",
        }
    }

    /// Extract the payload, or `None` when a `Data` envelope has no `data`
    /// (or it is `null`).
    pub(crate) fn open(&self, body: Value) -> Option<Value> {
        match self {
            ResponseEnvelope::Bare => Some(body),
            ResponseEnvelope::Data => match body {
                Value::Object(mut obj) => obj.remove("data").filter(|v| !v.is_null()),
                _ => None,
            },
        }
    }

    pub(crate) fn unwrap(&self, body: Value) -> Result<Value, DecodingError> {
        self.open(body).ok_or_else(|| DecodingError::missing(self.field()))
    }
}

/// Decode each element of a collection payload, preserving order.
pub(crate) fn decode_list<D>(
    payload: &Value,
    field: &str,
    decode: fn(&Value) -> Result<D, DecodingError>,
) -> Result<Vec<D>, DecodingError> {
    payload
        .as_array()
        .ok_or_else(|| DecodingError::invalid_type(field, "array"))?
        .iter()
        .map(|item| decode(item).map_err(|e| DecodingError::nested(field, e)))
        .collect()
}

/// Permissions arrive either as a bare array or as `{"permissions": [...]}`.
pub(crate) fn decode_permissions(payload: &Value, field: &str) -> Result<Vec<String>, DecodingError> {
    let list = match payload {
        Value::Object(obj) => obj
            .get("permissions")
            .ok_or_else(|| DecodingError::missing("permissions"))?,
        other => other,
    };
    list.as_array()
        .ok_or_else(|| DecodingError::invalid_type(field, "array of strings"))?
        .iter()
        .map(|p| {
            p.as_str()
                .map(str::to_string)
                .ok_or_else(|| DecodingError::invalid_type(field, "array of strings"))
        })
        .collect()
}
