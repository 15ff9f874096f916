//! Error types for the auth API client.
//!
//! # Design
//! Three kinds of failure reach the caller. `Decoding` means a payload did not
//! have the shape a DTO requires and is always a local contract violation.
//! `Validation` is the caller-correctable 422 case and keeps the per-field
//! messages. `Api` covers everything else (auth failures, not-found, server
//! errors, transport failures) and carries the status when one is known plus
//! the underlying cause.

use std::collections::BTreeMap;
use std::error::Error as StdError;

use thiserror::Error;

/// Field name mapped to the server's messages for that field, in order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, AuthError>;

/// A wire payload was missing a required field or had one of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}`: {kind}")]
pub struct DecodingError {
    pub field: String,
    pub kind: DecodingErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingErrorKind {
    #[error("missing required field")]
    Missing,

    #[error("expected {0}")]
    InvalidType(&'static str),

    #[error("{0}")]
    InvalidValue(String),

    /// A nested entity failed to decode; `field` names the outer field.
    #[error("{0}")]
    Nested(Box<DecodingError>),
}

impl DecodingError {
    pub fn missing(field: &str) -> Self {
        Self::new(field, DecodingErrorKind::Missing)
    }

    pub fn invalid_type(field: &str, expected: &'static str) -> Self {
        Self::new(field, DecodingErrorKind::InvalidType(expected))
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(field, DecodingErrorKind::InvalidValue(reason.into()))
    }

    pub fn nested(field: &str, inner: DecodingError) -> Self {
        Self::new(field, DecodingErrorKind::Nested(Box::new(inner)))
    }

    fn new(field: &str, kind: DecodingErrorKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }
}

/// A non-2xx response that carried no usable `message`.
#[derive(Debug, Error)]
#[error("unexpected response body: {body}")]
pub struct UnexpectedResponse {
    pub body: String,
}

/// Errors returned by `AuthClient` operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to decode payload: {0}")]
    Decoding(#[from] DecodingError),

    /// The server rejected the input (HTTP 422) with field-level detail.
    #[error("{message}")]
    Validation {
        message: String,
        errors: FieldErrors,
        status: u16,
    },

    /// Any other failure. `status` is `None` when no HTTP response was
    /// obtained or the response could not be read.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<BoxError>,
    },
}

impl AuthError {
    pub(crate) fn api(message: impl Into<String>, status: Option<u16>) -> Self {
        AuthError::Api {
            message: message.into(),
            status,
            source: None,
        }
    }

    pub(crate) fn api_with_source(
        message: impl Into<String>,
        status: Option<u16>,
        source: impl Into<BoxError>,
    ) -> Self {
        AuthError::Api {
            message: message.into(),
            status,
            source: Some(source.into()),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Decoding(_) => None,
            AuthError::Validation { status, .. } => Some(*status),
            AuthError::Api { status, .. } => *status,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AuthError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// True for 401 and 403 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
