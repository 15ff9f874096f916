//! Typed client for a remote authentication and authorization API.
//!
//! # Overview
//! `AuthClient` exposes one method per remote operation (login, token
//! refresh, profile, user CRUD, roles and permissions). Each call builds an
//! `HttpRequest`, sends it through an injected `Transport`, and returns
//! either a decoded DTO or a typed `AuthError`.
//!
//! # Design
//! - All outcomes pass through `response::classify`: 422 with field errors
//!   becomes `AuthError::Validation`, any other failure `AuthError::Api`.
//! - DTOs (`User`, `Role`, `Token`) decode from loose JSON with
//!   `from_payload`, failing with a `DecodingError` that names the field.
//! - Configuration (`ClientConfig`) is fixed at construction; the client has
//!   no mutable state.
//! - `UreqTransport` is the default transport. Tests inject stubs.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod types;

pub use client::AuthClient;
pub use config::{AuthMode, ClientConfig, ConfigError, ResponseEnvelope};
pub use error::{AuthError, DecodingError, DecodingErrorKind, FieldErrors, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{NewRole, Page, ProfileUpdate, RegisterUser, Role, RoleUpdate, Token, User};
