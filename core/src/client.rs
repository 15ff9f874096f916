//! Typed client for the auth API.
//!
//! # Design
//! `AuthClient` holds an immutable `ClientConfig`, the static header set
//! derived from it, and an injected `Transport`. Each operation builds an
//! `HttpRequest` and hands it to one of a few private helpers (`send`,
//! `fetch`, `fetch_one`, `fetch_list`) that all go through `dispatch`, so
//! the error mapping in `response::classify` and the envelope handling are
//! shared by every endpoint. There is no mutable state, so a client can be
//! shared across threads when its transport can.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AuthError, DecodingError, Result};
use crate::http::{encode_path_segment as seg, HttpMethod, HttpRequest, HttpResponse};
use crate::response::{self, classify, decode_list, decode_permissions};
use crate::transport::{Transport, UreqTransport};
use crate::types::{NewRole, Page, ProfileUpdate, RegisterUser, Role, RoleUpdate, Token, User};

#[derive(Debug, Clone)]
pub struct AuthClient<T = UreqTransport> {
    config: ClientConfig,
    headers: Vec<(String, String)>,
    transport: T,
}

impl AuthClient<UreqTransport> {
    /// Build a client with the default `ureq` transport bound to
    /// `config.base_url`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config.base_url, config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> AuthClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let headers = config.default_headers();
        Self {
            config,
            headers,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn login(&self, email: &str, password: &str) -> Result<Token> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/login")
            .with_json(&json!({ "email": email, "password": password }));
        self.fetch_one(req, Token::from_payload)
    }

    /// Create an account. The created record is returned as sent by the
    /// server, without decoding it into a `User`.
    pub fn register(&self, input: &RegisterUser) -> Result<Value> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/register")
            .with_json(&to_body(input)?);
        self.fetch(req)
    }

    pub fn refresh_token(&self, refresh_token: &str) -> Result<Token> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/refresh")
            .with_json(&json!({ "refresh_token": refresh_token }));
        self.fetch_one(req, Token::from_payload)
    }

    /// Fetch the authenticated user. `bearer` replaces the configured
    /// `Authorization` header for this call only.
    pub fn get_current_user(&self, bearer: Option<&str>) -> Result<User> {
        let mut req = self.request(HttpMethod::Get, "/api/auth/me");
        if let Some(token) = bearer {
            req = req.with_header("Authorization", format!("Bearer {token}"));
        }
        self.fetch_one(req, User::from_payload)
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let req = self
            .request(HttpMethod::Patch, "/api/auth/profile")
            .with_json(&to_body(update)?);
        self.fetch_one(req, User::from_payload)
    }

    pub fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let req = self.request(HttpMethod::Post, "/api/auth/password").with_json(&json!({
            "current_password": current_password,
            "new_password": new_password,
        }));
        self.send(req)
    }

    pub fn request_password_reset(&self, email: &str) -> Result<()> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/password/reset")
            .with_json(&json!({ "email": email }));
        self.send(req)
    }

    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/password/reset/confirm")
            .with_json(&json!({ "token": token, "password": new_password }));
        self.send(req)
    }

    pub fn verify_email(&self, token: &str) -> Result<()> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/email/verify")
            .with_json(&json!({ "token": token }));
        self.send(req)
    }

    pub fn resend_verification(&self) -> Result<()> {
        self.send(self.request(HttpMethod::Post, "/api/auth/email/verification"))
    }

    pub fn logout(&self) -> Result<()> {
        self.send(self.request(HttpMethod::Post, "/api/auth/logout"))
    }

    // -----------------------------------------------------------------------
    // Roles and permissions
    // -----------------------------------------------------------------------

    pub fn list_roles(&self, page: Page) -> Result<Vec<Role>> {
        let req = self
            .request(HttpMethod::Get, "/api/auth/roles")
            .with_query("page", page.page)
            .with_query("per_page", page.per_page);
        self.fetch_list(req, Role::from_payload)
    }

    /// Every role, unpaginated.
    pub fn list_all_roles(&self) -> Result<Vec<Role>> {
        self.fetch_list(self.request(HttpMethod::Get, "/api/roles"), Role::from_payload)
    }

    pub fn get_role(&self, role_id: &str) -> Result<Role> {
        let req = self.request(HttpMethod::Get, format!("/api/auth/roles/{}", seg(role_id)));
        self.fetch_one(req, Role::from_payload)
    }

    pub fn create_role(&self, input: &NewRole) -> Result<Role> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/roles")
            .with_json(&to_body(input)?);
        self.fetch_one(req, Role::from_payload)
    }

    pub fn update_role(&self, role_id: &str, update: &RoleUpdate) -> Result<Role> {
        let req = self
            .request(HttpMethod::Patch, format!("/api/auth/roles/{}", seg(role_id)))
            .with_json(&to_body(update)?);
        self.fetch_one(req, Role::from_payload)
    }

    pub fn delete_role(&self, role_id: &str) -> Result<()> {
        self.send(self.request(HttpMethod::Delete, format!("/api/auth/roles/{}", seg(role_id))))
    }

    pub fn list_permissions(&self) -> Result<Vec<String>> {
        let payload = self.fetch(self.request(HttpMethod::Get, "/api/auth/permissions"))?;
        Ok(decode_permissions(&payload, self.config.envelope.field())?)
    }

    pub fn list_user_roles(&self, user_id: &str) -> Result<Vec<Role>> {
        let req = self.request(HttpMethod::Get, format!("/api/auth/users/{}/roles", seg(user_id)));
        self.fetch_list(req, Role::from_payload)
    }

    /// Grant a role and return the updated user.
    pub fn assign_role(&self, user_id: &str, role_id: &str) -> Result<User> {
        let req = self
            .request(HttpMethod::Post, format!("/api/users/{}/roles", seg(user_id)))
            .with_json(&json!({ "role_id": role_id }));
        self.fetch_one(req, User::from_payload)
    }

    /// Revoke a role and return the user's remaining roles.
    pub fn remove_role(&self, user_id: &str, role_id: &str) -> Result<Vec<Role>> {
        let req = self.request(
            HttpMethod::Delete,
            format!("/api/users/{}/roles/{}", seg(user_id), seg(role_id)),
        );
        self.fetch_list(req, Role::from_payload)
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.fetch_list(self.request(HttpMethod::Get, "/api/users"), User::from_payload)
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<User> {
        let req = self.request(HttpMethod::Get, format!("/api/users/{}", seg(user_id)));
        self.fetch_one(req, User::from_payload)
    }

    /// Look a user up by email. A 404, or a success body without a payload,
    /// means there is no such user and yields `Ok(None)`.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let req = self.request(HttpMethod::Get, format!("/api/auth/users/email/{}", seg(email)));
        let response = match self.dispatch(req) {
            Ok(response) => response,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        match self.config.envelope.open(response::json_body(&response)?) {
            Some(payload) => Ok(Some(User::from_payload(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn create_user(&self, input: &RegisterUser) -> Result<User> {
        let req = self
            .request(HttpMethod::Post, "/api/auth/users")
            .with_json(&to_body(input)?);
        self.fetch_one(req, User::from_payload)
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, path: impl Into<String>) -> HttpRequest {
        let mut req = HttpRequest::new(method, path);
        req.headers = self.headers.clone();
        req
    }

    fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, path = %request.path, "dispatching request");
        let response = classify(self.transport.send(&request))?;
        debug!(status = response.status, path = %request.path, "request succeeded");
        Ok(response)
    }

    /// Dispatch and discard the body.
    fn send(&self, request: HttpRequest) -> Result<()> {
        self.dispatch(request).map(|_| ())
    }

    /// Dispatch and return the payload with the envelope removed.
    fn fetch(&self, request: HttpRequest) -> Result<Value> {
        let response = self.dispatch(request)?;
        let body = response::json_body(&response)?;
        Ok(self.config.envelope.unwrap(body)?)
    }

    fn fetch_one<D>(
        &self,
        request: HttpRequest,
        decode: fn(&Value) -> std::result::Result<D, DecodingError>,
    ) -> Result<D> {
        let payload = self.fetch(request)?;
        Ok(decode(&payload)?)
    }

    fn fetch_list<D>(
        &self,
        request: HttpRequest,
        decode: fn(&Value) -> std::result::Result<D, DecodingError>,
    ) -> Result<Vec<D>> {
        let payload = self.fetch(request)?;
        Ok(decode_list(&payload, self.config.envelope.field(), decode)?)
    }
}

fn to_body<S: Serialize>(input: &S) -> Result<Value> {
    serde_json::to_value(input)
        .map_err(|e| AuthError::api_with_source("failed to serialize request body", None, e))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::config::{AuthMode, ResponseEnvelope};
    use crate::transport::TransportError;

    /// Replays queued outcomes and records every request it receives.
    #[derive(Default)]
    struct StubTransport {
        outcomes: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl StubTransport {
        fn respond(self, status: u16, body: Value) -> Self {
            self.outcomes
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse::new(status, body.to_string())));
            self
        }

        fn fail(self, message: &str) -> Self {
            self.outcomes
                .lock()
                .unwrap()
                .push_back(Err(TransportError::new(message)));
            self
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for StubTransport {
        fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::new("no stubbed response")))
        }
    }

    fn client(stub: StubTransport) -> AuthClient<StubTransport> {
        let config = ClientConfig::new("http://auth.test", AuthMode::StoreToken("store-1".into()));
        AuthClient::with_transport(config, stub)
    }

    fn role_json(id: &str, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "display_name": name.to_uppercase(),
            "description": "",
            "permissions": ["users.read", "users.write"],
            "is_system": true,
            "created_at": "2024-01-01 00:00:00",
            "updated_at": "2024-01-01 00:00:00"
        })
    }

    fn user_json(id: &str) -> Value {
        json!({
            "id": id,
            "email": "ada@example.com",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "roles": [role_json("1", "admin")]
        })
    }

    #[test]
    fn get_role_decodes_enveloped_role() {
        let c = client(StubTransport::default().respond(200, json!({ "data": role_json("1", "admin") })));
        let role = c.get_role("1").unwrap();
        assert_eq!(role.id, "1");
        assert_eq!(role.permissions, vec!["users.read", "users.write"]);
        assert!(role.has_permission("users.write"));
        assert!(!role.has_permission("users.delete"));

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/api/auth/roles/1");
        assert!(req.body.is_none());
    }

    #[test]
    fn static_headers_on_every_request() {
        let c = client(StubTransport::default().respond(204, Value::Null));
        c.logout().unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.header("X-Store-Token"), Some("store-1"));
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn current_user_overrides_authorization_for_one_call() {
        let stub = StubTransport::default()
            .respond(200, json!({ "data": user_json("9") }))
            .respond(200, json!({ "data": user_json("9") }));
        let config = ClientConfig::new(
            "http://auth.test",
            AuthMode::ApiKey { api_key: "key".into(), store_id: "s1".into() },
        );
        let c = AuthClient::with_transport(config, stub);

        let user = c.get_current_user(Some("session-token")).unwrap();
        assert_eq!(user.id, "9");
        let req = c.transport().last_request();
        assert_eq!(req.header("Authorization"), Some("Bearer session-token"));
        assert_eq!(req.headers.iter().filter(|(n, _)| n == "Authorization").count(), 1);

        c.get_current_user(None).unwrap();
        assert_eq!(c.transport().last_request().header("Authorization"), Some("Bearer key"));
    }

    #[test]
    fn login_sends_credentials_and_decodes_token() {
        let c = client(StubTransport::default().respond(
            200,
            json!({ "data": {
                "access_token": "abc",
                "token_type": "Bearer",
                "refresh_token": "r",
                "expires_in": 3600,
                "user": user_json("1")
            }}),
        ));
        let token = c.login("ada@example.com", "secret").unwrap();
        assert_eq!(token.authorization_header(), "Bearer abc");
        assert_eq!(token.user.unwrap().email, "ada@example.com");

        let req = c.transport().last_request();
        assert_eq!(req.path, "/api/auth/login");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"email": "ada@example.com", "password": "secret"}));
    }

    #[test]
    fn register_validation_failure_keeps_field_map() {
        let c = client(StubTransport::default().respond(
            422,
            json!({"message": "Validation failed", "errors": {"email": ["already taken"]}}),
        ));
        let input = RegisterUser {
            email: "ada@example.com".into(),
            password: "secret".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone: None,
        };
        let err = c.register(&input).unwrap_err();
        assert!(matches!(err, AuthError::Validation { status: 422, .. }));
        assert_eq!(err.field_errors().unwrap()["email"], vec!["already taken"]);
        assert_eq!(c.transport().last_request().path, "/api/auth/register");
    }

    #[test]
    fn register_returns_raw_record() {
        let c = client(StubTransport::default().respond(201, json!({"data": {"id": 5, "extra": true}})));
        let input = RegisterUser {
            email: "a@b.c".into(),
            password: "p".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone: Some("1".into()),
        };
        assert_eq!(c.register(&input).unwrap(), json!({"id": 5, "extra": true}));
    }

    #[test]
    fn get_user_by_email_not_found_is_none() {
        let c = client(StubTransport::default().respond(404, json!({"message": "User not found"})));
        assert!(c.get_user_by_email("nobody@example.com").unwrap().is_none());
        assert_eq!(
            c.transport().last_request().path,
            "/api/auth/users/email/nobody@example.com"
        );
    }

    #[test]
    fn get_user_by_email_empty_data_is_none() {
        let c = client(StubTransport::default().respond(200, json!({"data": null})));
        assert!(c.get_user_by_email("a@example.com").unwrap().is_none());
    }

    #[test]
    fn get_user_by_email_found() {
        let c = client(StubTransport::default().respond(200, json!({"data": user_json("3")})));
        let user = c.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.id, "3");
        assert!(user.has_role("admin"));
    }

    #[test]
    fn get_user_by_email_server_error_propagates() {
        let c = client(StubTransport::default().respond(500, json!({"message": "boom"})));
        let err = c.get_user_by_email("a@example.com").unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn not_found_on_other_lookups_is_an_error() {
        let c = client(StubTransport::default().respond(404, json!({"message": "Role not found"})));
        let err = c.get_role("99").unwrap_err();
        assert!(matches!(err, AuthError::Api { status: Some(404), .. }));
        assert_eq!(err.to_string(), "Role not found");
    }

    #[test]
    fn transport_failure_becomes_api_failure() {
        let c = client(StubTransport::default().fail("connection reset"));
        let err = c.list_users().unwrap_err();
        assert!(matches!(err, AuthError::Api { status: None, .. }));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("connection reset"));
    }

    #[test]
    fn list_roles_sends_pagination_and_preserves_order() {
        let c = client(StubTransport::default().respond(
            200,
            json!({"data": [role_json("2", "editor"), role_json("1", "admin")]}),
        ));
        let roles = c.list_roles(Page { page: 2, per_page: 5 }).unwrap();
        assert_eq!(roles.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["2", "1"]);
        let req = c.transport().last_request();
        assert_eq!(
            req.query,
            vec![("page".to_string(), "2".to_string()), ("per_page".to_string(), "5".to_string())]
        );
    }

    #[test]
    fn list_with_bad_element_is_decoding_error() {
        let c = client(StubTransport::default().respond(200, json!({"data": [{"id": "1"}]})));
        let err = c.list_all_roles().unwrap_err();
        match err {
            AuthError::Decoding(e) => assert_eq!(e.field, "data"),
            other => panic!("expected Decoding, got {other:?}"),
        }
    }

    #[test]
    fn missing_envelope_is_decoding_error() {
        let c = client(StubTransport::default().respond(200, role_json("1", "admin")));
        let err = c.get_role("1").unwrap_err();
        assert!(matches!(err, AuthError::Decoding(ref e) if e.field == "data"));
    }

    #[test]
    fn bare_envelope_reads_body_directly() {
        let config = ClientConfig::new("http://auth.test", AuthMode::StoreToken("t".into()))
            .with_envelope(ResponseEnvelope::Bare);
        let c = AuthClient::with_transport(
            config,
            StubTransport::default().respond(200, role_json("4", "viewer")),
        );
        assert_eq!(c.get_role("4").unwrap().name, "viewer");
    }

    #[test]
    fn permissions_nested_object() {
        let c = client(StubTransport::default().respond(
            200,
            json!({"data": {"permissions": ["users.read", "roles.write"]}}),
        ));
        assert_eq!(c.list_permissions().unwrap(), vec!["users.read", "roles.write"]);
    }

    #[test]
    fn role_assignment_paths_and_shapes() {
        let c = client(
            StubTransport::default()
                .respond(200, json!({"data": user_json("7")}))
                .respond(200, json!({"data": []})),
        );
        let user = c.assign_role("7", "1").unwrap();
        assert_eq!(user.id, "7");
        let req = c.transport().last_request();
        assert_eq!(req.path, "/api/users/7/roles");
        assert_eq!(req.body.as_deref(), Some(r#"{"role_id":"1"}"#));

        let remaining = c.remove_role("7", "1").unwrap();
        assert!(remaining.is_empty());
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "/api/users/7/roles/1");
    }

    #[test]
    fn update_role_sends_partial_body() {
        let c = client(StubTransport::default().respond(200, json!({"data": role_json("1", "admin")})));
        let update = RoleUpdate {
            description: Some("Full access".into()),
            ..Default::default()
        };
        c.update_role("1", &update).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.body.as_deref(), Some(r#"{"description":"Full access"}"#));
    }

    #[test]
    fn void_operations_ignore_body() {
        let c = client(
            StubTransport::default()
                .respond(204, Value::Null)
                .respond(200, json!({"message": "sent"})),
        );
        c.change_password("old", "new").unwrap();
        let body: Value = serde_json::from_str(c.transport().last_request().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"current_password": "old", "new_password": "new"}));
        c.request_password_reset("ada@example.com").unwrap();
    }

    #[test]
    fn client_is_shareable_across_threads() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<AuthClient>();
        assert_send_sync::<AuthClient<std::sync::Arc<StubTransport>>>();
    }
}
