//! In-memory emulation of the remote auth API.
//!
//! Success bodies are wrapped as `{"data": ...}`, failures as
//! `{"message": ...}` plus an `errors` map for 422. Every route requires a
//! store credential (`X-Store-Token` or `X-Store-Id`); session routes also
//! require `Authorization: Bearer <access_token>`. User ids are emitted as
//! integers and role ids as strings, as the real API versions disagree.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const PERMISSIONS: &[&str] = &[
    "users.read",
    "users.write",
    "users.delete",
    "roles.read",
    "roles.write",
];

const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
struct Account {
    id: u64,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    avatar: Option<String>,
    language: Option<String>,
    timezone: Option<String>,
    preferences: Option<Value>,
    role_ids: Vec<String>,
    email_verified: bool,
    last_login_at: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Default)]
struct Store {
    next_user_id: u64,
    next_role_id: u64,
    accounts: BTreeMap<u64, Account>,
    roles: BTreeMap<String, Role>,
    sessions: HashMap<String, u64>,
    refresh_tokens: HashMap<String, u64>,
    reset_tokens: HashMap<String, u64>,
    verification_tokens: HashMap<String, u64>,
}

/// Shared handle on the mock's data. Cloning shares the same store, which
/// lets tests read tokens the server would normally deliver out of band.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<RwLock<Store>>,
}

impl MockState {
    pub fn new() -> Self {
        let mut store = Store {
            next_user_id: 1,
            next_role_id: 1,
            ..Default::default()
        };
        let all = PERMISSIONS.iter().map(|p| p.to_string()).collect();
        store.insert_role("admin", "Administrator", all, true);
        store.insert_role("member", "Member", vec!["users.read".to_string()], true);
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Most recent password-reset token issued for `email`. Blocking; call
    /// from outside the server's runtime.
    pub fn pending_reset_token(&self, email: &str) -> Option<String> {
        let store = self.inner.blocking_read();
        let id = store.account_by_email(email)?.id;
        store
            .reset_tokens
            .iter()
            .find(|(_, owner)| **owner == id)
            .map(|(token, _)| token.clone())
    }

    /// Pending email-verification token for `email`. Blocking.
    pub fn pending_verification_token(&self, email: &str) -> Option<String> {
        let store = self.inner.blocking_read();
        let id = store.account_by_email(email)?.id;
        store
            .verification_tokens
            .iter()
            .find(|(_, owner)| **owner == id)
            .map(|(token, _)| token.clone())
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    fn insert_role(
        &mut self,
        name: &str,
        display_name: &str,
        permissions: Vec<String>,
        is_system: bool,
    ) -> Role {
        let now = now();
        let role = Role {
            id: self.next_role_id.to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: String::new(),
            permissions,
            is_system,
            created_at: now.clone(),
            updated_at: now,
        };
        self.next_role_id += 1;
        self.roles.insert(role.id.clone(), role.clone());
        role
    }

    fn account_by_email(&self, email: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.email == email)
    }

    fn role_named(&self, name: &str) -> Option<&Role> {
        self.roles.values().find(|r| r.name == name)
    }

    fn roles_of(&self, account: &Account) -> Vec<Role> {
        account
            .role_ids
            .iter()
            .filter_map(|id| self.roles.get(id).cloned())
            .collect()
    }

    fn user_json(&self, account: &Account) -> Value {
        let mut user = json!({
            "id": account.id,
            "email": account.email,
            "first_name": account.first_name,
            "last_name": account.last_name,
            "status": "active",
            "roles": self.roles_of(account),
            "email_verified": account.email_verified,
            "two_factor_enabled": false,
            "created_at": account.created_at,
            "updated_at": account.updated_at,
        });
        let optional = [
            ("phone", account.phone.clone().map(Value::String)),
            ("avatar", account.avatar.clone().map(Value::String)),
            ("language", account.language.clone().map(Value::String)),
            ("timezone", account.timezone.clone().map(Value::String)),
            ("preferences", account.preferences.clone()),
            ("last_login_at", account.last_login_at.clone().map(Value::String)),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                user[key] = v;
            }
        }
        user
    }

    fn issue_token(&mut self, user_id: u64) -> Value {
        let access = Uuid::new_v4().simple().to_string();
        let refresh = Uuid::new_v4().simple().to_string();
        self.sessions.insert(access.clone(), user_id);
        self.refresh_tokens.insert(refresh.clone(), user_id);
        let user = self.accounts.get(&user_id).map(|a| self.user_json(a));
        json!({
            "access_token": access,
            "token_type": "Bearer",
            "refresh_token": refresh,
            "expires_in": TOKEN_TTL_SECS,
            "created_at": now(),
            "user": user,
        })
    }

    fn create_account(&mut self, input: NewAccount) -> Result<u64, ApiError> {
        input.validate(self)?;
        let now = now();
        let id = self.next_user_id;
        self.next_user_id += 1;
        let role_ids = self.role_named("member").map(|r| vec![r.id.clone()]).unwrap_or_default();
        self.accounts.insert(
            id,
            Account {
                id,
                email: input.email,
                password: input.password,
                first_name: input.first_name,
                last_name: input.last_name,
                phone: input.phone,
                avatar: None,
                language: None,
                timezone: None,
                preferences: None,
                role_ids,
                email_verified: false,
                last_login_at: None,
                created_at: now.clone(),
                updated_at: now,
            },
        );
        self.verification_tokens.insert(Uuid::new_v4().simple().to_string(), id);
        Ok(id)
    }
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            errors: None,
        }
    }

    fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthenticated.")
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, &format!("{what} not found"))
    }

    fn validation(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Validation failed".to_string(),
            errors: Some(errors),
        }
    }

    fn field(field: &str, message: &str) -> Self {
        Self::validation(BTreeMap::from([(field.to_string(), vec![message.to_string()])]))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.errors {
            Some(errors) => json!({ "message": self.message, "errors": errors }),
            None => json!({ "message": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn data(value: impl Serialize) -> Json<Value> {
    Json(json!({ "data": value }))
}

fn require_store(headers: &HeaderMap) -> ApiResult<()> {
    let present = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| !v.is_empty())
    };
    if present("x-store-token") || present("x-store-id") {
        Ok(())
    } else {
        Err(ApiError::new(StatusCode::UNAUTHORIZED, "Missing store credentials"))
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn session_user(store: &Store, headers: &HeaderMap) -> ApiResult<u64> {
    require_store(headers)?;
    bearer(headers)
        .and_then(|token| store.sessions.get(token).copied())
        .ok_or_else(ApiError::unauthenticated)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
}

impl NewAccount {
    fn validate(&self, store: &Store) -> ApiResult<()> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut add = |field: &str, msg: &str| errors.entry(field.to_string()).or_default().push(msg.to_string());
        if !self.email.contains('@') {
            add("email", "must be a valid email address");
        } else if store.account_by_email(&self.email).is_some() {
            add("email", "already taken");
        }
        if self.password.len() < 8 {
            add("password", "must be at least 8 characters");
        }
        if self.first_name.trim().is_empty() {
            add("first_name", "is required");
        }
        if self.last_name.trim().is_empty() {
            add("last_name", "is required");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub preferences: Option<Value>,
}

#[derive(Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct EmailOnly {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirm {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct TokenOnly {
    pub token: String,
}

#[derive(Deserialize)]
pub struct NewRole {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize)]
pub struct RoleUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct AssignRole {
    pub role_id: String,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn app() -> Router {
    app_with_state(MockState::new())
}

pub fn app_with_state(state: MockState) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/me", get(me))
        .route("/api/auth/profile", patch(update_profile))
        .route("/api/auth/password", post(change_password))
        .route("/api/auth/password/reset", post(request_reset))
        .route("/api/auth/password/reset/confirm", post(confirm_reset))
        .route("/api/auth/email/verify", post(verify_email))
        .route("/api/auth/email/verification", post(resend_verification))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/roles", get(list_roles).post(create_role))
        .route("/api/auth/roles/{id}", get(get_role).patch(update_role).delete(delete_role))
        .route("/api/roles", get(all_roles))
        .route("/api/auth/permissions", get(permissions))
        .route("/api/auth/users", post(create_user))
        .route("/api/auth/users/email/{email}", get(user_by_email))
        .route("/api/auth/users/{id}/roles", get(user_roles))
        .route("/api/users", get(list_users))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/roles", post(assign_role))
        .route("/api/users/{id}/roles/{role_id}", delete(remove_role))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, MockState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock auth server listening");
    axum::serve(listener, app_with_state(state)).await
}

// ---------------------------------------------------------------------------
// Session handlers
// ---------------------------------------------------------------------------

async fn login(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<Credentials>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store
        .account_by_email(&input.email)
        .filter(|a| a.password == input.password)
        .map(|a| a.id)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    if let Some(account) = store.accounts.get_mut(&id) {
        account.last_login_at = Some(now());
    }
    Ok(data(store.issue_token(id)))
}

async fn register(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store.create_account(input)?;
    let user = store.user_json(&store.accounts[&id]);
    Ok((StatusCode::CREATED, data(user)))
}

async fn refresh(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store
        .refresh_tokens
        .remove(&input.refresh_token)
        .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;
    Ok(data(store.issue_token(id)))
}

async fn me(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let store = state.inner.read().await;
    let id = session_user(&store, &headers)?;
    Ok(data(store.user_json(&store.accounts[&id])))
}

async fn update_profile(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let mut store = state.inner.write().await;
    let id = session_user(&store, &headers)?;
    let account = store.accounts.get_mut(&id).ok_or_else(|| ApiError::not_found("User"))?;
    let fields = [
        (&mut account.first_name, input.first_name),
        (&mut account.last_name, input.last_name),
    ];
    for (slot, value) in fields {
        if let Some(v) = value {
            *slot = v;
        }
    }
    let optional = [
        (&mut account.phone, input.phone),
        (&mut account.avatar, input.avatar),
        (&mut account.language, input.language),
        (&mut account.timezone, input.timezone),
    ];
    for (slot, value) in optional {
        if value.is_some() {
            *slot = value;
        }
    }
    if input.preferences.is_some() {
        account.preferences = input.preferences;
    }
    account.updated_at = now();
    Ok(data(store.user_json(&store.accounts[&id])))
}

async fn change_password(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<PasswordChange>,
) -> ApiResult<StatusCode> {
    let mut store = state.inner.write().await;
    let id = session_user(&store, &headers)?;
    let account = store.accounts.get_mut(&id).ok_or_else(|| ApiError::not_found("User"))?;
    if account.password != input.current_password {
        return Err(ApiError::field("current_password", "is incorrect"));
    }
    if input.new_password.len() < 8 {
        return Err(ApiError::field("new_password", "must be at least 8 characters"));
    }
    account.password = input.new_password;
    Ok(StatusCode::NO_CONTENT)
}

async fn request_reset(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<EmailOnly>,
) -> ApiResult<StatusCode> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    // Unknown emails get the same response so accounts cannot be probed.
    if let Some(id) = store.account_by_email(&input.email).map(|a| a.id) {
        store.reset_tokens.retain(|_, owner| *owner != id);
        store.reset_tokens.insert(Uuid::new_v4().simple().to_string(), id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn confirm_reset(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<ResetConfirm>,
) -> ApiResult<StatusCode> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store
        .reset_tokens
        .remove(&input.token)
        .ok_or_else(|| ApiError::field("token", "is invalid or expired"))?;
    if input.password.len() < 8 {
        return Err(ApiError::field("password", "must be at least 8 characters"));
    }
    if let Some(account) = store.accounts.get_mut(&id) {
        account.password = input.password;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn verify_email(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<TokenOnly>,
) -> ApiResult<StatusCode> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store
        .verification_tokens
        .remove(&input.token)
        .ok_or_else(|| ApiError::field("token", "is invalid or expired"))?;
    if let Some(account) = store.accounts.get_mut(&id) {
        account.email_verified = true;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn resend_verification(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let mut store = state.inner.write().await;
    let id = session_user(&store, &headers)?;
    store.verification_tokens.retain(|_, owner| *owner != id);
    store.verification_tokens.insert(Uuid::new_v4().simple().to_string(), id);
    Ok(StatusCode::NO_CONTENT)
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<StatusCode> {
    let mut store = state.inner.write().await;
    session_user(&store, &headers)?;
    if let Some(token) = bearer(&headers) {
        store.sessions.remove(token);
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Role handlers
// ---------------------------------------------------------------------------

async fn list_roles(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let per_page = page.per_page.unwrap_or(20).max(1);
    let skip = page.page.unwrap_or(1).saturating_sub(1) * per_page;
    let store = state.inner.read().await;
    let roles: Vec<&Role> = store.roles.values().skip(skip).take(per_page).collect();
    Ok(data(roles))
}

async fn all_roles(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    Ok(data(store.roles.values().collect::<Vec<_>>()))
}

async fn get_role(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    store.roles.get(&id).map(data).ok_or_else(|| ApiError::not_found("Role"))
}

async fn create_role(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<NewRole>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    if input.name.trim().is_empty() {
        return Err(ApiError::field("name", "is required"));
    }
    if store.role_named(&input.name).is_some() {
        return Err(ApiError::field("name", "already taken"));
    }
    if let Some(unknown) = input.permissions.iter().find(|p| !PERMISSIONS.contains(&p.as_str())) {
        return Err(ApiError::field("permissions", &format!("unknown permission {unknown}")));
    }
    let mut role = store.insert_role(&input.name, &input.display_name, input.permissions, false);
    role.description = input.description;
    store.roles.insert(role.id.clone(), role.clone());
    Ok((StatusCode::CREATED, data(role)))
}

async fn update_role(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<RoleUpdate>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let role = store.roles.get_mut(&id).ok_or_else(|| ApiError::not_found("Role"))?;
    if let Some(name) = input.name {
        role.name = name;
    }
    if let Some(display_name) = input.display_name {
        role.display_name = display_name;
    }
    if let Some(description) = input.description {
        role.description = description;
    }
    if let Some(permissions) = input.permissions {
        role.permissions = permissions;
    }
    role.updated_at = now();
    Ok(data(role.clone()))
}

async fn delete_role(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> ApiResult<StatusCode> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let role = store.roles.get(&id).ok_or_else(|| ApiError::not_found("Role"))?;
    if role.is_system {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "System roles cannot be deleted"));
    }
    store.roles.remove(&id);
    for account in store.accounts.values_mut() {
        account.role_ids.retain(|r| *r != id);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn permissions(headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    Ok(data(json!({ "permissions": PERMISSIONS })))
}

// ---------------------------------------------------------------------------
// User handlers
// ---------------------------------------------------------------------------

async fn list_users(State(state): State<MockState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    Ok(data(store.accounts.values().map(|a| store.user_json(a)).collect::<Vec<_>>()))
}

async fn get_user(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    let account = store.accounts.get(&id).ok_or_else(|| ApiError::not_found("User"))?;
    Ok(data(store.user_json(account)))
}

async fn user_by_email(State(state): State<MockState>, headers: HeaderMap, Path(email): Path<String>) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    let account = store.account_by_email(&email).ok_or_else(|| ApiError::not_found("User"))?;
    Ok(data(store.user_json(account)))
}

async fn create_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(input): Json<NewAccount>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let id = store.create_account(input)?;
    let user = store.user_json(&store.accounts[&id]);
    Ok((StatusCode::CREATED, data(user)))
}

async fn user_roles(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<u64>) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let store = state.inner.read().await;
    let account = store.accounts.get(&id).ok_or_else(|| ApiError::not_found("User"))?;
    Ok(data(store.roles_of(account)))
}

async fn assign_role(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<AssignRole>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    if !store.roles.contains_key(&input.role_id) {
        return Err(ApiError::field("role_id", "does not exist"));
    }
    let account = store.accounts.get_mut(&id).ok_or_else(|| ApiError::not_found("User"))?;
    if !account.role_ids.contains(&input.role_id) {
        account.role_ids.push(input.role_id);
    }
    Ok(data(store.user_json(&store.accounts[&id])))
}

async fn remove_role(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((id, role_id)): Path<(u64, String)>,
) -> ApiResult<Json<Value>> {
    require_store(&headers)?;
    let mut store = state.inner.write().await;
    let account = store.accounts.get_mut(&id).ok_or_else(|| ApiError::not_found("User"))?;
    account.role_ids.retain(|r| *r != role_id);
    Ok(data(store.roles_of(&store.accounts[&id])))
}
