use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use super::payload::{self, payload_serde, Object};
use super::role::Role;
use crate::error::DecodingError;

/// Snapshot of an account as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub status: Option<String>,
    pub roles: Vec<Role>,
    pub avatar: Option<String>,
    pub language: Option<String>,
    pub timezone: Option<String>,
    pub preferences: Option<Map<String, Value>>,
    pub email_verified: bool,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl User {
    pub fn from_payload(raw: &Value) -> Result<Self, DecodingError> {
        let obj = payload::as_object(raw, "user")?;
        Ok(Self {
            id: payload::required_id(obj, "id")?,
            email: payload::required_str(obj, "email")?,
            first_name: payload::required_str(obj, "first_name")?,
            last_name: payload::required_str(obj, "last_name")?,
            phone: payload::optional_str(obj, "phone")?,
            status: payload::optional_str(obj, "status")?,
            roles: payload::entity_list(obj, "roles", Role::from_payload)?,
            avatar: payload::optional_str(obj, "avatar")?,
            language: payload::optional_str(obj, "language")?,
            timezone: payload::optional_str(obj, "timezone")?,
            preferences: payload::optional_object(obj, "preferences")?,
            email_verified: payload::optional_bool(obj, "email_verified")?.unwrap_or(false),
            two_factor_enabled: payload::optional_bool(obj, "two_factor_enabled")?.unwrap_or(false),
            last_login_at: payload::optional_timestamp(obj, "last_login_at")?,
            created_at: payload::optional_timestamp(obj, "created_at")?,
            updated_at: payload::optional_timestamp(obj, "updated_at")?,
        })
    }

    pub fn to_payload(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("id".into(), Value::String(self.id.clone()));
        obj.insert("email".into(), Value::String(self.email.clone()));
        obj.insert("first_name".into(), Value::String(self.first_name.clone()));
        obj.insert("last_name".into(), Value::String(self.last_name.clone()));
        payload::put_opt_str(&mut obj, "phone", &self.phone);
        payload::put_opt_str(&mut obj, "status", &self.status);
        obj.insert(
            "roles".into(),
            Value::Array(self.roles.iter().map(Role::to_payload).collect()),
        );
        payload::put_opt_str(&mut obj, "avatar", &self.avatar);
        payload::put_opt_str(&mut obj, "language", &self.language);
        payload::put_opt_str(&mut obj, "timezone", &self.timezone);
        if let Some(prefs) = &self.preferences {
            obj.insert("preferences".into(), Value::Object(prefs.clone()));
        }
        obj.insert("email_verified".into(), Value::Bool(self.email_verified));
        obj.insert("two_factor_enabled".into(), Value::Bool(self.two_factor_enabled));
        payload::put_opt_timestamp(&mut obj, "last_login_at", &self.last_login_at);
        payload::put_opt_timestamp(&mut obj, "created_at", &self.created_at);
        payload::put_opt_timestamp(&mut obj, "updated_at", &self.updated_at);
        Value::Object(obj)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// True iff one of the user's roles has exactly this `name`.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// True iff any of the user's roles grants `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles.iter().any(|r| r.has_permission(permission))
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }
}

payload_serde!(User);
