use chrono::NaiveDateTime;
use serde_json::Value;

use super::payload::{self, payload_serde, Object};
use crate::error::DecodingError;

/// An authorization unit grouping permission strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    /// Unique machine key, e.g. `admin`.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    /// Built-in roles cannot be deleted.
    pub is_system: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Role {
    pub fn from_payload(raw: &Value) -> Result<Self, DecodingError> {
        let obj = payload::as_object(raw, "role")?;
        Ok(Self {
            id: payload::required_id(obj, "id")?,
            name: payload::required_str(obj, "name")?,
            display_name: payload::required_str(obj, "display_name")?,
            description: payload::optional_str(obj, "description")?,
            permissions: payload::string_list(obj, "permissions")?,
            is_system: payload::optional_bool(obj, "is_system")?.unwrap_or(false),
            created_at: payload::optional_timestamp(obj, "created_at")?,
            updated_at: payload::optional_timestamp(obj, "updated_at")?,
        })
    }

    pub fn to_payload(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("id".into(), Value::String(self.id.clone()));
        obj.insert("name".into(), Value::String(self.name.clone()));
        obj.insert("display_name".into(), Value::String(self.display_name.clone()));
        payload::put_opt_str(&mut obj, "description", &self.description);
        obj.insert(
            "permissions".into(),
            Value::Array(self.permissions.iter().cloned().map(Value::String).collect()),
        );
        obj.insert("is_system".into(), Value::Bool(self.is_system));
        payload::put_opt_timestamp(&mut obj, "created_at", &self.created_at);
        payload::put_opt_timestamp(&mut obj, "updated_at", &self.updated_at);
        Value::Object(obj)
    }

    /// Exact, case-sensitive membership test.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

payload_serde!(Role);
