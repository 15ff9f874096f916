use chrono::{Duration, NaiveDateTime, Utc};
use serde_json::Value;

use super::payload::{self, payload_serde, Object};
use super::user::User;
use crate::error::DecodingError;

/// Session credential issued by `login` and `refresh_token`.
///
/// The server may embed the authenticated user; when it does not, `user` is
/// `None`. `created_at` is the issue time used for expiry computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, relative to `created_at`.
    pub expires_in: Option<u64>,
    pub created_at: Option<NaiveDateTime>,
    pub user: Option<User>,
}

impl Token {
    pub fn from_payload(raw: &Value) -> Result<Self, DecodingError> {
        let obj = payload::as_object(raw, "token")?;
        let user = match obj.get("user").filter(|v| !v.is_null()) {
            Some(u) => Some(User::from_payload(u).map_err(|e| DecodingError::nested("user", e))?),
            None => None,
        };
        Ok(Self {
            access_token: payload::required_str(obj, "access_token")?,
            token_type: payload::required_str(obj, "token_type")?,
            refresh_token: payload::optional_str(obj, "refresh_token")?,
            expires_in: payload::optional_u64(obj, "expires_in")?,
            created_at: payload::optional_timestamp(obj, "created_at")?,
            user,
        })
    }

    pub fn to_payload(&self) -> Value {
        let mut obj = Object::new();
        obj.insert("access_token".into(), Value::String(self.access_token.clone()));
        obj.insert("token_type".into(), Value::String(self.token_type.clone()));
        payload::put_opt_str(&mut obj, "refresh_token", &self.refresh_token);
        if let Some(secs) = self.expires_in {
            obj.insert("expires_in".into(), Value::from(secs));
        }
        payload::put_opt_timestamp(&mut obj, "created_at", &self.created_at);
        if let Some(user) = &self.user {
            obj.insert("user".into(), user.to_payload());
        }
        Value::Object(obj)
    }

    /// Value for the `Authorization` header, e.g. `Bearer abc123`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// `created_at + expires_in`, when both are known.
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        let created = self.created_at?;
        let secs = i64::try_from(self.expires_in?).ok()?;
        created.checked_add_signed(Duration::try_seconds(secs)?)
    }

    /// A token whose expiry cannot be computed counts as expired.
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        match self.expires_at() {
            Some(expiry) => now >= expiry,
            None => true,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().naive_utc())
    }
}

payload_serde!(Token);
