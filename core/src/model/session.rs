use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated session returned by a successful login.
///
/// `session_id` is a secret and is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    /// Newer servers send the token separately; it equals `session_id`
    /// when both are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_sys_admin: bool,
    #[serde(default)]
    pub last_login_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_id: Option<i64>,
}

impl Session {
    /// Value to send in the session-token header.
    pub fn token(&self) -> &str {
        self.session_token.as_deref().unwrap_or(&self.session_id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &"<redacted>")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("is_sys_admin", &self.is_sys_admin)
            .field("role_id", &self.role_id)
            .finish_non_exhaustive()
    }
}

/// Body of a login request.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Session lifetime in minutes; the server default applies when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("duration", &self.duration)
            .finish()
    }
}

/// Body of a password change for the current user.
#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// Body of a password reset request.
#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub email: String,
}

/// Outcome of a password change or reset request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResponse {
    /// Security question, returned on reset when no email confirmation is
    /// configured.
    #[serde(default)]
    pub security_question: Option<String>,
    /// True when the password was updated or a reset email was sent.
    #[serde(default)]
    pub success: Option<bool>,
}
