use serde::{Deserialize, Serialize};

/// System-wide settings (`system/config`), a singleton rather than a
/// collection. Unset fields are left untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_open_registration: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_reg_role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_reg_email_service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_reg_email_template_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_email_service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_email_template_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_email_service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_email_template_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_role_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_profile_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_verbs: Option<Vec<String>>,
}
