//! Resource families and their wire DTOs.
//!
//! # Design
//! Each family is a zero-sized marker implementing [`Resource`], declared in
//! the table at the bottom of this file. Request DTOs have an optional
//! identifier (absent on create, required on update) and skip unset fields
//! so PATCH bodies only carry what the caller changed. Response DTOs always
//! carry the identifier; every other field is optional because field
//! selection and id-only echoes leave them out.

mod app;
mod config;
mod cors;
mod email_template;
mod event_script;
mod lookup;
mod role;
mod service;
mod session;
mod user;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::{Capabilities, Resource};

pub use app::{AppRequest, AppResponse};
pub use config::SystemConfig;
pub use cors::{CorsRequest, CorsResponse};
pub use email_template::{EmailTemplateRequest, EmailTemplateResponse};
pub use event_script::{EventScriptRequest, EventScriptResponse};
pub use lookup::{LookupRequest, LookupResponse};
pub use role::{RoleRequest, RoleResponse};
pub use service::{ServiceRequest, ServiceResponse};
pub use session::{LoginRequest, PasswordChange, PasswordReset, PasswordResponse, Session};
pub use user::{UserRequest, UserResponse};

/// Creation and modification stamps shared by every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_id: Option<i64>,
    #[serde(default)]
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_by_id: Option<i64>,
}

/// A named mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn named(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }
}

/// Declares a family marker and its [`Resource`] impl.
macro_rules! resource_family {
    (
        $(#[$attr:meta])*
        $marker:ident {
            name: $name:literal,
            path: $path:literal,
            id: $id:ty => $id_field:ident,
            request: $request:ty,
            response: $response:ty,
            capabilities: $caps:expr $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $marker;

        impl Resource for $marker {
            const NAME: &'static str = $name;
            const PATH: &'static str = $path;
            const ID_FIELD: &'static str = stringify!($id_field);
            const CAPABILITIES: Capabilities = $caps;

            type Id = $id;
            type Request = $request;
            type Response = $response;

            fn request_id(request: &$request) -> Option<&$id> {
                request.$id_field.as_ref()
            }
        }
    };
}

resource_family! {
    /// Applications (`system/app`).
    Apps {
        name: "app",
        path: "system/app",
        id: i64 => id,
        request: AppRequest,
        response: AppResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Users managed by administrators (`system/user`).
    Users {
        name: "user",
        path: "system/user",
        id: i64 => id,
        request: UserRequest,
        response: UserResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Roles (`system/role`).
    Roles {
        name: "role",
        path: "system/role",
        id: i64 => id,
        request: RoleRequest,
        response: RoleResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Services (`system/service`).
    Services {
        name: "service",
        path: "system/service",
        id: i64 => id,
        request: ServiceRequest,
        response: ServiceResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Email templates (`system/email_template`).
    EmailTemplates {
        name: "email template",
        path: "system/email_template",
        id: i64 => id,
        request: EmailTemplateRequest,
        response: EmailTemplateResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// CORS rules (`system/cors`).
    CorsRules {
        name: "CORS rule",
        path: "system/cors",
        id: i64 => id,
        request: CorsRequest,
        response: CorsResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Global lookups (`system/lookup`).
    Lookups {
        name: "lookup",
        path: "system/lookup",
        id: i64 => id,
        request: LookupRequest,
        response: LookupResponse,
        capabilities: Capabilities::ALL,
    }
}

resource_family! {
    /// Event scripts (`system/event_script`), keyed by event name.
    EventScripts {
        name: "event script",
        path: "system/event_script",
        id: String => name,
        request: EventScriptRequest,
        response: EventScriptResponse,
        capabilities: Capabilities::IDS_ONLY,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::serializer::{ContentSerializer, JsonContentSerializer};

    fn json() -> &'static dyn ContentSerializer {
        &JsonContentSerializer
    }

    #[test]
    fn families_resolve_to_system_paths() {
        assert_eq!(Apps::PATH, "system/app");
        assert_eq!(Users::PATH, "system/user");
        assert_eq!(EventScripts::PATH, "system/event_script");
        assert_eq!(EventScripts::ID_FIELD, "name");
        assert_eq!(Lookups::ID_FIELD, "id");
        assert!(!EventScripts::CAPABILITIES.delete_by_filter);
        assert!(Roles::CAPABILITIES.update_by_filter);
    }

    #[test]
    fn request_ids_come_from_the_configured_field() {
        let mut role = RoleRequest::new("Readers");
        assert_eq!(Roles::request_id(&role), None);
        role.id = Some(3);
        assert_eq!(Roles::request_id(&role), Some(&3));

        let script = EventScriptRequest::new("user.session.post.post_process", "v8js", "return;");
        assert_eq!(
            EventScripts::request_id(&script).map(String::as_str),
            Some("user.session.post.post_process")
        );
    }

    #[test]
    fn user_response_round_trips_with_nulls_and_timestamps() {
        let user = UserResponse {
            id: 1,
            email: Some("dream@factory.com".to_string()),
            first_name: None,
            last_name: Some("Smirnov".to_string()),
            display_name: Some("Andrei Smirnov".to_string()),
            phone: None,
            is_active: Some(true),
            is_sys_admin: Some(false),
            default_app_id: None,
            role_id: Some(2),
            last_login_date: Some(Utc.with_ymd_and_hms(2015, 6, 1, 8, 30, 0).unwrap()),
            audit: AuditInfo {
                created_date: Some(Utc.with_ymd_and_hms(2015, 1, 2, 3, 4, 5).unwrap()),
                created_by_id: None,
                last_modified_date: None,
                last_modified_by_id: Some(1),
            },
        };

        let bytes = json().encode(&user).unwrap();
        let back: UserResponse = json().decode(&bytes).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn email_template_response_round_trips() {
        let template = EmailTemplateResponse {
            id: 5,
            name: Some("Welcome".to_string()),
            description: None,
            to: Some(vec![EmailAddress::named("Jane", "jane@example.com")]),
            cc: Some(vec![]),
            bcc: None,
            subject: Some("Hello {first_name}".to_string()),
            body_text: None,
            body_html: Some("<p>Hi</p>".to_string()),
            from: Some(EmailAddress::new("noreply@example.com")),
            reply_to: None,
            defaults: Some(vec!["first_name".to_string()]),
            audit: AuditInfo::default(),
        };

        let bytes = json().encode(&template).unwrap();
        let back: EmailTemplateResponse = json().decode(&bytes).unwrap();
        assert_eq!(back, template);
        assert_eq!(back.cc, Some(vec![]));
    }

    #[test]
    fn update_requests_only_carry_set_fields() {
        let patch = AppRequest {
            id: Some(1),
            is_active: Some(false),
            ..AppRequest::default()
        };
        let body: serde_json::Value = serde_json::from_slice(&json().encode(&patch).unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"id": 1, "is_active": false}));
    }
}
