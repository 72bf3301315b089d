//! Operations on the calling user's own account.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::model::{PasswordChange, PasswordReset, PasswordResponse};
use crate::request::{decode_one, Context, PendingRequest};
use crate::session::SessionManager;

const PASSWORD_PATH: &str = "user/password";

/// Self-service user endpoints under `user/`.
#[derive(Debug, Clone)]
pub struct UserApi {
    context: Arc<Context>,
    session: Arc<SessionManager>,
}

impl UserApi {
    pub(crate) fn new(context: Arc<Context>, session: Arc<SessionManager>) -> Self {
        Self { context, session }
    }

    /// Change the password of the logged-in user.
    pub fn build_change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<PendingRequest<PasswordResponse>, ApiError> {
        if old_password.is_empty() || new_password.is_empty() {
            return Err(ApiError::invalid_argument("old and new passwords are required"));
        }
        if !self.session.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let body = self.context.encode(&PasswordChange {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        let url = self.context.address.resolve(PASSWORD_PATH, &[]);
        let request = self.context.http_request(HttpMethod::Post, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_one::<PasswordResponse>,
        ))
    }

    /// Ask the service to start a password reset for `email`.
    pub fn build_request_password_reset(&self, email: &str) -> Result<PendingRequest<PasswordResponse>, ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::invalid_argument("email is required"));
        }
        let body = self.context.encode(&PasswordReset {
            email: email.to_string(),
        })?;
        let url = self
            .context
            .address
            .resolve_with_query(PASSWORD_PATH, &[], &[("reset", "true".to_string())]);
        let request = self.context.http_request(HttpMethod::Post, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_one::<PasswordResponse>,
        ))
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<PasswordResponse, ApiError> {
        self.build_change_password(old_password, new_password)?.send().await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<PasswordResponse, ApiError> {
        self.build_request_password_reset(email)?.send().await
    }
}
