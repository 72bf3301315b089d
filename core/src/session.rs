//! Login, logout and the session-token lifecycle.
//!
//! # Design
//! The session manager is the only writer of the session-token header. Its
//! state is an explicit [`SessionState`] rather than "is the header set?",
//! so a second login while one is in flight is rejected instead of racing.
//!
//! Two rules keep the header and the state in step:
//! - every transition updates the state and the header under one lock;
//! - logout and the start and end of every login bump an epoch; a login or
//!   refresh that was in flight when the epoch changed discards its result
//!   instead of touching the token.
//!
//! Logout clears local state synchronously, before notifying the service,
//! so the caller's intent holds even if that notification fails or the
//! future is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::config::AnonymousSessionPolicy;
use crate::error::ApiError;
use crate::headers::SESSION_TOKEN_HEADER;
use crate::http::{HttpMethod, HttpResponse};
use crate::model::{LoginRequest, Session};
use crate::request::{decode_one, decode_unit, Context, PendingRequest};
use crate::serializer::ContentSerializer;

const USER_SESSION_PATH: &str = "user/session";
const ADMIN_SESSION_PATH: &str = "system/admin/session";

/// Authentication state of a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

/// Discriminant of [`SessionState`] without the session payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Default)]
struct Inner {
    state: SessionState,
    epoch: u64,
}

/// Drives the login/logout state machine for one client.
#[derive(Debug)]
pub struct SessionManager {
    context: Arc<Context>,
    policy: AnonymousSessionPolicy,
    inner: Mutex<Inner>,
}

impl SessionManager {
    pub(crate) fn new(context: Arc<Context>, policy: AnonymousSessionPolicy) -> Self {
        Self {
            context,
            policy,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self.lock().state {
            SessionState::Anonymous => SessionStatus::Anonymous,
            SessionState::Authenticating => SessionStatus::Authenticating,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// The session from the last successful login or refresh.
    pub fn session(&self) -> Option<Session> {
        match &self.lock().state {
            SessionState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Log in as a user. `duration_minutes`, when given, must be positive.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Session, ApiError> {
        self.authenticate(USER_SESSION_PATH, email, password, duration_minutes)
            .await
    }

    /// Log in as a system administrator.
    pub async fn login_admin(
        &self,
        email: &str,
        password: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Session, ApiError> {
        self.authenticate(ADMIN_SESSION_PATH, email, password, duration_minutes)
            .await
    }

    /// Forget the session locally, then tell the service on a best-effort
    /// basis. Returns whether the service acknowledged the logout.
    pub async fn logout(&self) -> bool {
        let notify = self.context.headers.contains(SESSION_TOKEN_HEADER).then(|| {
            let url = self.context.address.resolve(USER_SESSION_PATH, &[]);
            let request = self.context.http_request(HttpMethod::Delete, url, None);
            PendingRequest::new(Arc::clone(&self.context), request, decode_unit)
        });

        {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.state = SessionState::Anonymous;
            self.context.headers.remove(SESSION_TOKEN_HEADER);
        }
        info!("session cleared");

        let Some(pending) = notify else {
            return false;
        };
        match pending.send().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "logout notification failed; local session already cleared");
                false
            }
        }
    }

    /// Fetch the current session from the service.
    ///
    /// While anonymous this fails with [`ApiError::NotAuthenticated`] unless
    /// the client was configured with [`AnonymousSessionPolicy::Refresh`].
    pub async fn current_session(&self) -> Result<Session, ApiError> {
        let (epoch, was_authenticated) = {
            let inner = self.lock();
            let authenticated = matches!(inner.state, SessionState::Authenticated(_));
            if !authenticated && self.policy == AnonymousSessionPolicy::Fail {
                return Err(ApiError::NotAuthenticated);
            }
            (inner.epoch, authenticated)
        };

        let url = self.context.address.resolve(USER_SESSION_PATH, &[]);
        let request = self.context.http_request(HttpMethod::Get, url, None);
        let result = PendingRequest::new(Arc::clone(&self.context), request, decode_session)
            .send()
            .await;

        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state == SessionState::Authenticating {
            debug!("session refresh overtaken by a login or logout; result not applied");
            return result;
        }
        match &result {
            Ok(session) => {
                self.context.headers.set(SESSION_TOKEN_HEADER, session.token());
                inner.state = SessionState::Authenticated(session.clone());
                debug!("session refreshed");
            }
            Err(ApiError::NotAuthenticated) if was_authenticated => {
                inner.state = SessionState::Anonymous;
                self.context.headers.remove(SESSION_TOKEN_HEADER);
                info!("session expired upstream");
            }
            Err(_) => {}
        }
        result
    }

    async fn authenticate(
        &self,
        path: &'static str,
        email: &str,
        password: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Session, ApiError> {
        if email.trim().is_empty() {
            return Err(ApiError::invalid_argument("email is required"));
        }
        if password.is_empty() {
            return Err(ApiError::invalid_argument("password is required"));
        }
        if let Some(minutes) = duration_minutes.filter(|m| *m <= 0) {
            return Err(ApiError::invalid_argument(format!(
                "session duration must be positive, got {minutes}"
            )));
        }

        let epoch = self.begin_login()?;
        let mut guard = LoginGuard {
            manager: self,
            epoch,
            armed: true,
        };

        let body = self.context.encode(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            duration: duration_minutes,
        })?;
        let url = self.context.address.resolve(path, &[]);
        let request = self.context.http_request(HttpMethod::Post, url, Some(body));
        let result = PendingRequest::new(Arc::clone(&self.context), request, decode_one::<Session>)
            .send()
            .await;

        guard.armed = false;
        self.finish_login(epoch, result)
    }

    fn begin_login(&self) -> Result<u64, ApiError> {
        let mut inner = self.lock();
        if inner.state == SessionState::Authenticating {
            return Err(ApiError::InvalidState("a login is already in progress".to_string()));
        }
        inner.epoch += 1;
        inner.state = SessionState::Authenticating;
        Ok(inner.epoch)
    }

    fn finish_login(&self, epoch: u64, result: Result<Session, ApiError>) -> Result<Session, ApiError> {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(ApiError::InvalidState(
                "login was superseded by a logout".to_string(),
            ));
        }
        inner.epoch += 1;
        match result {
            Ok(session) => {
                self.context.headers.set(SESSION_TOKEN_HEADER, session.token());
                inner.state = SessionState::Authenticated(session.clone());
                info!(user_id = ?session.id, is_sys_admin = session.is_sys_admin, "logged in");
                Ok(session)
            }
            Err(err) => {
                inner.state = SessionState::Anonymous;
                self.context.headers.remove(SESSION_TOKEN_HEADER);
                info!(error = %err, "login failed");
                Err(err)
            }
        }
    }

    fn abandon_login(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch == epoch && inner.state == SessionState::Authenticating {
            inner.state = SessionState::Anonymous;
            self.context.headers.remove(SESSION_TOKEN_HEADER);
            debug!("login abandoned before completion");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the manager to `Anonymous` if a login future is dropped mid-flight.
struct LoginGuard<'a> {
    manager: &'a SessionManager,
    epoch: u64,
    armed: bool,
}

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.manager.abandon_login(self.epoch);
        }
    }
}

fn decode_session(serializer: &dyn ContentSerializer, response: HttpResponse) -> Result<Session, ApiError> {
    if response.status == 401 {
        return Err(ApiError::NotAuthenticated);
    }
    decode_one(serializer, response)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    use super::*;
    use crate::address::{ApiVersion, EndpointAddress};
    use crate::error::TransportError;
    use crate::headers::{HeaderBag, HeaderState};
    use crate::http::HttpRequest;
    use crate::serializer::JsonContentSerializer;
    use crate::transport::Transport;

    const SESSION: &str = r#"{"session_id":"abc","id":1,"email":"dream@factory.com"}"#;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Connection("connection refused".to_string()))
        }
    }

    /// Answers with a session once opened; never answers otherwise.
    #[derive(Clone, Default)]
    struct Gate {
        open: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for Gate {
        async fn send(&self, _: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.open.notified().await;
            Ok(HttpResponse::new(200, SESSION))
        }
    }

    /// Logs in at once. Holds session lookups until released, then reports
    /// the session as expired.
    #[derive(Clone, Default)]
    struct ExpiringLookup {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Transport for ExpiringLookup {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            match request.method {
                HttpMethod::Get => {
                    self.release.notified().await;
                    Ok(HttpResponse::new(
                        401,
                        r#"{"error":{"code":401,"message":"Token has expired."}}"#,
                    ))
                }
                _ => Ok(HttpResponse::new(200, SESSION)),
            }
        }
    }

    fn manager(transport: impl Transport + 'static) -> SessionManager {
        let context = Arc::new(Context {
            address: EndpointAddress::new("http://localhost", ApiVersion::V2).unwrap(),
            headers: HeaderState::new(HeaderBag::new()),
            serializer: Arc::new(JsonContentSerializer),
            transport: Arc::new(transport),
        });
        SessionManager::new(context, AnonymousSessionPolicy::Fail)
    }

    #[tokio::test]
    #[traced_test]
    async fn logout_clears_local_state_when_the_service_is_unreachable() {
        let manager = manager(Unreachable);
        manager.context.headers.set(SESSION_TOKEN_HEADER, "abc");
        manager.lock().state = SessionState::Authenticated(serde_json::from_str(SESSION).unwrap());

        assert!(!manager.logout().await);

        assert_eq!(manager.status(), SessionStatus::Anonymous);
        assert!(!manager.context.headers.contains(SESSION_TOKEN_HEADER));
        assert!(logs_contain("logout notification failed"));
    }

    #[tokio::test]
    async fn dropped_login_returns_to_anonymous() {
        let manager = manager(Gate::default());

        let attempt = tokio::time::timeout(
            Duration::from_millis(20),
            manager.login("dream@factory.com", "dreamfactory", None),
        )
        .await;

        assert!(attempt.is_err());
        assert_eq!(manager.status(), SessionStatus::Anonymous);
        assert!(!manager.context.headers.contains(SESSION_TOKEN_HEADER));
    }

    #[tokio::test]
    async fn logout_supersedes_a_login_in_flight() {
        let gate = Gate::default();
        let manager = manager(gate.clone());

        let (login, acknowledged) = tokio::join!(
            manager.login("dream@factory.com", "dreamfactory", None),
            async {
                tokio::task::yield_now().await;
                assert_eq!(manager.status(), SessionStatus::Authenticating);
                let acknowledged = manager.logout().await;
                gate.open.notify_one();
                acknowledged
            }
        );

        assert!(matches!(login, Err(ApiError::InvalidState(_))));
        assert!(!acknowledged);
        assert_eq!(manager.status(), SessionStatus::Anonymous);
        assert!(!manager.context.headers.contains(SESSION_TOKEN_HEADER));
    }

    #[tokio::test]
    async fn second_login_while_one_is_in_flight_is_rejected() {
        let gate = Gate::default();
        let manager = manager(gate.clone());

        let (first, second) = tokio::join!(
            manager.login("dream@factory.com", "dreamfactory", None),
            async {
                tokio::task::yield_now().await;
                let second = manager.login_admin("dream@factory.com", "dreamfactory", None).await;
                gate.open.notify_one();
                second
            }
        );

        assert!(matches!(second, Err(ApiError::InvalidState(ref m)) if m.contains("already in progress")));
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.unwrap().token(), "abc");
        assert_eq!(manager.status(), SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn stale_refresh_does_not_undo_a_newer_login() {
        let transport = ExpiringLookup::default();
        let manager = manager(transport.clone());
        manager.login("dream@factory.com", "dreamfactory", None).await.unwrap();

        let (refresh, relogin) = tokio::join!(manager.current_session(), async {
            tokio::task::yield_now().await;
            let relogin = manager.login("dream@factory.com", "dreamfactory", None).await;
            transport.release.notify_one();
            relogin
        });

        assert!(matches!(refresh, Err(ApiError::NotAuthenticated)));
        assert!(relogin.is_ok());
        assert_eq!(manager.status(), SessionStatus::Authenticated);
        assert_eq!(manager.context.headers.get(SESSION_TOKEN_HEADER).as_deref(), Some("abc"));
    }
}
