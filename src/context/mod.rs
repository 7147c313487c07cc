//! Per-request context handed to handlers.
//!
//! `ReqContext` is composed from three separately owned pieces: an immutable
//! [`Identity`] shared through an `Arc`, the request flags, and a mutable
//! [`Responder`] that builds the response. The deployment environment reaches
//! the responder through [`RenderSettings`] at construction time.

pub mod response;
pub mod timer;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::Response,
};
use serde::Serialize;
use tower_sessions::Session;

use crate::models::{HelpFlags1, RoleType, SignedInUser, UserAuthToken};
use crate::state::AppState;

pub use response::{api_error_body, RenderSettings, Responder, ResponseData, PERFMON_TIMER_KEY};
pub use timer::RequestTimer;

/// Who is making the request
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user: SignedInUser,
    /// Token the request authenticated with; owned by the token store
    pub user_token: Option<Arc<UserAuthToken>>,
    pub is_signed_in: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFlags {
    pub is_render_call: bool,
    pub allow_anonymous: bool,
    pub skip_cache: bool,
}

/// Request-scoped values resolved by the context middleware
#[derive(Debug, Clone)]
pub struct RequestScope {
    pub request_id: String,
    pub span: tracing::Span,
    pub identity: Arc<Identity>,
    pub flags: RequestFlags,
}

pub struct ReqContext {
    pub request_id: String,
    pub path: String,
    pub identity: Arc<Identity>,
    pub flags: RequestFlags,
    pub session: Option<Session>,
    pub resp: Responder,
    /// Logger bound to this request
    pub span: tracing::Span,
}

impl ReqContext {
    pub fn new(path: impl Into<String>, scope: RequestScope, settings: RenderSettings) -> Self {
        Self {
            request_id: scope.request_id,
            path: path.into(),
            identity: scope.identity,
            flags: scope.flags,
            session: None,
            resp: Responder::new(settings),
            span: scope.span,
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn user(&self) -> &SignedInUser {
        &self.identity.user
    }

    pub fn user_token(&self) -> Option<&UserAuthToken> {
        self.identity.user_token.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_signed_in
    }

    /// Log `err` (if any) and render the error page at `status`.
    ///
    /// The error text is exposed to the page as `ErrorMsg` outside production.
    pub fn handle(
        &mut self,
        status: StatusCode,
        title: &str,
        err: Option<&dyn std::error::Error>,
    ) -> Response {
        let error = err.map(|e| {
            self.span.in_scope(|| tracing::error!(error = %e, "{}", title));
            e.to_string()
        });
        self.resp.error_page(status, title, error)
    }

    pub fn json_ok(&mut self, message: &str) -> Response {
        self.resp
            .json(StatusCode::OK, &serde_json::json!({ "message": message }))
    }

    pub fn json<T: Serialize>(&mut self, status: StatusCode, body: &T) -> Response {
        self.resp.json(status, body)
    }

    pub fn is_api_request(&self) -> bool {
        self.path.starts_with("/api")
    }

    /// Log `err` (if any) and answer with the JSON error envelope
    pub fn json_api_err(
        &mut self,
        status: StatusCode,
        message: &str,
        err: Option<&dyn std::error::Error>,
    ) -> Response {
        let error = err.map(|e| {
            self.span.in_scope(|| tracing::error!(error = %e, "{}", message));
            e.to_string()
        });
        self.resp.json_api_err(status, message, error)
    }

    pub fn has_user_role(&self, role: RoleType) -> bool {
        self.identity.user.org_role.includes(role)
    }

    pub fn has_help_flag(&self, flag: HelpFlags1) -> bool {
        self.identity.user.help_flags1.has_flag(flag)
    }

    /// Park `timer` in the response data; the response carries it to telemetry
    pub fn time_request(&mut self, timer: RequestTimer) {
        self.resp.data.insert_handle(PERFMON_TIMER_KEY, timer);
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ReqContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        // Without the context middleware the request is anonymous and unsigned
        let scope = match parts.extensions.get::<RequestScope>() {
            Some(scope) => scope.clone(),
            None => RequestScope {
                request_id: uuid::Uuid::new_v4().to_string(),
                span: tracing::Span::current(),
                identity: Arc::new(Identity::default()),
                flags: RequestFlags::default(),
            },
        };

        let ctx = ReqContext::new(parts.uri.path(), scope, app.render_settings());
        Ok(match parts.extensions.get::<Session>() {
            Some(session) => ctx.with_session(session.clone()),
            None => ctx,
        })
    }
}
