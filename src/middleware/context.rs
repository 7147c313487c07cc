use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tower_sessions::cookie::Cookie;
use tracing::Instrument;

use crate::config::Config;
use crate::context::{Identity, ReqContext, RequestFlags, RequestScope};
use crate::db::{user_auth_tokens, users, DbPool};
use crate::models::SignedInUser;
use crate::state::AppState;

/// Header asking downstream handlers to bypass caches
pub const SKIP_CACHE_HEADER: &str = "X-NoCache";
/// Header sent by the image renderer on its callbacks
pub const RENDER_KEY_HEADER: &str = "X-Render-Key";

/// Middleware that resolves who is calling and stores a [`RequestScope`]
/// for the `ReqContext` extractor.
///
/// The session token is read from the login cookie, then from
/// `Authorization: Bearer`. Without a token the request is anonymous when
/// anonymous access is enabled, unsigned otherwise.
pub async fn populate_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        user_id = tracing::field::Empty,
    );

    let headers = request.headers();
    let presented = session_token(headers, &state.config.login_cookie_name);
    let mut flags = RequestFlags {
        is_render_call: false,
        allow_anonymous: state.config.anonymous_enabled,
        skip_cache: headers
            .get(SKIP_CACHE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
    };
    let has_render_key = headers.contains_key(RENDER_KEY_HEADER);

    let identity = match presented {
        Some(token) => match resolve_token(&state.db, &token).instrument(span.clone()).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                let scope = request_scope(&request_id, &span, unsigned(&state.config), flags);
                let mut ctx = ReqContext::new(request.uri().path(), scope, state.render_settings());
                if ctx.is_api_request() {
                    return ctx.json_api_err(StatusCode::UNAUTHORIZED, "Unauthorized", None);
                }
                span.in_scope(|| tracing::debug!("Ignoring unknown session token"));
                unsigned(&state.config)
            }
            Err(e) => {
                let scope = request_scope(&request_id, &span, Identity::default(), flags);
                let mut ctx = ReqContext::new(request.uri().path(), scope, state.render_settings());
                return if ctx.is_api_request() {
                    ctx.json_api_err(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to resolve session",
                        Some(&e),
                    )
                } else {
                    ctx.handle(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to resolve session",
                        Some(&e),
                    )
                };
            }
        },
        None => unsigned(&state.config),
    };

    flags.is_render_call = identity.is_signed_in && has_render_key;
    if identity.is_signed_in {
        span.record("user_id", identity.user.user_id);
    }

    request
        .extensions_mut()
        .insert(request_scope(&request_id, &span, identity, flags));

    next.run(request).instrument(span).await
}

fn request_scope(
    request_id: &str,
    span: &tracing::Span,
    identity: Identity,
    flags: RequestFlags,
) -> RequestScope {
    RequestScope {
        request_id: request_id.to_string(),
        span: span.clone(),
        identity: Arc::new(identity),
        flags,
    }
}

/// Identity for a request without valid credentials
fn unsigned(config: &Config) -> Identity {
    if config.anonymous_enabled {
        Identity {
            user: SignedInUser::anonymous(
                config.anonymous_org_id,
                &config.anonymous_org_name,
                config.anonymous_org_role,
            ),
            user_token: None,
            is_signed_in: false,
        }
    } else {
        Identity::default()
    }
}

/// Look up the presented token and its user, recording the first use of a fresh token
async fn resolve_token(db: &DbPool, presented: &str) -> Result<Option<Identity>, sqlx::Error> {
    let Some(mut token) = user_auth_tokens::lookup_token(db, presented).await? else {
        return Ok(None);
    };

    let Some(user) = users::find_signed_in_user(db, token.user_id).await? else {
        tracing::warn!(token_id = token.id, "Session token references a missing user");
        return Ok(None);
    };

    if token.needs_seen_update(presented) {
        let now = Utc::now().timestamp();
        if user_auth_tokens::mark_seen(db, &mut token, now).await? {
            users::update_last_seen(db, user.user_id, now).await?;
        }
    }

    Ok(Some(Identity {
        user,
        user_token: Some(Arc::new(token)),
        is_signed_in: true,
    }))
}

/// Token from the login cookie, falling back to a bearer token
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(|c| c.ok())
        .find(|c| c.name() == cookie_name)
        .map(|c| c.value().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}
