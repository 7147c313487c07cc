//! Routes for the calling user

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use tower_sessions::cookie::{Cookie, SameSite};

use crate::config::Config;
use crate::context::{ReqContext, RequestTimer};
use crate::db::{user_auth_tokens, users};
use crate::models::{HelpFlags1, HelpFlagsResponse, UserResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user", get(get_current_user))
        .route("/api/user/helpflags/clear", get(clear_help_flags))
        .route("/api/user/helpflags/:flag", put(set_help_flag))
        .route("/api/user/auth-tokens/rotate", post(rotate_auth_token))
        .route("/api/user/logout", post(logout))
}

/// Current user; anonymous users are served when anonymous access is enabled
pub async fn get_current_user(mut ctx: ReqContext) -> Response {
    ctx.time_request(RequestTimer::start("api.user.get"));

    if !ctx.is_signed_in() && !ctx.flags.allow_anonymous {
        return ctx.json_api_err(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    }

    let body = UserResponse {
        user: ctx.user().clone(),
        is_signed_in: ctx.is_signed_in(),
    };
    ctx.json(StatusCode::OK, &body)
}

pub async fn set_help_flag(
    State(state): State<AppState>,
    Path(flag): Path<String>,
    mut ctx: ReqContext,
) -> Response {
    ctx.time_request(RequestTimer::start("api.user.helpflags.set"));

    if !ctx.is_signed_in() {
        return ctx.json_api_err(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    }

    let flag = match flag.parse::<u64>() {
        Ok(bits) if bits != 0 => HelpFlags1(bits),
        _ => return ctx.json_api_err(StatusCode::BAD_REQUEST, "Invalid help flag", None),
    };

    let mut flags = ctx.user().help_flags1;
    flags.add_flag(flag);
    store_help_flags(&state, ctx, flags, "Help flag set").await
}

pub async fn clear_help_flags(State(state): State<AppState>, mut ctx: ReqContext) -> Response {
    ctx.time_request(RequestTimer::start("api.user.helpflags.clear"));

    if !ctx.is_signed_in() {
        return ctx.json_api_err(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    }

    store_help_flags(&state, ctx, HelpFlags1::default(), "Help flags cleared").await
}

async fn store_help_flags(
    state: &AppState,
    mut ctx: ReqContext,
    flags: HelpFlags1,
    message: &str,
) -> Response {
    match users::set_help_flags(&state.db, ctx.user().user_id, flags).await {
        Ok(_) => ctx.json(
            StatusCode::OK,
            &HelpFlagsResponse {
                message: message.to_string(),
                help_flags1: flags,
            },
        ),
        Err(e) => ctx.json_api_err(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update help flag",
            Some(&e),
        ),
    }
}

/// Swap the request's token for a fresh one, delivered in the login cookie.
///
/// The old value keeps working until the new one is first used.
pub async fn rotate_auth_token(State(state): State<AppState>, mut ctx: ReqContext) -> Response {
    ctx.time_request(RequestTimer::start("api.user.authtokens.rotate"));

    let Some(mut token) = ctx.user_token().cloned() else {
        return ctx.json_api_err(StatusCode::UNAUTHORIZED, "Unauthorized", None);
    };

    let now = Utc::now().timestamp();
    if let Err(e) = user_auth_tokens::rotate_token(&state.db, &mut token, now).await {
        return ctx.json_api_err(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to rotate token",
            Some(&e),
        );
    }

    let cookie = login_cookie(&state.config, token.unhashed_token);
    let mut response = ctx.json_ok("Token rotated");
    append_cookie(&mut response, &cookie);
    response
}

/// Revoke the request's token, flush the session and expire the login cookie
pub async fn logout(State(state): State<AppState>, mut ctx: ReqContext) -> Response {
    if let Some(token_id) = ctx.user_token().map(|t| t.id) {
        if let Err(e) = user_auth_tokens::revoke_token(&state.db, token_id).await {
            return ctx.json_api_err(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to revoke session",
                Some(&e),
            );
        }
    }

    if let Some(session) = ctx.session.clone() {
        if let Err(e) = session.flush().await {
            return ctx.json_api_err(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to clear session",
                Some(&e),
            );
        }
    }

    let mut cookie = login_cookie(&state.config, String::new());
    cookie.make_removal();
    let mut response = ctx.json_ok("Logged out");
    append_cookie(&mut response, &cookie);
    response
}

fn login_cookie(config: &Config, value: String) -> Cookie<'static> {
    Cookie::build((config.login_cookie_name.clone(), value))
        .path(format!("{}/", config.app_sub_url))
        .http_only(true)
        .secure(config.env.is_production())
        .same_site(SameSite::Lax)
        .build()
}

fn append_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}
