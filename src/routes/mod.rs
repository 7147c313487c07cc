pub mod admin;
pub mod health;
pub mod user;

use axum::{http::StatusCode, middleware, response::Response, Router};

use crate::context::ReqContext;
use crate::middleware::{context::populate_context, telemetry::record_request_timer};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(user::router())
        .merge(admin::router())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), populate_context))
        .layer(middleware::from_fn(record_request_timer))
        .with_state(state)
}

/// JSON 404 under `/api`, error page elsewhere
pub async fn not_found(mut ctx: ReqContext) -> Response {
    if ctx.is_api_request() {
        ctx.json_api_err(StatusCode::NOT_FOUND, "", None)
    } else {
        ctx.handle(StatusCode::NOT_FOUND, "Page not found", None)
    }
}
