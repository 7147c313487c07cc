use axum::{http::StatusCode, response::Response, routing::get, Router};

use crate::context::{ReqContext, RequestTimer};
use crate::models::RoleType;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/ping", get(admin_ping))
}

/// Reachable by org admins only
pub async fn admin_ping(mut ctx: ReqContext) -> Response {
    ctx.time_request(RequestTimer::start("api.admin.ping"));

    if !ctx.has_user_role(RoleType::Admin) {
        return ctx.json_api_err(StatusCode::FORBIDDEN, "Permission denied", None);
    }

    ctx.json_ok("pong")
}
