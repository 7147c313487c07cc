use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_sessions::cookie::Cookie;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use reqctx::config::{Config, Environment};
use reqctx::context::RequestTimer;
use reqctx::db::users::{self, NewUser};
use reqctx::db::{self, user_auth_tokens, DbPool};
use reqctx::models::{HelpFlags1, RoleType};
use reqctx::{routes, templates, AppState};

async fn test_state(config: Config) -> AppState {
    let pool = db::init_db("sqlite::memory:").await.unwrap();
    let tera = templates::builtin(&config.error_template).unwrap();
    AppState::new(config, pool, tera)
}

fn test_config() -> Config {
    Config {
        env: Environment::Test,
        ..Config::default()
    }
}

async fn create_user(pool: &DbPool, login: &str, role: RoleType) -> (i64, String) {
    let user_id = users::create_user(
        pool,
        &NewUser {
            org_id: 1,
            org_name: "Main Org.".to_string(),
            org_role: role,
            login: login.to_string(),
            name: login.to_string(),
            email: format!("{}@example.com", login),
            is_admin: false,
        },
    )
    .await
    .unwrap();

    let token = user_auth_tokens::create_token(pool, user_id, "127.0.0.1", "tests")
        .await
        .unwrap();
    (user_id, token.unhashed_token)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

fn app(state: &AppState) -> Router {
    routes::create_router(state.clone())
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = test_state(test_config()).await;

    let response = app(&state).oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let state = test_state(test_config()).await;

    let response = app(&state).oneshot(get("/api/does-not-exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
}

#[tokio::test]
async fn test_unknown_page_renders_error_template() {
    let state = test_state(test_config()).await;

    let response = app(&state).oneshot(get("/nowhere")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let body = body_string(response).await;
    assert!(body.contains("Page not found"));
    assert!(body.contains("theme-dark"));
}

#[tokio::test]
async fn test_current_user_requires_sign_in() {
    let state = test_state(test_config()).await;

    let response = app(&state).oneshot(get("/api/user")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"message": "Unauthorized"}));
}

#[tokio::test]
async fn test_bearer_token_signs_in_and_marks_seen() {
    let state = test_state(test_config()).await;
    let (user_id, token) = create_user(&state.db, "editor", RoleType::Editor).await;

    let response = app(&state)
        .oneshot(authed("GET", "/api/user", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let timer = response.extensions().get::<RequestTimer>().unwrap();
    assert_eq!(timer.handler(), "api.user.get");
    let body = body_json(response).await;
    assert_eq!(body["userId"], user_id);
    assert_eq!(body["login"], "editor");
    assert_eq!(body["orgRole"], "Editor");
    assert_eq!(body["isSignedIn"], true);

    let stored = user_auth_tokens::lookup_token(&state.db, &token)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.auth_token_seen);
    assert!(stored.seen_at > 0);
}

#[tokio::test]
async fn test_login_cookie_signs_in() {
    let state = test_state(test_config()).await;
    let (_, token) = create_user(&state.db, "viewer", RoleType::Viewer).await;

    let request = Request::builder()
        .uri("/api/user")
        .header(header::COOKIE, format!("reqctx_session={}", token))
        .body(Body::empty())
        .unwrap();
    let response = app(&state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["login"], "viewer");
}

#[tokio::test]
async fn test_unknown_token_rejected_on_api() {
    let state = test_state(test_config()).await;

    let response = app(&state)
        .oneshot(authed("GET", "/api/health", "bogus"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"message": "Unauthorized"}));
}

#[tokio::test]
async fn test_unknown_token_ignored_on_pages() {
    let state = test_state(test_config()).await;

    let response = app(&state)
        .oneshot(authed("GET", "/somewhere", "bogus"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_anonymous_access() {
    let config = Config {
        anonymous_enabled: true,
        anonymous_org_id: 4,
        ..test_config()
    };
    let state = test_state(config).await;

    let response = app(&state).oneshot(get("/api/user")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isSignedIn"], false);
    assert_eq!(body["isAnonymous"], true);
    assert_eq!(body["orgId"], 4);
    assert_eq!(body["orgRole"], "Viewer");
}

#[tokio::test]
async fn test_admin_ping_checks_role() {
    let state = test_state(test_config()).await;
    let (_, viewer) = create_user(&state.db, "viewer", RoleType::Viewer).await;
    let (_, admin) = create_user(&state.db, "admin", RoleType::Admin).await;

    let response = app(&state)
        .oneshot(authed("GET", "/api/admin/ping", &viewer))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await, json!({"message": "Permission denied"}));

    let response = app(&state)
        .oneshot(authed("GET", "/api/admin/ping", &admin))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"message": "pong"}));
}

#[tokio::test]
async fn test_set_and_clear_help_flags() {
    let state = test_state(test_config()).await;
    let (user_id, token) = create_user(&state.db, "editor", RoleType::Editor).await;

    let response = app(&state)
        .oneshot(authed("PUT", "/api/user/helpflags/1", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Help flag set", "helpFlags1": 1})
    );

    let user = users::find_signed_in_user(&state.db, user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(user.help_flags1.has_flag(HelpFlags1::GETTING_STARTED_PANEL_DISMISSED));

    let response = app(&state)
        .oneshot(authed("GET", "/api/user/helpflags/clear", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Help flags cleared", "helpFlags1": 0})
    );
}

#[tokio::test]
async fn test_invalid_help_flag_is_bad_request() {
    let state = test_state(test_config()).await;
    let (_, token) = create_user(&state.db, "editor", RoleType::Editor).await;

    let response = app(&state)
        .oneshot(authed("PUT", "/api/user/helpflags/abc", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"message": "Invalid help flag"}));
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let state = test_state(test_config()).await;
    let (_, token) = create_user(&state.db, "editor", RoleType::Editor).await;

    let response = app(&state)
        .oneshot(authed("POST", "/api/user/logout", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("reqctx_session=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(body_json(response).await, json!({"message": "Logged out"}));

    let response = app(&state)
        .oneshot(authed("GET", "/api/user", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_production_api_404() {
    let config = Config {
        env: Environment::Production,
        ..Config::default()
    };
    let state = test_state(config).await;

    let response = app(&state).oneshot(get("/api/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"message": "Not Found"}));
}

async fn remember(session: Session) -> StatusCode {
    match session.insert("dashboard", "home").await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn recall(session: Session) -> String {
    session
        .get::<String>("dashboard")
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "none".to_string())
}

/// Router as served by the binary, plus two routes that touch the session
fn app_with_sessions(state: &AppState) -> Router {
    routes::create_router(state.clone())
        .merge(
            Router::new()
                .route("/session/remember", routing::get(remember))
                .route("/session/recall", routing::get(recall)),
        )
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
}

#[tokio::test]
async fn test_logout_flushes_session() {
    let state = test_state(test_config()).await;
    let (_, token) = create_user(&state.db, "editor", RoleType::Editor).await;
    let app = app_with_sessions(&state);

    let response = app.clone().oneshot(get("/session/remember")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session_cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let recall_request = || {
        Request::builder()
            .uri("/session/recall")
            .header(header::COOKIE, session_cookie.as_str())
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(recall_request()).await.unwrap();
    assert_eq!(body_string(response).await, "home");

    let logout = Request::builder()
        .method("POST")
        .uri("/api/user/logout")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::COOKIE, session_cookie.as_str())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(logout).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("reqctx_session=;")));
    assert_eq!(body_json(response).await, json!({"message": "Logged out"}));

    let response = app.oneshot(recall_request()).await.unwrap();
    assert_eq!(body_string(response).await, "none");
}

#[tokio::test]
async fn test_rotated_token_overlaps_until_first_use() {
    let state = test_state(test_config()).await;
    let (_, old_token) = create_user(&state.db, "editor", RoleType::Editor).await;

    let response = app(&state)
        .oneshot(authed("POST", "/api/user/auth-tokens/rotate", &old_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    let cookie = Cookie::parse(set_cookie).unwrap();
    assert_eq!(cookie.name(), "reqctx_session");
    assert_eq!(cookie.http_only(), Some(true));
    let new_token = cookie.value().to_string();
    assert_ne!(new_token, old_token);
    assert_eq!(body_json(response).await, json!({"message": "Token rotated"}));

    // Old value still accepted while the new one is unseen
    let response = app(&state)
        .oneshot(authed("GET", "/api/user", &old_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(authed("GET", "/api/user", &new_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&state)
        .oneshot(authed("GET", "/api/user", &old_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rotate_requires_token() {
    let state = test_state(test_config()).await;

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/user/auth-tokens/rotate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
