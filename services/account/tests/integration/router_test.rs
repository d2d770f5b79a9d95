//! Router-level checks for paths that are decided before any storage access.
//! The database handle is disconnected; touching it would surface as a 500.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;

use accord_account::infra::external_auth::ProviderRegistry;
use accord_account::router::build_router;
use accord_account::state::AppState;
use accord_session::claims::{self, SessionKind};
use accord_session::cookie::{CookieSettings, SESSION_COOKIE, TWO_FACTOR_COOKIE};

const TEST_SESSION_SECRET: &str = "router-test-session-secret";

const PROVIDERS: &str = r#"[
    {"type": "http", "id": "sso", "name": "SSO", "url": "http://127.0.0.1:1/verify",
     "reset_password_url": "https://sso.example/reset"}
]"#;

fn app() -> axum::Router {
    build_router(AppState {
        db: DatabaseConnection::default(),
        providers: Arc::new(ProviderRegistry::from_json(PROVIDERS).unwrap()),
        session_secret: TEST_SESSION_SECRET.to_owned(),
        totp_issuer: "Accord".to_owned(),
        cookies: CookieSettings::default(),
    })
}

async fn send(req: Request<Body>) -> Response {
    app().oneshot(req).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn json_of(resp: Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookies(resp: &Response) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok().map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn should_answer_liveness_but_not_readiness() {
    assert_eq!(send(get("/healthz")).await.status(), StatusCode::OK);
    assert_eq!(
        send(get("/readyz")).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn should_require_login_for_profile() {
    let resp = send(get("/account/me")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(json_of(resp).await["kind"], "LOGIN_REQUIRED");
}

#[tokio::test]
async fn should_expire_invalid_session_cookie() {
    let req = Request::get("/account/me")
        .header(COOKIE, format!("{SESSION_COOKIE}=not-a-jwt"))
        .body(Body::empty())
        .unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let cookies = set_cookies(&resp);
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with(&format!("{SESSION_COOKIE}=;")) && c.contains("Max-Age=0")),
        "expected session cookie to be cleared, got {cookies:?}"
    );
}

#[tokio::test]
async fn should_not_accept_two_factor_session_as_login() {
    let (token, _) = claims::issue(1, SessionKind::TwoFactor, 60, TEST_SESSION_SECRET).unwrap();
    let req = Request::get("/account/me")
        .header(COOKIE, format!("{SESSION_COOKIE}={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(!set_cookies(&resp).is_empty());
}

#[tokio::test]
async fn should_report_no_principal_on_whoami() {
    let resp = send(get("/account/whoami")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn should_require_access_token_for_oauth_profile() {
    let resp = send(get("/oauth/me")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(resp).await["kind"], "OAUTH_TOKEN_REQUIRED");
}

#[tokio::test]
async fn should_require_pending_two_factor_session() {
    let req = Request::post("/account/two-factor/login")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"token":"123456"}"#))
        .unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(resp).await["kind"], "TWO_FACTOR_SESSION_REQUIRED");

    // A login session is not a two-factor session.
    let (token, _) = claims::issue(1, SessionKind::Login, 60, TEST_SESSION_SECRET).unwrap();
    let req = Request::post("/account/two-factor/login")
        .header("content-type", "application/json")
        .header(COOKIE, format!("{TWO_FACTOR_COOKIE}={token}"))
        .body(Body::from(r#"{"token":"123456"}"#))
        .unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_require_login_for_admin_routes() {
    for uri in [
        "/admin/users",
        "/admin/groups",
        "/admin/groups/1",
        "/admin/groups/1/members",
        "/admin/clients",
    ] {
        let resp = send(get(uri)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let req = Request::post("/admin/users/1/reconfirm-email")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_list_configured_providers_without_secrets() {
    let resp = send(get("/account/external-auth-providers")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_of(resp).await;
    assert_eq!(json[0]["id"], "sso");
    assert_eq!(json[0]["reset_password_url"], "https://sso.example/reset");
    assert!(json[0].get("url").is_none());
}
