//! Authentication service routes
//!
//! Issued tokens travel only in `HttpOnly` cookies, while protected routes read
//! `Authorization: Bearer`. Script in a browser page cannot read those cookies,
//! so browser frontends are expected to sit behind a same-origin gateway (or
//! server-rendered backend) that lifts the `access_token` cookie into the
//! bearer header. Native and CLI clients read the token from `Set-Cookie`
//! directly. `/auth/refresh` needs nothing but the cookie.

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    AppState, env,
    error::{AuthError, AuthResult},
    middleware::{AuthenticatedUser, require_access},
    models::{AuthCredentials, TokenPair},
};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Cookie attributes for issued tokens
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Set the `Secure` attribute; only turn off for plain-http development
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl CookieConfig {
    /// # Environment Variables
    /// - `COOKIE_SECURE`: whether cookies carry `Secure` (default: true)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secure: env::flag("COOKIE_SECURE", true)?,
        })
    }
}

/// Response for any endpoint that issues tokens
#[derive(Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Response describing the signed-in account
#[derive(Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/accounts", delete(delete_account))
        .route("/accounts/me", get(current_account))
        .route("/accounts/signout", post(sign_out))
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            require_access,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/refresh", post(refresh))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn credentials(payload: Result<Json<AuthCredentials>, JsonRejection>) -> AuthResult<AuthCredentials> {
    payload
        .map(|Json(creds)| creds)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

fn token_cookie(name: &'static str, value: String, lifetime: Duration, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn issue_session(
    state: &AppState,
    jar: CookieJar,
    tokens: TokenPair,
    message: &str,
) -> (CookieJar, Json<SessionResponse>) {
    let secure = state.cookies.secure;
    let access_lifetime = state.sessions.access_token_lifetime();
    let refresh_lifetime = state.sessions.refresh_token_lifetime();

    let jar = jar
        .add(token_cookie(ACCESS_COOKIE, tokens.access, access_lifetime, secure))
        .add(token_cookie(REFRESH_COOKIE, tokens.refresh, refresh_lifetime, secure));

    let body = SessionResponse {
        message: message.to_string(),
        token_type: "Bearer".to_string(),
        expires_in: access_lifetime.as_secs(),
    };

    (jar, Json(body))
}

/// User registration endpoint
pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<AuthCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let creds = credentials(payload)?;
    info!("Sign-up attempt for user: {}", creds.username);

    let tokens = state.sessions.sign_up(&creds.username, &creds.password).await?;
    Ok(issue_session(&state, jar, tokens, "successfully signed up"))
}

/// User login endpoint
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<AuthCredentials>, JsonRejection>,
) -> AuthResult<impl IntoResponse> {
    let creds = credentials(payload)?;
    info!("Sign-in attempt for user: {}", creds.username);

    let tokens = state.sessions.sign_in(&creds.username, &creds.password).await?;
    Ok(issue_session(&state, jar, tokens, "successfully authenticated"))
}

/// Refresh token endpoint
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> AuthResult<impl IntoResponse> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::Unauthorized)?;

    let tokens = state.sessions.refresh(&presented).await?;
    Ok(issue_session(&state, jar, tokens, "successfully refreshed tokens"))
}

/// Describe the account behind the access token
pub async fn current_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AuthResult<Json<AccountResponse>> {
    let username = state.sessions.username(user.id).await?;
    Ok(Json(AccountResponse {
        id: user.id,
        username,
    }))
}

/// Forget the current refresh token
pub async fn sign_out(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: CookieJar,
) -> AuthResult<impl IntoResponse> {
    state.sessions.sign_out(user.id).await?;
    Ok((
        clear_session(jar),
        Json(serde_json::json!({"message": "Signed out successfully"})),
    ))
}

/// Delete the authenticated account
pub async fn delete_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    jar: CookieJar,
) -> AuthResult<impl IntoResponse> {
    state.sessions.delete_user(user.id).await?;
    Ok((
        clear_session(jar),
        Json(serde_json::json!({"message": "Account deleted successfully"})),
    ))
}

fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repositories::MemoryCredentialStore, session::tests::manager_with,
        verification_cache::VerificationCacheConfig,
    };
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app_with_access_lifetime(access_lifetime: Duration) -> Router {
        let sessions = manager_with(
            MemoryCredentialStore::new(),
            access_lifetime,
            VerificationCacheConfig::default(),
        );
        create_router(AppState {
            sessions,
            cookies: CookieConfig::default(),
        })
    }

    fn app() -> Router {
        app_with_access_lifetime(Duration::from_secs(60))
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn credentials_body(username: &str, password: &str) -> String {
        serde_json::json!({"username": username, "password": password}).to_string()
    }

    fn bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn refresh_request(refresh_token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header(header::COOKIE, format!("{}={}", REFRESH_COOKIE, refresh_token))
            .body(Body::empty())
            .unwrap()
    }

    fn set_cookies(response: &Response<Body>) -> Vec<Cookie<'static>> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| Cookie::parse(value.to_str().unwrap().to_owned()).unwrap())
            .collect()
    }

    fn cookie_value(response: &Response<Body>, name: &str) -> String {
        set_cookies(response)
            .into_iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_owned())
            .unwrap_or_else(|| panic!("no {} cookie", name))
    }

    async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sign_up(app: &Router, username: &str, password: &str) -> Response<Body> {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/auth/signup",
                &credentials_body(username, password),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sign_up_sets_both_cookies() {
        let app = app();
        let response = sign_up(&app, "alice", "pw123").await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        for cookie in &cookies {
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.secure(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Lax));
            assert_eq!(cookie.path(), Some("/"));
        }

        let access = cookies.iter().find(|c| c.name() == ACCESS_COOKIE).unwrap();
        let refresh = cookies.iter().find(|c| c.name() == REFRESH_COOKIE).unwrap();
        assert_eq!(access.max_age(), Some(time::Duration::seconds(60)));
        assert_eq!(refresh.max_age(), Some(time::Duration::seconds(3600)));

        let body = body_json(response).await;
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 60);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_a_conflict() {
        let app = app();
        assert_eq!(sign_up(&app, "alice", "pw123").await.status(), StatusCode::OK);

        let response = sign_up(&app, "alice", "pw123").await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let app = app();

        for body in ["{not json", r#"{"username": "alice"}"#, "[]"] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/auth/signup", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        }

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/signup",
                &credentials_body("no spaces allowed", "pw123"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_credentials_get_one_uniform_answer() {
        let app = app();
        sign_up(&app, "alice", "pw123").await;

        let mut bodies = Vec::new();
        for (username, password) in [("alice", "wrong"), ("mallory", "pw123")] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/auth/signin",
                    &credentials_body(username, password),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(body_json(response).await);
        }

        assert_eq!(bodies[0], bodies[1]);
    }

    #[tokio::test]
    async fn protected_routes_need_a_bearer_token() {
        let app = app();
        let response = sign_up(&app, "alice", "pw123").await;
        let refresh_token = cookie_value(&response, REFRESH_COOKIE);

        let missing = Request::builder()
            .uri("/accounts/me")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(missing).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        for token in ["", "garbage", refresh_token.as_str()] {
            let response = app
                .clone()
                .oneshot(bearer("GET", "/accounts/me", token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn public_routes_do_not_need_a_token() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn refresh_needs_the_cookie() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.clone().oneshot(refresh_request("forged")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refreshed_tokens_replace_the_old_ones() {
        let app = app();
        let response = sign_up(&app, "alice", "pw123").await;
        let first_refresh = cookie_value(&response, REFRESH_COOKIE);

        let response = app
            .clone()
            .oneshot(refresh_request(&first_refresh))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let second_refresh = cookie_value(&response, REFRESH_COOKIE);
        assert_ne!(first_refresh, second_refresh);

        let replay = app
            .clone()
            .oneshot(refresh_request(&first_refresh))
            .await
            .unwrap();
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_access_tokens_recover_through_refresh() {
        // Two seconds so the first check cannot straddle the expiry second
        let app = app_with_access_lifetime(Duration::from_secs(2));

        let response = sign_up(&app, "alice", "pw123").await;
        assert_eq!(response.status(), StatusCode::OK);
        let access = cookie_value(&response, ACCESS_COOKIE);
        let refresh_token = cookie_value(&response, REFRESH_COOKIE);

        let response = app
            .clone()
            .oneshot(bearer("GET", "/accounts/me", &access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");

        tokio::time::sleep(Duration::from_millis(3100)).await;

        let response = app
            .clone()
            .oneshot(bearer("GET", "/accounts/me", &access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(refresh_request(&refresh_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fresh_access = cookie_value(&response, ACCESS_COOKIE);

        let response = app
            .clone()
            .oneshot(bearer("GET", "/accounts/me", &fresh_access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deleted_accounts_cannot_sign_in() {
        let app = app();
        let response = sign_up(&app, "alice", "pw123").await;
        let access = cookie_value(&response, ACCESS_COOKIE);

        let response = app
            .clone()
            .oneshot(bearer("DELETE", "/accounts", &access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/auth/signin",
                &credentials_body("alice", "pw123"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(bearer("GET", "/accounts/me", &access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_out_invalidates_the_refresh_cookie() {
        let app = app();
        let response = sign_up(&app, "alice", "pw123").await;
        let access = cookie_value(&response, ACCESS_COOKIE);
        let refresh_token = cookie_value(&response, REFRESH_COOKIE);

        let response = app
            .clone()
            .oneshot(bearer("POST", "/accounts/signout", &access))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(refresh_request(&refresh_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
