use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::csrf::generate_csrf_token,
    models::session::AuthSession,
    models::user::User,
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

use redis::AsyncCommands;

/// The request payload for user registration.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

/// The request payload for user login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// Creates a secure cookie with the given name, value, and max age.
fn create_secure_cookie(name: String, value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.clone(), value);

    let is_production = std::env::var("APP_ENV")
        .unwrap_or_else(|_| "development".to_string()) == "production";

    if name != "csrf_token" {
        cookie.set_http_only(true);
    }

    if is_production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.set_path("/");

    cookie
}

/// Writes a fresh login session and CSRF marker to Redis and plants both
/// cookies. Shared by register and login.
async fn issue_auth_session(
    state: &mut AppState,
    cookies: &Cookies,
    user: &User,
) -> Result<()> {
    let session_id = Uuid::new_v4();
    tracing::debug!("🔑 Generated session_id: {}", session_id);

    let ttl_secs = state.config.auth_session_ttl_secs;
    let session = AuthSession {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
        created_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs as i64),
    };

    let session_json = sonic_rs::to_string(&session)
        .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

    let _: () = state
        .redis
        .set_ex(format!("session:{}", session_id), &session_json, ttl_secs)
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed: {}", e);
            AppError::Redis(e)
        })?;

    tracing::info!("✅ Session saved to Redis: session:{}", session_id);

    cookies.add(create_secure_cookie(
        "session_id".to_string(),
        session_id.to_string(),
        ttl_secs as i64,
    ));

    let csrf_token = generate_csrf_token();
    let _: () = state
        .redis
        .set_ex(format!("csrf:{}", csrf_token), "valid", ttl_secs)
        .await
        .map_err(|e| {
            tracing::error!("❌ Redis set_ex failed for CSRF: {}", e);
            AppError::Redis(e)
        })?;

    cookies.add(create_secure_cookie(
        "csrf_token".to_string(),
        csrf_token,
        ttl_secs as i64,
    ));

    tracing::debug!("✅ Session and CSRF cookies added for user {}", user.id);
    Ok(())
}

/// Handles student registration. New accounts always get the student role.
#[axum::debug_handler]
pub async fn register(
    State(mut state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt: {}", payload.username);
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_full_name(&payload.full_name)?;

    let user = auth_service::register_user(
        &state.db,
        &payload.username,
        &payload.password,
        payload.full_name.trim(),
    )
    .await?;

    issue_auth_session(&mut state, &cookies, &user).await?;

    tracing::info!("✅ User registered and logged in: {}", user.id);

    let response = AuthResponse {
        success: true,
        message: "Registration successful. Welcome!".to_string(),
    };

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(mut state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt: {}", payload.username);
    validate_username(&payload.username)?;

    let user =
        auth_service::authenticate_user(&state.db, &payload.username, &payload.password).await?;

    issue_auth_session(&mut state, &cookies, &user).await?;

    tracing::info!("✅ User logged in: {}", user.id);

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
#[axum::debug_handler]
pub async fn logout(
    State(mut state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    cookies: Cookies,
) -> Result<Response> {
    tracing::info!("👋 Logout for user: {}", session.user_id);

    let session_id = cookies
        .get("session_id")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let _: () = state
        .redis
        .del(format!("session:{}", session_id))
        .await?;

    if let Some(csrf_cookie) = cookies.get("csrf_token") {
        let csrf_token = csrf_cookie.value();
        let _: () = state
            .redis
            .del(format!("csrf:{}", csrf_token))
            .await
            .unwrap_or(());
    }

    let mut session_cookie = Cookie::new("session_id", "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    let mut csrf_cookie = Cookie::new("csrf_token", "");
    csrf_cookie.set_max_age(Duration::seconds(0));
    csrf_cookie.set_path("/");
    cookies.remove(csrf_cookie);

    tracing::info!("✅ User logged out: {}", session.user_id);

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Reports whether the caller's session is still valid, and for whom.
///
/// The auth middleware has already vetted the cookie by the time this runs,
/// so this endpoint only has to echo the session back. Frontends poll it to
/// know when to bounce to the login page.
#[axum::debug_handler]
pub async fn session_probe(
    Extension(session): Extension<AuthSession>,
) -> Result<Response> {
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "valid": true,
        "user_id": session.user_id,
        "username": session.username,
        "role": session.role.as_str(),
        "expires_at": session.expires_at.to_rfc3339(),
    }))
    .map_err(|e| AppError::Internal(format!("Serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}
