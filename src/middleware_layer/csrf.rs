use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use redis::AsyncCommands;
use subtle::ConstantTimeEq;
use tower_cookies::Cookies;

use crate::{error::AppError, state::AppState};

/// The size of the CSRF token in bytes.
const CSRF_TOKEN_SIZE: usize = 32;

/// Generates a new random CSRF token.
///
/// # Returns
///
/// A URL-safe base64-encoded CSRF token.
pub fn generate_csrf_token() -> String {
    let mut token = [0u8; CSRF_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// A middleware that verifies the CSRF token on mutating requests.
///
/// The double-submit pair (cookie and `x-csrf-token` header) must match in
/// constant time and still exist in Redis, so logout genuinely revokes it.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an error `AppError`.
pub async fn verify_csrf(
    State(mut state): State<AppState>,
    cookies: Cookies,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == Method::GET
        || req.method() == Method::HEAD
        || req.method() == Method::OPTIONS
    {
        tracing::debug!("✅ CSRF exemption: {} request", req.method());
        return next.run(req).await;
    }

    let csrf_token_cookie = match cookies.get("csrf_token") {
        Some(c) => c.value().to_string(),
        None => {
            tracing::warn!("❌ CSRF: csrf_token cookie not found");
            return AppError::Authentication("Missing CSRF token cookie".to_string())
                .into_response();
        }
    };

    let headers = req.headers();
    let csrf_token_header = match headers.get("x-csrf-token") {
        Some(token) => match token.to_str() {
            Ok(t) => t.to_string(),
            Err(_) => {
                tracing::warn!("❌ CSRF: header is not valid UTF-8");
                return AppError::Authentication("Invalid CSRF token format".to_string())
                    .into_response();
            }
        },
        None => {
            tracing::warn!("❌ CSRF: x-csrf-token header not found");
            return AppError::Authentication("Missing CSRF token header".to_string())
                .into_response();
        }
    };

    let tokens_match: bool = csrf_token_cookie
        .as_bytes()
        .ct_eq(csrf_token_header.as_bytes())
        .into();
    if !tokens_match {
        tracing::warn!("❌ CSRF: cookie and header disagree");
        return AppError::Authentication("CSRF token mismatch".to_string()).into_response();
    }

    let csrf_key = format!("csrf:{}", csrf_token_cookie);

    match state.redis.get::<_, Option<String>>(&csrf_key).await {
        Ok(Some(_)) => {
            tracing::debug!("✅ CSRF token valid");
            next.run(req).await
        }
        Ok(None) => {
            tracing::warn!("❌ CSRF: token expired or revoked");
            AppError::Authentication("CSRF token expired or invalid".to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("❌ CSRF: Redis error: {}", e);
            AppError::Authentication("CSRF validation error".to_string()).into_response()
        }
    }
}
