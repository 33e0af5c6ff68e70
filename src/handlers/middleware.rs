//! Middleware for admin authentication and security headers

use crate::handlers::AppState;
use crate::models::ApiResponse;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of an admin token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Check the admin bearer token; open when no token is configured
pub fn authorize_admin(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.admin_token_hash.as_deref() else {
        return true;
    };

    match extract_bearer_token(headers) {
        // Digests have a fixed length, so comparing them leaks nothing about the token
        Some(token) => hash_token(token) == expected,
        None => false,
    }
}

/// Guard for the dashboard API
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !authorize_admin(&state, request.headers()) {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error("Not authenticated")),
        )
            .into_response();
    }

    next.run(request).await
}

/// Security headers middleware
pub async fn security_headers(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if state.is_production {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=63072000; includeSubDomains"),
        );
    }

    response
}
