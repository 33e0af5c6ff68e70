//! LINE webhook endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::broadcast;
use super::middleware::authorize_admin;
use super::AppState;
use crate::line::signature::{self, SIGNATURE_HEADER};
use crate::line::WebhookBody;
use crate::models::ApiResponse;

/// Receive chat events, or an administrative action when the body is unsigned
/// and carries an `action` field
pub async fn line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signed = match headers.get(SIGNATURE_HEADER) {
        Some(value) => {
            let Ok(value) = value.to_str() else {
                return unauthorized("Invalid signature");
            };
            let secret = state.channel_secret.as_deref().unwrap_or_default();
            if let Err(e) = signature::verify(secret, &body, value) {
                tracing::warn!("Rejected webhook: {}", e);
                return unauthorized("Invalid signature");
            }
            true
        }
        None => false,
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("Failed to parse webhook body: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    if !signed && payload.get("action").is_some() {
        if !authorize_admin(&state, &headers) {
            return unauthorized("Not authenticated");
        }
        return broadcast::dispatch_action(&state, payload).await;
    }

    let webhook: WebhookBody = match serde_json::from_value(payload) {
        Ok(webhook) => webhook,
        Err(e) => {
            tracing::error!("Webhook body has an unexpected shape: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    if webhook.events.is_empty() {
        // Verification requests from the LINE console carry no events
        return (StatusCode::OK, "OK").into_response();
    }

    tracing::debug!(
        destination = webhook.destination.as_deref().unwrap_or("-"),
        events = webhook.events.len(),
        "Processing webhook batch"
    );
    state.router.clone().handle_batch(webhook.events).await;

    (StatusCode::OK, "OK").into_response()
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}
