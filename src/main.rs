//! RepoTomo bot server
//!
//! Staff report intake over LINE, plus the API behind the admin dashboard.
//!
//! ## Features
//!
//! - **Chat intake**: link a LINE account with a staff code, pick a report and submit a status
//! - **Broadcasts**: system notifications, reminders and question responses pushed over LINE
//! - **Dashboard API**: manage staff, report templates, submissions and notifications

mod bot;
mod config;
mod db;
mod handlers;
mod line;
mod models;
#[cfg(test)]
mod test_support;
mod validation;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use config::Config;
use handlers::AppState;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repotomo=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Starting RepoTomo bot server");
    tracing::info!("Environment: {:?}", config.environment);
    if config.line_channel_secret.is_none() {
        tracing::warn!("LINE_CHANNEL_SECRET is not set; signed webhooks will be rejected");
    }
    if config.admin_api_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN is not set; the dashboard API is unauthenticated");
    }

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let store = Arc::new(db::PgStore::new(pool));
    let notifier = Arc::new(line::LineClient::new(
        &config.line_api_base,
        &config.line_channel_access_token,
        config.line_timeout,
    )?);

    // Create application state
    let state = AppState::new(store, notifier, &config);
    let app = build_router(state, &config);

    // Start server
    let addr = config.server_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble every route and layer around the shared state
pub fn build_router(state: AppState, config: &Config) -> Router {
    // Build CORS layer
    let cors = if config.is_production() {
        CorsLayer::new()
            .allow_origin(
                config
                    .cors_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    // Dashboard API, guarded by the admin token
    let api_routes = Router::new()
        .route(
            "/staff",
            get(handlers::list_staff).post(handlers::create_staff),
        )
        .route("/staff/:id", put(handlers::update_staff))
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route(
            "/templates/:id",
            put(handlers::update_template).delete(handlers::delete_template),
        )
        .route(
            "/submissions",
            get(handlers::list_submissions).post(handlers::create_submission),
        )
        .route(
            "/submissions/:id/response",
            post(handlers::respond_to_submission),
        )
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route("/dashboard", get(handlers::get_dashboard_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::middleware::require_admin,
        ));

    Router::new()
        // LINE webhook and unsigned admin actions share both paths
        .route("/", post(handlers::line_webhook))
        .route("/webhook", post(handlers::line_webhook))
        .route(
            "/reminders",
            post(handlers::send_reminder).route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::middleware::require_admin,
            )),
        )
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::middleware::security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(cors)
        .with_state(state)
}
