//! Database connection pool

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Embedded schema; every statement is idempotent
const INITIAL_SCHEMA: &str = include_str!("migrations/001_initial.sql");

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
}

/// Split SQL into statements, keeping `DO $$ ... $$` blocks intact
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_block = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' && chars.peek() == Some(&'$') {
            if let Some(next) = chars.next() {
                current.push(next);
            }
            in_dollar_block = !in_dollar_block;
        } else if c == ';' && !in_dollar_block {
            if has_sql_content(&current) {
                statements.push(current.trim().to_string());
            }
            current.clear();
        }
    }

    if has_sql_content(&current) {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Check if a string has actual SQL content (not just comments)
fn has_sql_content(s: &str) -> bool {
    s.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with("--")
    })
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let statements = split_sql_statements(INITIAL_SCHEMA);
    let mut failed = 0usize;

    for statement in &statements {
        if let Err(e) = sqlx::query(statement).execute(pool).await {
            failed += 1;
            tracing::warn!(
                "Migration statement may have failed (possibly already exists): {}",
                e
            );
        }
    }

    tracing::info!(
        statements = statements.len(),
        failed,
        "Database migrations completed"
    );
    Ok(())
}
