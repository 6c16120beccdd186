use anyhow::{bail, Context};
use serde_json::json;

use crate::auth::{self, Role, Status};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

/// Insert an active admin. Admins sit outside the org tree, so no extension
/// or statistics rows are needed.
pub async fn handle(
    username: &str,
    password: Option<&str>,
    email: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be blank");
    }

    let hash = auth::hash_password(password.unwrap_or(username))?;
    let pool = DatabaseManager::pool().await.context("connecting to DATABASE_URL")?;

    let inserted = sqlx::query(
        "INSERT INTO users (username, password, role, status, email) VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(username)
    .bind(&hash)
    .bind(Role::Admin.as_str())
    .bind(Status::Active.as_str())
    .bind(email)
    .execute(&pool)
    .await
    .context("inserting admin account")?
    .rows_affected();
    DatabaseManager::close().await;

    if inserted == 0 {
        bail!("user '{}' already exists", username);
    }
    tracing::info!("Created admin '{}'", username);
    output_success(
        output_format,
        &format!("Created admin '{}'", username),
        Some(json!({ "username": username, "role": Role::Admin })),
    )
}
