use anyhow::Context;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::pool().await.context("connecting to DATABASE_URL")?;
    DatabaseManager::migrate(&pool).await.context("applying migrations")?;
    DatabaseManager::close().await;

    output_success(output_format, "Migrations applied", Some(json!({ "migrated": true })))
}
