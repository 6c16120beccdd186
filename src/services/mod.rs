pub mod hattra_service;
pub mod layanan_service;
pub mod org_service;
pub mod user_service;
pub mod username;

use std::collections::HashMap;

use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::{DatabaseError, DatabaseManager, QueryBuilder};
use crate::filter::{Filter, FilterError, Scope};
use crate::tree::{Tier, TreeError};

pub use hattra_service::HattraService;
pub use layanan_service::LayananService;
pub use org_service::OrgService;
pub use user_service::UserService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field_errors: HashMap::new(),
        }
    }
}

/// Collects per-field problems of a request body.
#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    /// Record an error unless `value` holds non-blank text.
    pub fn require<'v>(&mut self, field: &str, value: Option<&'v str>) -> Option<&'v str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.add(field, "This field is required");
                None
            }
        }
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation {
                message: "Invalid request body".to_string(),
                field_errors: self.0,
            })
        }
    }
}

pub(crate) async fn shared_pool() -> Result<PgPool, ServiceError> {
    Ok(DatabaseManager::pool().await?)
}

/// True when the record `id` of `tier` exists and lies within `scope`.
pub(crate) async fn is_visible(pool: &PgPool, tier: Tier, id: i64, scope: &Scope) -> Result<bool, ServiceError> {
    let mut filter = Filter::new(tier.table())?;
    filter.where_eq(tier.key_column(), id)?.scope(scope, tier);
    let count = QueryBuilder::<(i64,)>::new(filter).count(pool).await?;
    Ok(count > 0)
}

/// `UPDATE` one record of `tier`, restricted to rows within `scope`.
/// Returns the number of rows changed; zero means absent or out of scope.
pub(crate) async fn scoped_update(
    conn: &mut PgConnection,
    tier: Tier,
    id: i64,
    changes: &[(&str, Value)],
    scope: &Scope,
) -> Result<u64, ServiceError> {
    if changes.is_empty() {
        return Err(ServiceError::validation("Nothing to update"));
    }

    let mut params: Vec<Value> = changes.iter().map(|(_, v)| v.clone()).collect();
    let assignments = changes
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("\"{}\" = ${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    params.push(Value::from(id));
    let key_placeholder = params.len();
    let (scope_clause, scope_params) = scope.clause(tier, params.len() + 1);
    params.extend(scope_params);

    let sql = format!(
        "UPDATE {} SET {}, updated_at = now() WHERE {} = ${} AND {}",
        tier.table(),
        assignments,
        tier.key_column(),
        key_placeholder,
        scope_clause
    );

    let mut q = sqlx::query(&sql);
    for p in params.iter() {
        q = crate::database::query_builder::bind_param_query(q, p);
    }
    Ok(q.execute(conn).await?.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_blank_and_missing_values() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.require("nama", Some("  Pijat  ")), Some("Pijat"));
        assert_eq!(errors.require("alamat", Some("   ")), None);
        assert_eq!(errors.require("ijin_hattra", None), None);

        match errors.into_result() {
            Err(ServiceError::Validation { field_errors, .. }) => {
                assert_eq!(field_errors.len(), 2);
                assert!(field_errors.contains_key("alamat"));
                assert!(field_errors.contains_key("ijin_hattra"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
