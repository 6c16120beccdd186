use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use super::{shared_pool, ServiceError};
use crate::auth::{AuthUser, Role};
use crate::database::models::OrgStats;
use crate::database::QueryBuilder;
use crate::filter::{Filter, ListParams, Page, Scope};
use crate::tree::{integrity, NodeRef, PgTreeTx, Tier};

/// An org unit together with its descendant counters.
#[derive(Debug, Clone, Serialize)]
pub struct OrgDetail<T> {
    #[serde(flatten)]
    pub unit: T,
    pub stats: OrgStats,
}

/// Tree node of the account `username`, or `None` for admins, plain users
/// and unknown accounts.
pub async fn node_for(pool: &PgPool, username: &str) -> Result<Option<NodeRef>, ServiceError> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some(role) = role.and_then(|r| r.parse::<Role>().ok()) else {
        return Ok(None);
    };
    Ok(Tier::for_role(role).and_then(|tier| NodeRef::org(tier, username.to_string())))
}

/// True when `ancestor` sits somewhere above `target` in the ownership tree.
pub async fn is_ancestor(pool: &PgPool, ancestor: &str, target: &str) -> Result<bool, ServiceError> {
    let Some(node) = node_for(pool, target).await? else {
        return Ok(false);
    };

    // Read-only walk; the transaction is rolled back
    let mut tx = PgTreeTx::begin(pool).await?;
    let chain = integrity::ancestors(&mut tx, &node).await?;
    tx.rollback().await?;

    Ok(chain.iter().any(|n| n.username() == Some(ancestor)))
}

pub struct OrgService {
    pool: PgPool,
}

impl OrgService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(shared_pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn tier_filter(tier: Tier) -> Result<Filter, ServiceError> {
        let mut filter = Filter::new(tier.table())?;
        filter
            .searchable(&["username", "nama", "alamat"])?
            .sortable(&["username", "nama", "created_at"])?;
        Ok(filter)
    }

    /// Org units of `tier` visible to `caller`.
    pub async fn list<T>(&self, tier: Tier, caller: &AuthUser, params: &ListParams) -> Result<Page<T>, ServiceError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut filter = Self::tier_filter(tier)?;
        filter.scope(&Scope::for_user(caller), tier).assign(params)?;
        Ok(QueryBuilder::new(filter).fetch_page(&self.pool).await?)
    }

    /// One org unit with its counters. Callers see themselves and the units
    /// within their scope; anything else is reported as missing.
    pub async fn detail<T>(&self, tier: Tier, username: &str, caller: &AuthUser) -> Result<OrgDetail<T>, ServiceError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        if !tier.is_org() {
            return Err(ServiceError::NotFound(format!("No org units of tier {}", tier)));
        }

        let mut filter = Self::tier_filter(tier)?;
        filter.where_eq("username", username)?;
        if caller.username != username {
            filter.scope(&Scope::for_user(caller), tier);
        }

        let unit = QueryBuilder::<T>::new(filter)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} '{}' not found", tier, username)))?;

        let stats = sqlx::query_as::<_, OrgStats>("SELECT * FROM org_stats WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Statistics of '{}' not found", username)))?;

        Ok(OrgDetail { unit, stats })
    }
}
