use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use super::{is_visible, scoped_update, shared_pool, FieldErrors, ServiceError};
use crate::auth::{AuthUser, Verification};
use crate::config;
use crate::database::models::Layanan;
use crate::database::QueryBuilder;
use crate::filter::{Filter, ListParams, Page, Scope, SearchParams};
use crate::tree::{self, NodeRef, PgTreeTx, Tier};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLayanan {
    pub nama_layanan: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLayanan {
    pub nama_layanan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyLayanan {
    pub verified: Verification,
}

pub struct LayananService {
    pool: PgPool,
}

impl LayananService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(shared_pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn base_filter() -> Result<Filter, ServiceError> {
        let mut filter = Filter::new(Tier::Layanan.table())?;
        filter
            .searchable(&["nama_layanan", "username_kestrad"])?
            .sortable(&["id_layanan", "nama_layanan", "verified", "created_at"])?;
        Ok(filter)
    }

    pub async fn list(&self, caller: &AuthUser, params: &ListParams) -> Result<Page<Layanan>, ServiceError> {
        let mut filter = Self::base_filter()?;
        filter.scope(&Scope::for_user(caller), Tier::Layanan).assign(params)?;
        Ok(QueryBuilder::new(filter).fetch_page(&self.pool).await?)
    }

    /// Name search across all layanan, capped at the configured limit.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Layanan>, ServiceError> {
        let mut filter = Self::base_filter()?;
        if let Some(term) = &params.search {
            filter.search(term);
        }
        filter.limit(config::config().api.search_limit, None)?;
        Ok(QueryBuilder::new(filter).select_all(&self.pool).await?)
    }

    pub async fn get(&self, caller: &AuthUser, id: i64) -> Result<Layanan, ServiceError> {
        let mut filter = Self::base_filter()?;
        filter
            .where_eq("id_layanan", id)?
            .scope(&Scope::for_user(caller), Tier::Layanan);
        QueryBuilder::new(filter)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// New layanan owned by the calling kestrad, pending verification.
    pub async fn create(&self, caller: &AuthUser, input: CreateLayanan) -> Result<Layanan, ServiceError> {
        let mut errors = FieldErrors::new();
        let nama = errors.require("nama_layanan", input.nama_layanan.as_deref()).map(str::to_string);
        errors.into_result()?;

        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let layanan = sqlx::query_as::<_, Layanan>(
            "INSERT INTO layanan (username_kestrad, nama_layanan) VALUES ($1, $2) RETURNING *",
        )
        .bind(&caller.username)
        .bind(nama)
        .fetch_one(tx.conn())
        .await?;

        let parent = NodeRef::Kestrad(caller.username.clone());
        tree::record_insert(&mut tx, &NodeRef::Layanan(layanan.id_layanan), Some(&parent)).await?;
        tx.commit().await?;

        info!("Created layanan #{} under '{}'", layanan.id_layanan, caller.username);
        Ok(layanan)
    }

    pub async fn update(&self, caller: &AuthUser, id: i64, input: UpdateLayanan) -> Result<u64, ServiceError> {
        let mut errors = FieldErrors::new();
        let nama = errors.require("nama_layanan", input.nama_layanan.as_deref()).map(str::to_string);
        errors.into_result()?;

        let changes = [("nama_layanan", Value::from(nama))];
        self.apply(caller, id, &changes).await
    }

    /// Set the verification state. Only `active` and `disabled` are accepted.
    pub async fn verify(&self, caller: &AuthUser, id: i64, verified: Verification) -> Result<u64, ServiceError> {
        if verified == Verification::Pending {
            let mut errors = FieldErrors::new();
            errors.add("verified", "Must be either active or disabled");
            errors.into_result()?;
        }
        let changes = [("verified", Value::from(verified.as_str()))];
        self.apply(caller, id, &changes).await
    }

    async fn apply(&self, caller: &AuthUser, id: i64, changes: &[(&str, Value)]) -> Result<u64, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let affected = scoped_update(&mut conn, Tier::Layanan, id, changes, &Scope::for_user(caller)).await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        Ok(affected)
    }

    /// Delete a layanan and its hattra, keeping every counter above in step.
    pub async fn delete(&self, caller: &AuthUser, id: i64) -> Result<u64, ServiceError> {
        if !is_visible(&self.pool, Tier::Layanan, id, &Scope::for_user(caller)).await? {
            return Err(not_found(id));
        }

        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let summary = tree::delete_subtree(&mut tx, &NodeRef::Layanan(id)).await?;
        tx.commit().await?;
        Ok(summary.total())
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Layanan #{} not found", id))
}
