use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use super::org_service::node_for;
use super::{is_visible, scoped_update, shared_pool, FieldErrors, ServiceError};
use crate::auth::{AuthUser, Verification};
use crate::config;
use crate::database::models::Hattra;
use crate::database::QueryBuilder;
use crate::filter::{Filter, ListParams, Page, Scope, SearchParams};
use crate::tree::{self, NodeRef, PgTreeTx, Tier};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateHattra {
    pub id_layanan: Option<i64>,
    pub nama: Option<String>,
    pub ijin_hattra: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHattra {
    pub nama: Option<String>,
    pub ijin_hattra: Option<String>,
}

pub struct HattraService {
    pool: PgPool,
}

impl HattraService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(shared_pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn base_filter() -> Result<Filter, ServiceError> {
        let mut filter = Filter::new(Tier::Hattra.table())?;
        filter
            .searchable(&["nama", "ijin_hattra"])?
            .sortable(&["id_hattra", "nama", "id_layanan", "verified", "created_at"])?;
        Ok(filter)
    }

    async fn page(&self, scope: &Scope, params: &ListParams) -> Result<Page<Hattra>, ServiceError> {
        let mut filter = Self::base_filter()?;
        filter.scope(scope, Tier::Hattra).assign(params)?;
        Ok(QueryBuilder::new(filter).fetch_page(&self.pool).await?)
    }

    pub async fn list(&self, caller: &AuthUser, params: &ListParams) -> Result<Page<Hattra>, ServiceError> {
        self.page(&Scope::for_user(caller), params).await
    }

    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Hattra>, ServiceError> {
        let mut filter = Self::base_filter()?;
        if let Some(term) = &params.search {
            filter.search(term);
        }
        filter.limit(config::config().api.search_limit, None)?;
        Ok(QueryBuilder::new(filter).select_all(&self.pool).await?)
    }

    /// Hattra anywhere below the org unit `username`. Access to the unit
    /// itself is checked by the caller's gate.
    pub async fn by_user(&self, username: &str, params: &ListParams) -> Result<Page<Hattra>, ServiceError> {
        let node = node_for(&self.pool, username)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No org unit '{}'", username)))?;
        self.page(&Scope::Under(node.tier(), username.to_string()), params).await
    }

    /// Hattra of one layanan; the layanan must be within the caller's scope.
    pub async fn by_layanan(&self, caller: &AuthUser, id_layanan: i64, params: &ListParams) -> Result<Page<Hattra>, ServiceError> {
        if !is_visible(&self.pool, Tier::Layanan, id_layanan, &Scope::for_user(caller)).await? {
            return Err(ServiceError::NotFound(format!("Layanan #{} not found", id_layanan)));
        }
        let mut filter = Self::base_filter()?;
        filter.where_eq("id_layanan", id_layanan)?.assign(params)?;
        Ok(QueryBuilder::new(filter).fetch_page(&self.pool).await?)
    }

    pub async fn get(&self, caller: &AuthUser, id: i64) -> Result<Hattra, ServiceError> {
        let mut filter = Self::base_filter()?;
        filter
            .where_eq("id_hattra", id)?
            .scope(&Scope::for_user(caller), Tier::Hattra);
        QueryBuilder::new(filter)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// New hattra under one of the calling kestrad's own layanan.
    pub async fn create(&self, caller: &AuthUser, input: CreateHattra) -> Result<Hattra, ServiceError> {
        let mut errors = FieldErrors::new();
        if input.id_layanan.is_none() {
            errors.add("id_layanan", "This field is required");
        }
        let nama = errors.require("nama", input.nama.as_deref()).map(str::to_string);
        errors.into_result()?;
        let id_layanan = input
            .id_layanan
            .ok_or_else(|| ServiceError::validation("Missing id_layanan"))?;

        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let owned: Option<i64> = sqlx::query_scalar(
            "SELECT id_layanan FROM layanan WHERE id_layanan = $1 AND username_kestrad = $2",
        )
        .bind(id_layanan)
        .bind(&caller.username)
        .fetch_optional(tx.conn())
        .await?;
        if owned.is_none() {
            return Err(ServiceError::NotFound(format!("Layanan #{} not found", id_layanan)));
        }

        let hattra = sqlx::query_as::<_, Hattra>(
            "INSERT INTO hattra (id_layanan, nama, ijin_hattra) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(id_layanan)
        .bind(nama)
        .bind(&input.ijin_hattra)
        .fetch_one(tx.conn())
        .await?;

        tree::record_insert(&mut tx, &NodeRef::Hattra(hattra.id_hattra), Some(&NodeRef::Layanan(id_layanan))).await?;
        tx.commit().await?;

        info!("Created hattra #{} under layanan #{}", hattra.id_hattra, id_layanan);
        Ok(hattra)
    }

    pub async fn update(&self, caller: &AuthUser, id: i64, input: UpdateHattra) -> Result<u64, ServiceError> {
        let mut changes: Vec<(&str, Value)> = Vec::new();
        if let Some(nama) = input.nama {
            if nama.trim().is_empty() {
                let mut errors = FieldErrors::new();
                errors.add("nama", "Cannot be blank");
                errors.into_result()?;
            }
            changes.push(("nama", Value::from(nama)));
        }
        if let Some(ijin) = input.ijin_hattra {
            changes.push(("ijin_hattra", Value::from(ijin)));
        }
        self.apply(caller, id, &changes).await
    }

    /// `active` on verification, `disabled` on unverification.
    pub async fn set_verification(&self, caller: &AuthUser, id: i64, verified: Verification) -> Result<u64, ServiceError> {
        let changes = [("verified", Value::from(verified.as_str()))];
        self.apply(caller, id, &changes).await
    }

    async fn apply(&self, caller: &AuthUser, id: i64, changes: &[(&str, Value)]) -> Result<u64, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        let affected = scoped_update(&mut conn, Tier::Hattra, id, changes, &Scope::for_user(caller)).await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        Ok(affected)
    }

    pub async fn delete(&self, caller: &AuthUser, id: i64) -> Result<u64, ServiceError> {
        if !is_visible(&self.pool, Tier::Hattra, id, &Scope::for_user(caller)).await? {
            return Err(not_found(id));
        }

        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let summary = tree::delete_subtree(&mut tx, &NodeRef::Hattra(id)).await?;
        tx.commit().await?;
        Ok(summary.total())
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Hattra #{} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_accepts_partial_input() {
        let body: CreateHattra = serde_json::from_value(serde_json::json!({
            "id_layanan": 7,
            "nama": "Bekam"
        }))
        .unwrap();
        assert_eq!(body.id_layanan, Some(7));
        assert_eq!(body.nama.as_deref(), Some("Bekam"));
        assert!(body.ijin_hattra.is_none());
    }

    #[test]
    fn list_filter_sorts_by_id_by_default() {
        let filter = HattraService::base_filter().unwrap();
        let sql = filter.to_sql().query;
        assert!(sql.contains("FROM \"hattra\""), "{sql}");
        assert!(sql.ends_with("ORDER BY \"id_hattra\" ASC"), "{sql}");
    }
}
