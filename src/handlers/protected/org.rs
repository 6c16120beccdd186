// handlers/protected/org.rs - org unit listings and detail
//
// A tier is listed only to roles strictly above it; admins alone list provinsi.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use serde::Serialize;

use crate::auth::gate::{Gate, ADMIN, KESTRAD_OR_HIGHER, KOTA_OR_HIGHER, PROVINSI_OR_HIGHER, PUSKESMAS_OR_HIGHER};
use crate::auth::predicate::{Predicate, Target};
use crate::database::models::{Kestrad, Kota, Provinsi, Puskesmas};
use crate::error::ApiError;
use crate::filter::{ListParams, Page};
use crate::handlers::{path, query};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::org_service::OrgDetail;
use crate::services::OrgService;
use crate::tree::Tier;

async fn list_tier<T, P>(
    gate: &Gate<P>,
    tier: Tier,
    user: CurrentUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Page<T>>
where
    P: Predicate,
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Serialize + Send + Unpin,
{
    let caller = gate.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let page = OrgService::new().await?.list(tier, caller, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /provinsi
pub async fn provinsi(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Provinsi>> {
    list_tier(&ADMIN, Tier::Provinsi, user, params).await
}

/// GET /kota
pub async fn kota(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Kota>> {
    list_tier(&PROVINSI_OR_HIGHER, Tier::Kota, user, params).await
}

/// GET /puskesmas
pub async fn puskesmas(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Puskesmas>> {
    list_tier(&KOTA_OR_HIGHER, Tier::Puskesmas, user, params).await
}

/// GET /kestrad
pub async fn kestrad(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Kestrad>> {
    list_tier(&PUSKESMAS_OR_HIGHER, Tier::Kestrad, user, params).await
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OrgUnit {
    Provinsi(OrgDetail<Provinsi>),
    Kota(OrgDetail<Kota>),
    Puskesmas(OrgDetail<Puskesmas>),
    Kestrad(OrgDetail<Kestrad>),
}

/// GET /org/:tier/:username - one org unit with its counters
pub async fn detail(user: CurrentUser, segments: Result<Path<(String, String)>, PathRejection>) -> ApiResult<OrgUnit> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let (tier, username) = path(segments)?;
    let tier = Tier::parse(&tier)
        .filter(|t| t.is_org())
        .ok_or_else(|| ApiError::not_found(format!("Unknown org tier '{}'", tier)))?;

    let service = OrgService::new().await?;
    let unit = match tier {
        Tier::Provinsi => OrgUnit::Provinsi(service.detail(tier, &username, caller).await?),
        Tier::Kota => OrgUnit::Kota(service.detail(tier, &username, caller).await?),
        Tier::Puskesmas => OrgUnit::Puskesmas(service.detail(tier, &username, caller).await?),
        Tier::Kestrad => OrgUnit::Kestrad(service.detail(tier, &username, caller).await?),
        Tier::Layanan | Tier::Hattra => {
            return Err(ApiError::not_found(format!("Unknown org tier '{}'", tier)))
        }
    };
    Ok(ApiResponse::success(unit))
}
