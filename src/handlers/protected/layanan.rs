// handlers/protected/layanan.rs - /layanan routes

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::auth::gate::{KESTRAD, KESTRAD_OR_HIGHER, KOTA, LOGGED_IN, PUSKESMAS};
use crate::auth::predicate::Target;
use crate::database::models::Layanan;
use crate::filter::{ListParams, Page, SearchParams};
use crate::handlers::{body, path, query};
use crate::middleware::{Affected, ApiResponse, ApiResult, CurrentUser};
use crate::services::layanan_service::{CreateLayanan, UpdateLayanan, VerifyLayanan};
use crate::services::LayananService;

/// GET /layanan
pub async fn list(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Layanan>> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let page = LayananService::new().await?.list(caller, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /layanan/search
pub async fn search(user: CurrentUser, params: Result<Query<SearchParams>, QueryRejection>) -> ApiResult<Vec<Layanan>> {
    LOGGED_IN.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let found = LayananService::new().await?.search(&params).await?;
    Ok(ApiResponse::success(found))
}

/// GET /layanan/:id
pub async fn get(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Layanan> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let layanan = LayananService::new().await?.get(caller, id).await?;
    Ok(ApiResponse::success(layanan))
}

/// POST /layanan - kestrad only, created under the caller
pub async fn create(user: CurrentUser, payload: Result<Json<CreateLayanan>, JsonRejection>) -> ApiResult<Layanan> {
    let caller = KESTRAD.admit(user.get(), &Target::none()).await?;
    let input = body(payload)?;
    let layanan = LayananService::new().await?.create(caller, input).await?;
    Ok(ApiResponse::created(layanan))
}

/// PATCH /layanan/:id - puskesmas only
pub async fn update(
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateLayanan>, JsonRejection>,
) -> ApiResult<Affected> {
    let caller = PUSKESMAS.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let input = body(payload)?;
    let affected = LayananService::new().await?.update(caller, id, input).await?;
    Ok(ApiResponse::affected(affected))
}

/// PATCH /layanan/verifikasi/:id - kota only, body `{"verified": "active" | "disabled"}`
pub async fn verify(
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<VerifyLayanan>, JsonRejection>,
) -> ApiResult<Affected> {
    let caller = KOTA.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let VerifyLayanan { verified } = body(payload)?;
    let affected = LayananService::new().await?.verify(caller, id, verified).await?;
    Ok(ApiResponse::affected(affected))
}

/// DELETE /layanan/:id - removes its hattra as well
pub async fn delete(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Affected> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let affected = LayananService::new().await?.delete(caller, id).await?;
    Ok(ApiResponse::affected(affected))
}
