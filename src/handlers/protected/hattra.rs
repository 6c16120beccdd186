// handlers/protected/hattra.rs - /hattra routes

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::auth::gate::{KESTRAD, KESTRAD_OR_HIGHER, KOTA, LOGGED_IN, OWNER_OR_SUPERVISES_TARGET, PUSKESMAS};
use crate::auth::predicate::Target;
use crate::auth::Verification;
use crate::database::models::Hattra;
use crate::filter::{ListParams, Page, SearchParams};
use crate::handlers::{body, path, query};
use crate::middleware::{Affected, ApiResponse, ApiResult, CurrentUser};
use crate::services::hattra_service::{CreateHattra, UpdateHattra};
use crate::services::HattraService;

/// GET /hattra
pub async fn list(user: CurrentUser, params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<Hattra>> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let page = HattraService::new().await?.list(caller, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /hattra/search
pub async fn search(user: CurrentUser, params: Result<Query<SearchParams>, QueryRejection>) -> ApiResult<Vec<Hattra>> {
    LOGGED_IN.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let found = HattraService::new().await?.search(&params).await?;
    Ok(ApiResponse::success(found))
}

/// GET /hattra/byUser/:username - everything below one org unit. The caller
/// must be that unit, an ancestor of it, or an admin.
pub async fn by_user(
    user: CurrentUser,
    username: Result<Path<String>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Page<Hattra>> {
    KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let username = path(username)?;
    OWNER_OR_SUPERVISES_TARGET.admit(user.get(), &Target::user(&username)).await?;

    let params = query(params)?;
    let page = HattraService::new().await?.by_user(&username, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /hattra/byLayanan/:id
pub async fn by_layanan(
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Page<Hattra>> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let params = query(params)?;
    let page = HattraService::new().await?.by_layanan(caller, id, &params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /hattra/:id
pub async fn get(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Hattra> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let hattra = HattraService::new().await?.get(caller, id).await?;
    Ok(ApiResponse::success(hattra))
}

/// POST /hattra - kestrad only, under one of the caller's layanan
pub async fn create(user: CurrentUser, payload: Result<Json<CreateHattra>, JsonRejection>) -> ApiResult<Hattra> {
    let caller = KESTRAD.admit(user.get(), &Target::none()).await?;
    let input = body(payload)?;
    let hattra = HattraService::new().await?.create(caller, input).await?;
    Ok(ApiResponse::created(hattra))
}

/// PATCH /hattra/:id - puskesmas only
pub async fn update(
    user: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateHattra>, JsonRejection>,
) -> ApiResult<Affected> {
    let caller = PUSKESMAS.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let input = body(payload)?;
    let affected = HattraService::new().await?.update(caller, id, input).await?;
    Ok(ApiResponse::affected(affected))
}

async fn set_verification(user: CurrentUser, id: Result<Path<i64>, PathRejection>, verified: Verification) -> ApiResult<Affected> {
    let caller = KOTA.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let affected = HattraService::new().await?.set_verification(caller, id, verified).await?;
    Ok(ApiResponse::affected(affected))
}

/// PATCH /hattra/:id/verification
pub async fn verify(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Affected> {
    set_verification(user, id, Verification::Active).await
}

/// PATCH /hattra/:id/verification/unverify
pub async fn unverify(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Affected> {
    set_verification(user, id, Verification::Disabled).await
}

/// DELETE /hattra/:id
pub async fn delete(user: CurrentUser, id: Result<Path<i64>, PathRejection>) -> ApiResult<Affected> {
    let caller = KESTRAD_OR_HIGHER.admit(user.get(), &Target::none()).await?;
    let id = path(id)?;
    let affected = HattraService::new().await?.delete(caller, id).await?;
    Ok(ApiResponse::affected(affected))
}
