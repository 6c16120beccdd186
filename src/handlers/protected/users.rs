// handlers/protected/users.rs - user search, update and delete

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::auth::gate::{LOGGED_IN, OWNER_OR_SUPERVISOR, SUPERVISES_TARGET};
use crate::auth::predicate::Target;
use crate::database::models::UserSummary;
use crate::filter::SearchParams;
use crate::handlers::{body, path, query};
use crate::middleware::{Affected, ApiResponse, ApiResult, CurrentUser};
use crate::services::user_service::UpdateUser;
use crate::services::UserService;

/// GET /users/search?search=..&category=<role>
pub async fn search(user: CurrentUser, params: Result<Query<SearchParams>, QueryRejection>) -> ApiResult<Vec<UserSummary>> {
    LOGGED_IN.admit(user.get(), &Target::none()).await?;
    let params = query(params)?;
    let users = UserService::new().await?.search(&params).await?;
    Ok(ApiResponse::success(users))
}

/// PATCH /users/:username - the owner, or a supervisor
pub async fn update(
    user: CurrentUser,
    username: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> ApiResult<Affected> {
    let username = path(username)?;
    let caller = OWNER_OR_SUPERVISOR.admit(user.get(), &Target::user(&username)).await?;
    let input = body(payload)?;

    let affected = UserService::new().await?.update(caller, &username, input).await?;
    Ok(ApiResponse::affected(affected))
}

/// DELETE /users/:username - admins, or an org unit above the account
pub async fn delete(user: CurrentUser, username: Result<Path<String>, PathRejection>) -> ApiResult<Affected> {
    let username = path(username)?;
    let caller = SUPERVISES_TARGET.admit(user.get(), &Target::user(&username)).await?;

    let affected = UserService::new().await?.delete(&username).await?;
    tracing::info!("'{}' deleted account '{}' ({} rows)", caller.username, username, affected);
    Ok(ApiResponse::affected(affected))
}
