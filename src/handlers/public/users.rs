// handlers/public/users.rs - GET /users, GET /users/:username, POST /users

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::auth::predicate::is_admin;
use crate::config;
use crate::database::models::UserSummary;
use crate::error::ApiError;
use crate::filter::{ListParams, Page};
use crate::handlers::{body, path, query};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::user_service::CreateUser;
use crate::services::UserService;

/// GET /users - paginated listing with search and sort
pub async fn list(params: Result<Query<ListParams>, QueryRejection>) -> ApiResult<Page<UserSummary>> {
    let params = query(params)?;
    let page = UserService::new().await?.list(&params).await?;
    Ok(ApiResponse::success(page))
}

/// GET /users/:username
pub async fn get(username: Result<Path<String>, PathRejection>) -> ApiResult<UserSummary> {
    let username = path(username)?;
    let user = UserService::new().await?.get(&username).await?;
    Ok(ApiResponse::success(user))
}

/// POST /users - create an account one level below the caller
///
/// Admins may always create accounts. Everyone else, anonymous callers
/// included, only while public registration is enabled.
pub async fn create(user: CurrentUser, payload: Result<Json<CreateUser>, JsonRejection>) -> ApiResult<UserSummary> {
    let creator = user.get();
    if !config::config().api.public_user_registration && !creator.is_some_and(is_admin) {
        return Err(ApiError::forbidden("User registration is closed"));
    }

    let input = body(payload)?;
    let created = UserService::new().await?.create(creator, input).await?;
    Ok(ApiResponse::created(created))
}
