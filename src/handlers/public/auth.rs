// handlers/public/auth.rs - POST /auth/login

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::handlers::body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::{LoginRequest, LoginResponse};
use crate::services::UserService;

/// POST /auth/login - exchange username and password for a JWT
///
/// 401 on unknown user or wrong password, 403 when the account is not active.
pub async fn login(payload: Result<Json<LoginRequest>, JsonRejection>) -> ApiResult<LoginResponse> {
    let request = body(payload)?;
    let response = UserService::new().await?.login(&request).await?;
    Ok(ApiResponse::success(response))
}
