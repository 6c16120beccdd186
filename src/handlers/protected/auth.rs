// handlers/protected/auth.rs - GET /auth/whoami

use crate::auth::gate::LOGGED_IN;
use crate::auth::predicate::Target;
use crate::auth::AuthUser;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};

/// GET /auth/whoami - identity carried by the caller's token
pub async fn whoami(user: CurrentUser) -> ApiResult<AuthUser> {
    let caller = LOGGED_IN.admit(user.get(), &Target::none()).await?;
    Ok(ApiResponse::success(caller.clone()))
}
