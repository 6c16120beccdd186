pub mod auth;
pub mod response;

pub use auth::{identity_middleware, CurrentUser};
pub use response::{Affected, ApiResponse, ApiResult};
