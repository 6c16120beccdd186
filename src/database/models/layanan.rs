use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Verification;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Layanan {
    pub id_layanan: i64,
    pub username_kestrad: String,
    pub nama_layanan: String,
    #[sqlx(try_from = "String")]
    pub verified: Verification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
