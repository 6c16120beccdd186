use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::Verification;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Hattra {
    pub id_hattra: i64,
    pub id_layanan: i64,
    pub nama: String,
    pub ijin_hattra: Option<String>,
    #[sqlx(try_from = "String")]
    pub verified: Verification,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
