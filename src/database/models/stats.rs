use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Descendant counters of one org unit. Tiers not below the unit stay zero.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrgStats {
    pub username: String,
    pub tier: String,
    pub parent_username: Option<String>,
    pub count_kota: i64,
    pub count_puskesmas: i64,
    pub count_kestrad: i64,
    pub count_layanan: i64,
    pub count_hattra: i64,
}
