use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use super::{shared_pool, username, FieldErrors, ServiceError};
use crate::auth::{self, AuthUser, Claims, Role, Status};
use crate::config;
use crate::database::models::{User, UserSummary};
use crate::database::QueryBuilder;
use crate::filter::{Filter, ListParams, Page, SearchParams};
use crate::tree::{self, NodeRef, PgTreeTx, Tier};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub nim: Option<String>,
    /// Display name of the org unit; also the source of generated usernames
    pub nama: Option<String>,
    pub kepala_dinas: Option<String>,
    pub alamat: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub email: Option<String>,
    #[serde(alias = "password")]
    pub new_password: Option<String>,
    pub old_password: Option<String>,
    pub nim: Option<String>,
    pub status: Option<Status>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
    pub expires_in: u64,
}

/// Role and status an account receives from its creator.
pub fn placement_for(creator: Option<&AuthUser>) -> (Role, Status) {
    let role = creator.map_or(Role::User, |c| c.role.child());
    let status = if Tier::for_role(role).is_some() {
        Status::Active
    } else {
        Status::AwaitingValidation
    };
    (role, status)
}

/// Parent node of an org account created by `creator`.
fn parent_node(tier: Tier, creator: Option<&AuthUser>) -> Option<NodeRef> {
    let parent_tier = tier.parent()?;
    NodeRef::org(parent_tier, creator?.username.clone())
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, ServiceError> {
        Ok(Self::with_pool(shared_pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn summary_filter() -> Result<Filter, ServiceError> {
        let mut filter = Filter::new("users")?;
        filter
            .select(UserSummary::COLUMNS)?
            .searchable(&["username", "email", "nim"])?
            .sortable(&["username", "role", "status", "created_at"])?;
        Ok(filter)
    }

    pub async fn list(&self, params: &ListParams) -> Result<Page<UserSummary>, ServiceError> {
        let mut filter = Self::summary_filter()?;
        filter.assign(params)?;
        Ok(QueryBuilder::new(filter).fetch_page(&self.pool).await?)
    }

    /// Unpaginated search capped at the configured limit, optionally
    /// restricted to one role (`category`).
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<UserSummary>, ServiceError> {
        let mut filter = Self::summary_filter()?;
        if let Some(category) = params.category.as_deref().filter(|c| !c.is_empty()) {
            let role: Role = category
                .parse()
                .map_err(|e: crate::auth::role::ParseEnumError| ServiceError::validation(e.to_string()))?;
            filter.where_eq("role", role.as_str())?;
        }
        if let Some(term) = &params.search {
            filter.search(term);
        }
        filter.limit(config::config().api.search_limit, None)?;
        Ok(QueryBuilder::new(filter).select_all(&self.pool).await?)
    }

    pub async fn get(&self, username: &str) -> Result<UserSummary, ServiceError> {
        let mut filter = Self::summary_filter()?;
        filter.where_eq("username", username)?;
        QueryBuilder::new(filter)
            .select_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))
    }

    async fn find_account(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Create an account on behalf of `creator` (anonymous when `None`).
    ///
    /// Org accounts get their extension row under the creator and their
    /// statistics row in the same transaction.
    pub async fn create(&self, creator: Option<&AuthUser>, input: CreateUser) -> Result<UserSummary, ServiceError> {
        let (role, status) = placement_for(creator);
        let tier = Tier::for_role(role);

        let mut errors = FieldErrors::new();
        let requested = input.username.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let username = match (requested, input.nama.as_deref()) {
            (Some(u), _) => Some(u.to_string()),
            (None, Some(nama)) if tier.is_some() && !nama.trim().is_empty() => Some(username::generate(role, nama)),
            _ => {
                errors.add("username", "Provide a username, or a nama to generate one from");
                None
            }
        };
        if let Some(u) = &username {
            if u.chars().count() > username::MAX_USERNAME_LEN {
                errors.add("username", "Username is too long");
            }
        }
        errors.into_result()?;
        let username = username.ok_or_else(|| ServiceError::validation("Missing username"))?;

        let password = input.password.as_deref().filter(|p| !p.is_empty()).unwrap_or(&username);
        let hash = auth::hash_password(password)?;

        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let summary = sqlx::query_as::<_, UserSummary>(
            "INSERT INTO users (username, password, role, status, email, nim) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING username, role, status, email, nim, created_at, updated_at",
        )
        .bind(&username)
        .bind(&hash)
        .bind(role.as_str())
        .bind(status.as_str())
        .bind(&input.email)
        .bind(&input.nim)
        .fetch_one(tx.conn())
        .await?;

        if let Some(tier) = tier {
            let parent = parent_node(tier, creator);
            insert_extension(&mut tx, tier, &username, parent.as_ref(), &input).await?;
            if let Some(node) = NodeRef::org(tier, username.clone()) {
                tree::record_insert(&mut tx, &node, parent.as_ref()).await?;
            }
        }
        tx.commit().await?;

        info!("Created {} account '{}'", role, username);
        Ok(summary)
    }

    /// Apply an update. Supervisors may change everything without the old
    /// password; owners only email and password, with the old password.
    pub async fn update(&self, caller: &AuthUser, username: &str, input: UpdateUser) -> Result<u64, ServiceError> {
        let account = self
            .find_account(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;
        let supervisor = crate::auth::predicate::is_supervisor(caller);

        if !supervisor && (input.role.is_some() || input.status.is_some() || input.nim.is_some()) {
            return Err(ServiceError::Forbidden(
                "Only a supervisor may change role, status or nim".to_string(),
            ));
        }

        if let Some(role) = input.role {
            let moves_in_tree = Tier::for_role(role).is_some() || Tier::for_role(account.role).is_some();
            if role != account.role && moves_in_tree {
                return Err(ServiceError::Conflict(
                    "Org accounts keep their role; delete and recreate the unit instead".to_string(),
                ));
            }
        }

        let mut errors = FieldErrors::new();
        let new_hash = match input.new_password.as_deref() {
            Some("") => {
                errors.add("newPassword", "Password cannot be empty");
                None
            }
            Some(new_password) => {
                if !supervisor {
                    let old_ok = input
                        .old_password
                        .as_deref()
                        .is_some_and(|old| auth::verify_password(old, &account.password));
                    if !old_ok {
                        errors.add("oldPassword", "Old password is incorrect");
                    }
                }
                Some(auth::hash_password(new_password)?)
            }
            None => None,
        };
        errors.into_result()?;

        let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE users SET updated_at = now()");
        if let Some(email) = &input.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(hash) = &new_hash {
            query.push(", password = ").push_bind(hash);
        }
        if let Some(nim) = &input.nim {
            query.push(", nim = ").push_bind(nim);
        }
        if let Some(status) = input.status {
            query.push(", status = ").push_bind(status.as_str());
        }
        if let Some(role) = input.role {
            query.push(", role = ").push_bind(role.as_str());
        }
        query.push(" WHERE username = ").push_bind(username);

        let affected = query.build().execute(&self.pool).await?.rows_affected();
        info!("Updated account '{}' by '{}'", username, caller.username);
        Ok(affected)
    }

    /// Delete an account. Org accounts take their whole subtree with them.
    pub async fn delete(&self, username: &str) -> Result<u64, ServiceError> {
        let account = self
            .find_account(username)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found.".to_string()))?;

        let node = Tier::for_role(account.role).and_then(|tier| NodeRef::org(tier, account.username.clone()));
        let mut tx = PgTreeTx::begin(&self.pool).await?;
        let affected = match node {
            Some(node) => tree::delete_subtree(&mut tx, &node).await?.total(),
            None => sqlx::query("DELETE FROM users WHERE username = $1")
                .bind(username)
                .execute(tx.conn())
                .await?
                .rows_affected(),
        };
        tx.commit().await?;
        Ok(affected)
    }

    /// Check credentials and issue a token. Only active accounts may log in.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let account = self.find_account(&request.username).await?.ok_or_else(invalid)?;
        if !auth::verify_password(&request.password, &account.password) {
            return Err(invalid());
        }
        if account.status != Status::Active {
            return Err(ServiceError::Forbidden(format!("Account is {}", account.status)));
        }

        let claims = Claims::new(account.username.clone(), account.role, account.status);
        let token = auth::generate_jwt(&claims)?;
        info!("Login for '{}'", account.username);

        Ok(LoginResponse {
            token,
            user: account.into(),
            expires_in: config::config().security.jwt_expiry_hours * 3600,
        })
    }
}

async fn insert_extension(
    tx: &mut PgTreeTx,
    tier: Tier,
    username: &str,
    parent: Option<&NodeRef>,
    input: &CreateUser,
) -> Result<(), ServiceError> {
    let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!("INSERT INTO {} (username", tier.table()));
    if let Some(column) = tier.parent_column() {
        query.push(", ").push(column);
    }
    query.push(", nama, alamat");
    if tier != Tier::Kestrad {
        query.push(", kepala_dinas");
    }

    query.push(") VALUES (").push_bind(username);
    if tier.parent_column().is_some() {
        let parent_username = parent
            .and_then(NodeRef::username)
            .ok_or_else(|| ServiceError::validation(format!("{} needs a parent", tier)))?;
        query.push(", ").push_bind(parent_username.to_string());
    }
    query.push(", ").push_bind(input.nama.clone());
    query.push(", ").push_bind(input.alamat.clone());
    if tier != Tier::Kestrad {
        query.push(", ").push_bind(input.kepala_dinas.clone());
    }
    query.push(")");

    query.build().execute(tx.conn()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creators_place_accounts_one_level_down() {
        let cases = [
            (Role::Admin, Role::Provinsi, Status::Active),
            (Role::Provinsi, Role::Kota, Status::Active),
            (Role::Kota, Role::Puskesmas, Status::Active),
            (Role::Puskesmas, Role::Kestrad, Status::Active),
            (Role::Kestrad, Role::User, Status::AwaitingValidation),
            (Role::User, Role::User, Status::AwaitingValidation),
        ];
        for (creator_role, role, status) in cases {
            let creator = AuthUser::new("creator", creator_role);
            assert_eq!(placement_for(Some(&creator)), (role, status), "{creator_role}");
        }
        assert_eq!(placement_for(None), (Role::User, Status::AwaitingValidation));
    }

    #[test]
    fn parent_of_new_org_account_is_the_creator() {
        let kota = AuthUser::new("kota_bandung", Role::Kota);
        assert_eq!(
            parent_node(Tier::Puskesmas, Some(&kota)),
            Some(NodeRef::Kota("kota_bandung".into()))
        );
        assert_eq!(parent_node(Tier::Provinsi, Some(&AuthUser::new("root", Role::Admin))), None);
        assert_eq!(parent_node(Tier::Kota, None), None);
    }

    #[test]
    fn update_body_uses_camel_case_names() {
        let body: UpdateUser = serde_json::from_value(serde_json::json!({
            "newPassword": "baru",
            "oldPassword": "lama",
            "status": "disabled"
        }))
        .unwrap();
        assert_eq!(body.new_password.as_deref(), Some("baru"));
        assert_eq!(body.old_password.as_deref(), Some("lama"));
        assert_eq!(body.status, Some(Status::Disabled));
    }
}
