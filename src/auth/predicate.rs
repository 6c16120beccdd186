//! Role and status predicates.
//!
//! The free functions classify a single user and are the building blocks for
//! the [`Predicate`] implementations that gates evaluate. Asynchronous
//! predicates (database lookups) implement the same trait, so a gate never
//! needs to know which kind it holds.

use async_trait::async_trait;
use thiserror::Error;

use super::role::{Role, Status};
use super::AuthUser;

/// Resource a request addresses, as far as authorization cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target<'a> {
    /// Username owning the resource (usually a `:username` path parameter)
    pub username: Option<&'a str>,
}

impl<'a> Target<'a> {
    pub const fn none() -> Self {
        Self { username: None }
    }

    pub const fn user(username: &'a str) -> Self {
        Self { username: Some(username) }
    }

    pub fn is_owned_by(&self, user: &AuthUser) -> bool {
        self.username == Some(user.username.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PredicateError {
    #[error("authorization lookup failed: {0}")]
    Lookup(String),
}

pub fn is_admin(user: &AuthUser) -> bool {
    user.role == Role::Admin
}

pub fn is_provinsi(user: &AuthUser) -> bool {
    user.role == Role::Provinsi
}

pub fn is_kota(user: &AuthUser) -> bool {
    user.role == Role::Kota
}

pub fn is_puskesmas(user: &AuthUser) -> bool {
    user.role == Role::Puskesmas
}

pub fn is_kestrad(user: &AuthUser) -> bool {
    user.role == Role::Kestrad
}

pub fn is_user(user: &AuthUser) -> bool {
    user.role == Role::User
}

pub fn is_active(user: &AuthUser) -> bool {
    user.status == Status::Active
}

pub fn is_awaiting_validation(user: &AuthUser) -> bool {
    user.status == Status::AwaitingValidation
}

pub fn is_disabled(user: &AuthUser) -> bool {
    user.status == Status::Disabled
}

/// Supervisors may override ownership checks. Only admins qualify.
pub fn is_supervisor(user: &AuthUser) -> bool {
    is_admin(user)
}

pub fn is_at_least(user: &AuthUser, threshold: Role) -> bool {
    user.role.at_least(threshold)
}

pub fn is_provinsi_or_higher(user: &AuthUser) -> bool {
    is_at_least(user, Role::Provinsi)
}

pub fn is_kota_or_higher(user: &AuthUser) -> bool {
    is_at_least(user, Role::Kota)
}

pub fn is_puskesmas_or_higher(user: &AuthUser) -> bool {
    is_at_least(user, Role::Puskesmas)
}

pub fn is_kestrad_or_higher(user: &AuthUser) -> bool {
    is_at_least(user, Role::Kestrad)
}

/// Ownership grants access regardless of role; otherwise `check` decides.
pub fn is_owner_or(user: &AuthUser, target: &Target<'_>, check: impl FnOnce(&AuthUser) -> bool) -> bool {
    target.is_owned_by(user) || check(user)
}

pub fn is_owner_or_supervisor(user: &AuthUser, target: &Target<'_>) -> bool {
    is_owner_or(user, target, is_supervisor)
}

#[async_trait]
pub trait Predicate: Send + Sync {
    async fn evaluate(&self, user: &AuthUser, target: &Target<'_>) -> Result<bool, PredicateError>;
}

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated;

#[async_trait]
impl Predicate for Authenticated {
    async fn evaluate(&self, _user: &AuthUser, _target: &Target<'_>) -> Result<bool, PredicateError> {
        Ok(true)
    }
}

/// Exactly this role.
#[derive(Debug, Clone, Copy)]
pub struct RoleIs(pub Role);

#[async_trait]
impl Predicate for RoleIs {
    async fn evaluate(&self, user: &AuthUser, _target: &Target<'_>) -> Result<bool, PredicateError> {
        Ok(user.role == self.0)
    }
}

/// This role or any role above it.
#[derive(Debug, Clone, Copy)]
pub struct RoleAtLeast(pub Role);

#[async_trait]
impl Predicate for RoleAtLeast {
    async fn evaluate(&self, user: &AuthUser, _target: &Target<'_>) -> Result<bool, PredicateError> {
        Ok(is_at_least(user, self.0))
    }
}

/// The target's owner, or whoever satisfies the inner predicate.
#[derive(Debug, Clone, Copy)]
pub struct OwnerOr<P>(pub P);

#[async_trait]
impl<P: Predicate> Predicate for OwnerOr<P> {
    async fn evaluate(&self, user: &AuthUser, target: &Target<'_>) -> Result<bool, PredicateError> {
        if target.is_owned_by(user) {
            return Ok(true);
        }
        self.0.evaluate(user, target).await
    }
}

/// Either predicate; the second only runs when the first says no.
#[derive(Debug, Clone, Copy)]
pub struct Or<A, B>(pub A, pub B);

#[async_trait]
impl<A: Predicate, B: Predicate> Predicate for Or<A, B> {
    async fn evaluate(&self, user: &AuthUser, target: &Target<'_>) -> Result<bool, PredicateError> {
        if self.0.evaluate(user, target).await? {
            return Ok(true);
        }
        self.1.evaluate(user, target).await
    }
}

/// Adapts a plain function into a predicate.
#[derive(Debug, Clone, Copy)]
pub struct FnPredicate<F>(pub F);

#[async_trait]
impl<F> Predicate for FnPredicate<F>
where
    F: Fn(&AuthUser, &Target<'_>) -> bool + Send + Sync,
{
    async fn evaluate(&self, user: &AuthUser, target: &Target<'_>) -> Result<bool, PredicateError> {
        Ok((self.0)(user, target))
    }
}

/// Admins, or an org unit that is an ancestor of the target account in the
/// ownership tree. Requires a database lookup unless the caller is an admin.
#[derive(Debug, Clone, Copy)]
pub struct SupervisesTarget;

#[async_trait]
impl Predicate for SupervisesTarget {
    async fn evaluate(&self, user: &AuthUser, target: &Target<'_>) -> Result<bool, PredicateError> {
        if is_supervisor(user) {
            return Ok(true);
        }
        let Some(target_username) = target.username else {
            return Ok(false);
        };
        let pool = crate::database::DatabaseManager::pool()
            .await
            .map_err(|e| PredicateError::Lookup(e.to_string()))?;
        crate::services::org_service::is_ancestor(&pool, &user.username, target_username)
            .await
            .map_err(|e| PredicateError::Lookup(e.to_string()))
    }
}
