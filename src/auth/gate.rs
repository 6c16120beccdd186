//! Authorization gates.
//!
//! A gate wraps a [`Predicate`] and turns an optional caller identity into an
//! explicit [`Decision`]. Handlers consume the decision; nothing about the
//! request is mutated along the way.

use super::predicate::{
    Authenticated, OwnerOr, Predicate, RoleAtLeast, RoleIs, SupervisesTarget, Target,
};
use super::role::Role;
use super::AuthUser;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity attached to the request
    Unauthenticated,
    /// Identity present, predicate said no (or could not be evaluated)
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => ApiError::unauthorized("Not logged in."),
            DenyReason::Forbidden => ApiError::forbidden("Forbidden"),
        }
    }
}

pub struct Gate<P> {
    predicate: P,
}

impl<P> Gate<P> {
    pub const fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<P: Predicate> Gate<P> {
    pub async fn decide(&self, user: Option<&AuthUser>, target: &Target<'_>) -> Decision {
        let Some(user) = user else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };

        match self.predicate.evaluate(user, target).await {
            Ok(true) => Decision::Allow,
            Ok(false) => {
                tracing::debug!("Authorization denied for '{}' ({})", user.username, user.role);
                Decision::Deny(DenyReason::Forbidden)
            }
            Err(e) => {
                tracing::warn!("Authorization predicate failed for '{}': {}", user.username, e);
                Decision::Deny(DenyReason::Forbidden)
            }
        }
    }

    /// Decide and hand back the admitted caller, or the matching error.
    pub async fn admit<'u>(
        &self,
        user: Option<&'u AuthUser>,
        target: &Target<'_>,
    ) -> Result<&'u AuthUser, ApiError> {
        self.decide(user, target).await.into_result()?;
        // decide() only allows when an identity is present
        user.ok_or_else(|| DenyReason::Unauthenticated.into())
    }
}

pub static LOGGED_IN: Gate<Authenticated> = Gate::new(Authenticated);

pub static ADMIN: Gate<RoleIs> = Gate::new(RoleIs(Role::Admin));
pub static KOTA: Gate<RoleIs> = Gate::new(RoleIs(Role::Kota));
pub static PUSKESMAS: Gate<RoleIs> = Gate::new(RoleIs(Role::Puskesmas));
pub static KESTRAD: Gate<RoleIs> = Gate::new(RoleIs(Role::Kestrad));

pub static PROVINSI_OR_HIGHER: Gate<RoleAtLeast> = Gate::new(RoleAtLeast(Role::Provinsi));
pub static KOTA_OR_HIGHER: Gate<RoleAtLeast> = Gate::new(RoleAtLeast(Role::Kota));
pub static PUSKESMAS_OR_HIGHER: Gate<RoleAtLeast> = Gate::new(RoleAtLeast(Role::Puskesmas));
pub static KESTRAD_OR_HIGHER: Gate<RoleAtLeast> = Gate::new(RoleAtLeast(Role::Kestrad));

pub static OWNER_OR_SUPERVISOR: Gate<OwnerOr<RoleIs>> = Gate::new(OwnerOr(RoleIs(Role::Admin)));
pub static SUPERVISES_TARGET: Gate<SupervisesTarget> = Gate::new(SupervisesTarget);
pub static OWNER_OR_SUPERVISES_TARGET: Gate<OwnerOr<SupervisesTarget>> = Gate::new(OwnerOr(SupervisesTarget));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::predicate::{FnPredicate, PredicateError};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl Predicate for Failing {
        async fn evaluate(&self, _user: &AuthUser, _target: &Target<'_>) -> Result<bool, PredicateError> {
            Err(PredicateError::Lookup("connection refused".to_string()))
        }
    }

    struct MustNotRun;

    #[async_trait]
    impl Predicate for MustNotRun {
        async fn evaluate(&self, _user: &AuthUser, _target: &Target<'_>) -> Result<bool, PredicateError> {
            panic!("predicate evaluated without an identity");
        }
    }

    fn never(_: &AuthUser, _: &Target<'_>) -> bool {
        false
    }

    #[tokio::test]
    async fn missing_identity_is_unauthenticated_before_predicate_runs() {
        let gate = Gate::new(MustNotRun);
        assert_eq!(
            gate.decide(None, &Target::none()).await,
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn failing_predicate_is_forbidden() {
        let user = AuthUser::new("kota_a", Role::Kota);
        let gate = Gate::new(FnPredicate(never));
        assert_eq!(
            gate.decide(Some(&user), &Target::none()).await,
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn erroring_predicate_is_forbidden_not_a_crash() {
        let user = AuthUser::new("kota_a", Role::Kota);
        let gate = Gate::new(Failing);
        let decision = gate.decide(Some(&user), &Target::none()).await;
        assert_eq!(decision, Decision::Deny(DenyReason::Forbidden));

        let err = decision.into_result().unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn passing_predicate_admits_the_caller_unchanged() {
        let user = AuthUser::new("pusk_sehatjaya", Role::Puskesmas);
        let admitted = KESTRAD_OR_HIGHER.admit(Some(&user), &Target::none()).await.unwrap();
        assert_eq!(admitted, &user);
    }

    #[tokio::test]
    async fn gates_are_idempotent() {
        let target = Target::user("kestrad_budi");
        for role in Role::ALL {
            let user = AuthUser::new("someone", role);
            let first = KOTA_OR_HIGHER.decide(Some(&user), &target).await;
            let second = KOTA_OR_HIGHER.decide(Some(&user), &target).await;
            assert_eq!(first, second);
            assert_eq!(first.is_allowed(), role.at_least(Role::Kota));
        }
    }

    #[tokio::test]
    async fn owner_or_supervisor_gate() {
        let owner = AuthUser::new("kestrad_budi", Role::Kestrad);
        let stranger = AuthUser::new("kestrad_ani", Role::Kestrad);
        let admin = AuthUser::new("root", Role::Admin);
        let target = Target::user("kestrad_budi");

        assert!(OWNER_OR_SUPERVISOR.decide(Some(&owner), &target).await.is_allowed());
        assert!(OWNER_OR_SUPERVISOR.decide(Some(&admin), &target).await.is_allowed());
        assert_eq!(
            OWNER_OR_SUPERVISOR.decide(Some(&stranger), &target).await,
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[tokio::test]
    async fn deny_reasons_map_to_status_codes() {
        assert_eq!(ApiError::from(DenyReason::Unauthenticated).status_code(), 401);
        assert_eq!(ApiError::from(DenyReason::Forbidden).status_code(), 403);
    }
}
