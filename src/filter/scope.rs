//! Row-level visibility derived from the caller's role.
//!
//! Admins see everything. Every other role sees the subtree under its own org
//! node; kestrad and plain users are anchored at the kestrad tier, so a plain
//! user (who owns no kestrad row) sees nothing.

use serde_json::Value;

use crate::auth::{AuthUser, Role};
use crate::tree::Tier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Under(Tier, String),
}

impl Scope {
    pub fn for_user(user: &AuthUser) -> Scope {
        match user.role {
            Role::Admin => Scope::All,
            Role::Provinsi => Scope::Under(Tier::Provinsi, user.username.clone()),
            Role::Kota => Scope::Under(Tier::Kota, user.username.clone()),
            Role::Puskesmas => Scope::Under(Tier::Puskesmas, user.username.clone()),
            Role::Kestrad | Role::User => Scope::Under(Tier::Kestrad, user.username.clone()),
        }
    }

    /// Predicate over rows of `target` that keeps those under the anchor.
    /// Placeholders start at `$param_index`; the returned params bind them.
    pub fn clause(&self, target: Tier, param_index: usize) -> (String, Vec<Value>) {
        match self {
            Scope::All => ("1=1".to_string(), vec![]),
            Scope::Under(anchor, username) if anchor.is_above(target) => {
                let placeholder = format!("${}", param_index);
                (chain(target, *anchor, &placeholder), vec![Value::String(username.clone())])
            }
            Scope::Under(..) => ("1=0".to_string(), vec![]),
        }
    }
}

/// Condition on rows of `tier` that holds when the row lies under the
/// `anchor` node bound to `placeholder`.
fn chain(tier: Tier, anchor: Tier, placeholder: &str) -> String {
    let (Some(parent), Some(parent_column)) = (tier.parent(), tier.parent_column()) else {
        return "1=0".to_string();
    };
    if parent == anchor {
        format!("{} = {}", parent_column, placeholder)
    } else {
        format!(
            "{} IN (SELECT {} FROM {} WHERE {})",
            parent_column,
            parent.key_column(),
            parent.table(),
            chain(parent, anchor, placeholder)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope_of(role: Role) -> Scope {
        Scope::for_user(&AuthUser::new("me", role))
    }

    #[test]
    fn roles_map_to_anchors() {
        assert_eq!(scope_of(Role::Admin), Scope::All);
        assert_eq!(scope_of(Role::Provinsi), Scope::Under(Tier::Provinsi, "me".into()));
        assert_eq!(scope_of(Role::Kota), Scope::Under(Tier::Kota, "me".into()));
        assert_eq!(scope_of(Role::Puskesmas), Scope::Under(Tier::Puskesmas, "me".into()));
        assert_eq!(scope_of(Role::Kestrad), Scope::Under(Tier::Kestrad, "me".into()));
        assert_eq!(scope_of(Role::User), Scope::Under(Tier::Kestrad, "me".into()));
    }

    #[test]
    fn direct_children_compare_the_parent_column() {
        let (sql, params) = scope_of(Role::Kestrad).clause(Tier::Layanan, 1);
        assert_eq!(sql, "username_kestrad = $1");
        assert_eq!(params, vec![Value::String("me".into())]);
    }

    #[test]
    fn deeper_targets_nest_one_subquery_per_tier() {
        let (sql, _) = scope_of(Role::Kota).clause(Tier::Hattra, 3);
        assert_eq!(
            sql,
            "id_layanan IN (SELECT id_layanan FROM layanan WHERE \
             username_kestrad IN (SELECT username FROM user_kestrad WHERE \
             username_puskesmas IN (SELECT username FROM user_puskesmas WHERE \
             username_kota = $3)))"
        );

        for anchor in [Tier::Provinsi, Tier::Kota, Tier::Puskesmas, Tier::Kestrad] {
            let scope = Scope::Under(anchor, "x".into());
            for target in anchor.descendants() {
                let (sql, params) = scope.clause(target, 1);
                let nested = sql.matches("IN (SELECT").count();
                assert_eq!(nested, target.depth() - anchor.depth() - 1, "{anchor} over {target}");
                assert_eq!(params.len(), 1);
            }
        }
    }

    #[test]
    fn anchors_at_or_below_the_target_see_nothing() {
        let (sql, params) = scope_of(Role::Kestrad).clause(Tier::Puskesmas, 1);
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());

        let (sql, _) = scope_of(Role::Kota).clause(Tier::Kota, 1);
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn admin_scope_is_unconditional() {
        let (sql, params) = Scope::All.clause(Tier::Hattra, 1);
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }
}
