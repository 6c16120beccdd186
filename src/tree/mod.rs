//! The organizational ownership tree.
//!
//! Provinsi → Kota → Puskesmas → Kestrad → Layanan → Hattra. Every tier except
//! Provinsi has exactly one parent. The four org tiers are 1:1 extensions of a
//! user account and carry a statistics row; layanan and hattra are plain
//! records keyed by id.

pub mod integrity;
pub mod pg;
pub mod store;

use serde::Serialize;
use std::fmt;

use crate::auth::Role;

pub use integrity::{delete_subtree, record_insert, DeleteSummary};
pub use pg::PgTreeTx;
pub use store::{TreeError, TreeTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Provinsi,
    Kota,
    Puskesmas,
    Kestrad,
    Layanan,
    Hattra,
}

impl Tier {
    /// Top to bottom.
    pub const ALL: [Tier; 6] = [
        Tier::Provinsi,
        Tier::Kota,
        Tier::Puskesmas,
        Tier::Kestrad,
        Tier::Layanan,
        Tier::Hattra,
    ];

    pub const fn depth(self) -> usize {
        match self {
            Tier::Provinsi => 0,
            Tier::Kota => 1,
            Tier::Puskesmas => 2,
            Tier::Kestrad => 3,
            Tier::Layanan => 4,
            Tier::Hattra => 5,
        }
    }

    pub const fn parent(self) -> Option<Tier> {
        match self {
            Tier::Provinsi => None,
            Tier::Kota => Some(Tier::Provinsi),
            Tier::Puskesmas => Some(Tier::Kota),
            Tier::Kestrad => Some(Tier::Puskesmas),
            Tier::Layanan => Some(Tier::Kestrad),
            Tier::Hattra => Some(Tier::Layanan),
        }
    }

    pub const fn child(self) -> Option<Tier> {
        match self {
            Tier::Provinsi => Some(Tier::Kota),
            Tier::Kota => Some(Tier::Puskesmas),
            Tier::Puskesmas => Some(Tier::Kestrad),
            Tier::Kestrad => Some(Tier::Layanan),
            Tier::Layanan => Some(Tier::Hattra),
            Tier::Hattra => None,
        }
    }

    /// Tiers strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = Tier> {
        Tier::ALL.into_iter().filter(move |t| t.depth() > self.depth())
    }

    /// True when `self` sits strictly above `other`.
    pub const fn is_above(self, other: Tier) -> bool {
        self.depth() < other.depth()
    }

    /// Org tiers are user accounts with a statistics row.
    pub const fn is_org(self) -> bool {
        matches!(self, Tier::Provinsi | Tier::Kota | Tier::Puskesmas | Tier::Kestrad)
    }

    pub const fn table(self) -> &'static str {
        match self {
            Tier::Provinsi => "user_provinsi",
            Tier::Kota => "user_kota",
            Tier::Puskesmas => "user_puskesmas",
            Tier::Kestrad => "user_kestrad",
            Tier::Layanan => "layanan",
            Tier::Hattra => "hattra",
        }
    }

    pub const fn key_column(self) -> &'static str {
        match self {
            Tier::Provinsi | Tier::Kota | Tier::Puskesmas | Tier::Kestrad => "username",
            Tier::Layanan => "id_layanan",
            Tier::Hattra => "id_hattra",
        }
    }

    pub const fn parent_column(self) -> Option<&'static str> {
        match self {
            Tier::Provinsi => None,
            Tier::Kota => Some("username_provinsi"),
            Tier::Puskesmas => Some("username_kota"),
            Tier::Kestrad => Some("username_puskesmas"),
            Tier::Layanan => Some("username_kestrad"),
            Tier::Hattra => Some("id_layanan"),
        }
    }

    /// Column in `org_stats` counting descendants of this tier. Provinsi has
    /// no ancestors, so nothing counts it.
    pub const fn counter_column(self) -> Option<&'static str> {
        match self {
            Tier::Provinsi => None,
            Tier::Kota => Some("count_kota"),
            Tier::Puskesmas => Some("count_puskesmas"),
            Tier::Kestrad => Some("count_kestrad"),
            Tier::Layanan => Some("count_layanan"),
            Tier::Hattra => Some("count_hattra"),
        }
    }

    pub const fn role(self) -> Option<Role> {
        match self {
            Tier::Provinsi => Some(Role::Provinsi),
            Tier::Kota => Some(Role::Kota),
            Tier::Puskesmas => Some(Role::Puskesmas),
            Tier::Kestrad => Some(Role::Kestrad),
            Tier::Layanan | Tier::Hattra => None,
        }
    }

    pub const fn for_role(role: Role) -> Option<Tier> {
        match role {
            Role::Provinsi => Some(Tier::Provinsi),
            Role::Kota => Some(Tier::Kota),
            Role::Puskesmas => Some(Tier::Puskesmas),
            Role::Kestrad => Some(Tier::Kestrad),
            Role::Admin | Role::User => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Provinsi => "provinsi",
            Tier::Kota => "kota",
            Tier::Puskesmas => "puskesmas",
            Tier::Kestrad => "kestrad",
            Tier::Layanan => "layanan",
            Tier::Hattra => "hattra",
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the tree. Org tiers are keyed by username, records by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "tier", content = "key", rename_all = "lowercase")]
pub enum NodeRef {
    Provinsi(String),
    Kota(String),
    Puskesmas(String),
    Kestrad(String),
    Layanan(i64),
    Hattra(i64),
}

/// Key value of a node, used for binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKey<'a> {
    Username(&'a str),
    Id(i64),
}

impl NodeRef {
    /// Build an org node. Returns `None` for record tiers.
    pub fn org(tier: Tier, username: impl Into<String>) -> Option<NodeRef> {
        let username = username.into();
        match tier {
            Tier::Provinsi => Some(NodeRef::Provinsi(username)),
            Tier::Kota => Some(NodeRef::Kota(username)),
            Tier::Puskesmas => Some(NodeRef::Puskesmas(username)),
            Tier::Kestrad => Some(NodeRef::Kestrad(username)),
            Tier::Layanan | Tier::Hattra => None,
        }
    }

    /// Build a record node. Returns `None` for org tiers.
    pub fn record(tier: Tier, id: i64) -> Option<NodeRef> {
        match tier {
            Tier::Layanan => Some(NodeRef::Layanan(id)),
            Tier::Hattra => Some(NodeRef::Hattra(id)),
            _ => None,
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            NodeRef::Provinsi(_) => Tier::Provinsi,
            NodeRef::Kota(_) => Tier::Kota,
            NodeRef::Puskesmas(_) => Tier::Puskesmas,
            NodeRef::Kestrad(_) => Tier::Kestrad,
            NodeRef::Layanan(_) => Tier::Layanan,
            NodeRef::Hattra(_) => Tier::Hattra,
        }
    }

    pub fn key(&self) -> NodeKey<'_> {
        match self {
            NodeRef::Provinsi(u) | NodeRef::Kota(u) | NodeRef::Puskesmas(u) | NodeRef::Kestrad(u) => {
                NodeKey::Username(u)
            }
            NodeRef::Layanan(id) | NodeRef::Hattra(id) => NodeKey::Id(*id),
        }
    }

    /// Username of the account behind an org node.
    pub fn username(&self) -> Option<&str> {
        match self.key() {
            NodeKey::Username(u) => Some(u),
            NodeKey::Id(_) => None,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            NodeKey::Username(u) => write!(f, "{} '{}'", self.tier(), u),
            NodeKey::Id(id) => write!(f, "{} #{}", self.tier(), id),
        }
    }
}
