use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    #[error("unknown role: {0}")]
    Role(String),

    #[error("unknown status: {0}")]
    Status(String),

    #[error("unknown verification state: {0}")]
    Verification(String),
}

/// Account roles, highest authority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Provinsi,
    Kota,
    Puskesmas,
    Kestrad,
    User,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::Provinsi,
        Role::Kota,
        Role::Puskesmas,
        Role::Kestrad,
        Role::User,
    ];

    /// Position in the hierarchy; larger means more authority.
    /// This is the only place the ordering is defined.
    pub const fn rank(self) -> u8 {
        match self {
            Role::Admin => 5,
            Role::Provinsi => 4,
            Role::Kota => 3,
            Role::Puskesmas => 2,
            Role::Kestrad => 1,
            Role::User => 0,
        }
    }

    /// True when `self` sits at or above `threshold`.
    pub const fn at_least(self, threshold: Role) -> bool {
        self.rank() >= threshold.rank()
    }

    /// Role an account created by `self` receives. Roles without an
    /// organizational child (kestrad, user) create plain users.
    pub const fn child(self) -> Role {
        match self {
            Role::Admin => Role::Provinsi,
            Role::Provinsi => Role::Kota,
            Role::Kota => Role::Puskesmas,
            Role::Puskesmas => Role::Kestrad,
            Role::Kestrad | Role::User => Role::User,
        }
    }

    /// Prefix for generated usernames.
    pub const fn username_prefix(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Provinsi => "prov",
            Role::Kota => "kota",
            Role::Puskesmas => "pusk",
            Role::Kestrad => "kestrad",
            Role::User => "user",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Provinsi => "provinsi",
            Role::Kota => "kota",
            Role::Puskesmas => "puskesmas",
            Role::Kestrad => "kestrad",
            Role::User => "user",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseEnumError::Role(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Active,
    #[serde(alias = "awaiting_validation")]
    AwaitingValidation,
    Disabled,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::AwaitingValidation => "awaiting-validation",
            Status::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "awaiting-validation" | "awaiting_validation" => Ok(Status::AwaitingValidation),
            "disabled" => Ok(Status::Disabled),
            other => Err(ParseEnumError::Status(other.to_string())),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Verification state of layanan and hattra records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Pending,
    Active,
    Disabled,
}

impl Verification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Verification::Pending => "pending",
            Verification::Active => "active",
            Verification::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verification {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Verification::Pending),
            "active" => Ok(Verification::Active),
            "disabled" => Ok(Verification::Disabled),
            other => Err(ParseEnumError::Verification(other.to_string())),
        }
    }
}

impl TryFrom<String> for Verification {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
