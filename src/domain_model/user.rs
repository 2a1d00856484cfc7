use super::SessionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(UserId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Banned => "BANNED",
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "SUSPENDED" => Ok(AccountStatus::Suspended),
            "BANNED" => Ok(AccountStatus::Banned),
            other => Err(format!("unknown account status: {other}")),
        }
    }
}

pub const ROLE_ADMIN: &str = "ROLE_ADMIN";
pub const ROLE_STAFF: &str = "ROLE_STAFF";
pub const ROLE_USER: &str = "ROLE_USER";

/// Authorities allowed to moderate listings.
pub const MODERATOR_AUTHORITIES: &[&str] = &[ROLE_ADMIN, ROLE_STAFF];

/// A user as the directory knows it.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub user_id: UserId,
    pub username: String,
    pub authorities: BTreeSet<String>,
    pub account_status: AccountStatus,
}

/// Identity resolved for the current request.
///
/// Lives for a single request only; it is rebuilt from the token and the user
/// directory every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub authorities: BTreeSet<String>,
    pub session_id: SessionId,
}

impl Identity {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub fn has_any_authority(&self, authorities: &[&str]) -> bool {
        authorities.iter().any(|a| self.has_authority(a))
    }
}
