//! Affiliation permission levels.
//!
//! The three levels form a total order `User < Admin < SuperAdmin`. Every
//! comparison goes through [`Permission::rank`], never through the wire or
//! storage spelling.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Permission carried by an affiliation edge.
///
/// Serialized as the GraphQL enum spelling (`USER`, `ADMIN`, `SUPER_ADMIN`);
/// the lowercase storage spelling is accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    #[serde(alias = "user")]
    User,
    #[serde(alias = "admin")]
    Admin,
    #[serde(alias = "super_admin")]
    SuperAdmin,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Permission::User, Permission::Admin, Permission::SuperAdmin];

    /// Privilege rank; higher is more privileged.
    pub fn rank(self) -> u8 {
        match self {
            Permission::User => 0,
            Permission::Admin => 1,
            Permission::SuperAdmin => 2,
        }
    }

    /// Storage spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::User => "user",
            Permission::Admin => "admin",
            Permission::SuperAdmin => "super_admin",
        }
    }

    /// True when `self` is strictly more privileged than `other`.
    pub fn outranks(self, other: Permission) -> bool {
        self.rank() > other.rank()
    }
}

impl PartialOrd for Permission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Permission {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Permission::User),
            "admin" => Ok(Permission::Admin),
            "super_admin" => Ok(Permission::SuperAdmin),
            _ => Err(format!("Invalid permission: {}", s)),
        }
    }
}
