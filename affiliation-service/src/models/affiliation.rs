//! Affiliation model - the organization → user edge carrying a permission.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Permission;

/// Affiliation edge. At most one exists per (organization, user) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affiliation {
    pub org_key: Uuid,
    pub user_key: Uuid,
    pub permission: Permission,
    pub updated_utc: DateTime<Utc>,
}

impl Affiliation {
    pub fn new(org_key: Uuid, user_key: Uuid, permission: Permission) -> Self {
        Self {
            org_key,
            user_key,
            permission,
            updated_utc: Utc::now(),
        }
    }
}
