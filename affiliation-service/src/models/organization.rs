//! Organization model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Organization. The slug is locale independent and only used for logging
/// and for locating the super-admin organization.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Organization {
    pub org_key: Uuid,
    pub slug: String,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

impl Organization {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org_key: Uuid::new_v4(),
            slug: slug.into(),
            name: name.into(),
            created_utc: Utc::now(),
        }
    }
}
