//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// User account. Read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub user_key: Uuid,
    /// Unique login name (an email address in practice).
    pub user_name: String,
    pub display_name: String,
    pub email_validated: bool,
    pub tfa_validated: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new, unvalidated user.
    pub fn new(user_name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_key: Uuid::new_v4(),
            user_name: user_name.into(),
            display_name: display_name.into(),
            email_validated: false,
            tfa_validated: false,
            created_utc: Utc::now(),
        }
    }
}

/// User view returned by mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub user_name: String,
    pub display_name: String,
    pub email_validated: bool,
    pub tfa_validated: bool,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.user_key,
            user_name: u.user_name.clone(),
            display_name: u.display_name.clone(),
            email_validated: u.email_validated,
            tfa_validated: u.tfa_validated,
        }
    }
}
