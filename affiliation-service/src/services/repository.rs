//! Storage collaborators consumed by the role update authorizer.
//!
//! Each capability is a separate trait so callers depend only on what they
//! use. [`super::Database`] and [`super::MemoryStore`] implement all of them.

use async_trait::async_trait;
use uuid::Uuid;

use super::error::DataAccessError;
use crate::models::{Affiliation, Organization, Permission, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_key(&self, user_key: Uuid) -> Result<Option<User>, DataAccessError>;

    async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<User>, DataAccessError>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_org_by_key(&self, org_key: Uuid)
        -> Result<Option<Organization>, DataAccessError>;

    async fn find_org_by_slug(&self, slug: &str) -> Result<Option<Organization>, DataAccessError>;
}

/// Read side of the affiliation relation.
#[async_trait]
pub trait AffiliationRepository: Send + Sync {
    /// Current edge between `org_key` and `user_key`, if any.
    async fn find_affiliation(
        &self,
        org_key: Uuid,
        user_key: Uuid,
    ) -> Result<Option<Affiliation>, DataAccessError>;
}

/// Resolves a user's effective permission in an organization.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn check_permission(
        &self,
        user_key: Uuid,
        org_key: Uuid,
    ) -> Result<Option<Permission>, DataAccessError>;
}

/// A write issued inside an [`AffiliationTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffiliationWrite {
    /// Insert the edge, or overwrite its permission when it already exists.
    UpsertPermission {
        org_key: Uuid,
        user_key: Uuid,
        permission: Permission,
    },
}

/// Scoped write transaction. Dropping it without [`commit`](Self::commit)
/// discards every executed write.
#[async_trait]
pub trait AffiliationTransaction: Send {
    async fn execute(&mut self, write: AffiliationWrite) -> Result<(), DataAccessError>;

    async fn commit(self: Box<Self>) -> Result<(), DataAccessError>;
}

#[async_trait]
pub trait TransactionRunner: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AffiliationTransaction>, DataAccessError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), DataAccessError>;
}
