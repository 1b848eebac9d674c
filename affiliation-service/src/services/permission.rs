//! Effective-permission lookup.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::error::DataAccessError;
use super::repository::{AffiliationRepository, OrganizationRepository, PermissionChecker};
use crate::models::Permission;

/// Permission checker backed by the affiliation relation.
///
/// A `super_admin` of the configured super-admin organization is treated as
/// `super_admin` everywhere. Everyone else gets their own edge's permission.
#[derive(Clone)]
pub struct AffiliationPermissionChecker {
    orgs: Arc<dyn OrganizationRepository>,
    affiliations: Arc<dyn AffiliationRepository>,
    super_admin_org_slug: Option<String>,
}

impl AffiliationPermissionChecker {
    pub fn new(
        orgs: Arc<dyn OrganizationRepository>,
        affiliations: Arc<dyn AffiliationRepository>,
        super_admin_org_slug: Option<String>,
    ) -> Self {
        Self {
            orgs,
            affiliations,
            super_admin_org_slug,
        }
    }

    async fn is_global_super_admin(&self, user_key: Uuid) -> Result<bool, DataAccessError> {
        let Some(slug) = self.super_admin_org_slug.as_deref() else {
            return Ok(false);
        };
        let Some(org) = self.orgs.find_org_by_slug(slug).await? else {
            return Ok(false);
        };
        let affiliation = self.affiliations.find_affiliation(org.org_key, user_key).await?;
        Ok(affiliation.is_some_and(|a| a.permission == Permission::SuperAdmin))
    }
}

#[async_trait]
impl PermissionChecker for AffiliationPermissionChecker {
    async fn check_permission(
        &self,
        user_key: Uuid,
        org_key: Uuid,
    ) -> Result<Option<Permission>, DataAccessError> {
        if self.is_global_super_admin(user_key).await? {
            return Ok(Some(Permission::SuperAdmin));
        }

        Ok(self
            .affiliations
            .find_affiliation(org_key, user_key)
            .await?
            .map(|a| a.permission))
    }
}
