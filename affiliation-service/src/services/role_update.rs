//! Role update authorizer.
//!
//! Decides whether a requester may change a target user's permission in an
//! organization and, when allowed, upserts the affiliation in a single
//! transaction. Every terminal outcome emits exactly one log event.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. the requester is not targeting themselves,
//! 2. the target user name resolves,
//! 3. the organization resolves,
//! 4. the requester holds a permission in the organization,
//! 5. the target is affiliated with the organization,
//! 6. the requester strictly outranks the target's current permission and
//!    does not grant more than they hold.

use metrics::counter;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use uuid::Uuid;

use super::error::{DataAccessError, RoleUpdateFailure};
use super::i18n::{Locale, Localizer, MessageId};
use super::permission::AffiliationPermissionChecker;
use super::repository::{
    AffiliationRepository, AffiliationWrite, OrganizationRepository, PermissionChecker,
    TransactionRunner, UserRepository,
};
use crate::models::{Permission, UserView};

/// Rejection code used for every business rejection.
pub const REJECTION_CODE: u16 = 400;

#[derive(Debug, Clone)]
pub struct RoleUpdateRequest {
    pub requester_key: Uuid,
    pub user_name: String,
    pub org_key: Uuid,
    pub role: Permission,
    pub locale: Locale,
}

/// Why a request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SelfUpdate,
    UnknownUser,
    UnknownOrganization,
    RequesterNotAffiliated,
    TargetNotAffiliated,
    InsufficientPrivilege,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::SelfUpdate => "self_update",
            Rejection::UnknownUser => "unknown_user",
            Rejection::UnknownOrganization => "unknown_organization",
            Rejection::RequesterNotAffiliated => "requester_not_affiliated",
            Rejection::TargetNotAffiliated => "target_not_affiliated",
            Rejection::InsufficientPrivilege => "insufficient_privilege",
        }
    }

    fn message_id(&self) -> MessageId {
        match self {
            Rejection::SelfUpdate => MessageId::SelfRoleUpdate,
            Rejection::UnknownUser => MessageId::UnknownUser,
            Rejection::UnknownOrganization => MessageId::UnknownOrganization,
            Rejection::RequesterNotAffiliated => MessageId::RequesterNotAffiliated,
            Rejection::TargetNotAffiliated => MessageId::TargetNotAffiliated,
            Rejection::InsufficientPrivilege => MessageId::InsufficientPrivilege,
        }
    }
}

/// Typed result of a role update, serialized as the mutation's union member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "__typename")]
pub enum RoleUpdateOutcome {
    #[serde(rename = "UpdateUserRoleResult")]
    Updated { status: String, user: UserView },
    #[serde(rename = "AffiliationError")]
    Rejected {
        code: u16,
        description: String,
        #[serde(skip)]
        reason: Rejection,
    },
}

#[derive(Clone)]
pub struct RoleUpdateAuthorizer {
    users: Arc<dyn UserRepository>,
    orgs: Arc<dyn OrganizationRepository>,
    affiliations: Arc<dyn AffiliationRepository>,
    permissions: Arc<dyn PermissionChecker>,
    transactions: Arc<dyn TransactionRunner>,
    localizer: Arc<dyn Localizer>,
}

impl RoleUpdateAuthorizer {
    pub fn new(
        users: Arc<dyn UserRepository>,
        orgs: Arc<dyn OrganizationRepository>,
        affiliations: Arc<dyn AffiliationRepository>,
        permissions: Arc<dyn PermissionChecker>,
        transactions: Arc<dyn TransactionRunner>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            users,
            orgs,
            affiliations,
            permissions,
            transactions,
            localizer,
        }
    }

    /// Wire every collaborator to one store, with the affiliation-backed
    /// permission checker.
    pub fn from_store<S>(
        store: Arc<S>,
        localizer: Arc<dyn Localizer>,
        super_admin_org_slug: Option<String>,
    ) -> Self
    where
        S: UserRepository
            + OrganizationRepository
            + AffiliationRepository
            + TransactionRunner
            + 'static,
    {
        let permissions = Arc::new(AffiliationPermissionChecker::new(
            store.clone(),
            store.clone(),
            super_admin_org_slug,
        ));
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            permissions,
            store,
            localizer,
        )
    }

    pub async fn update_user_role(
        &self,
        req: &RoleUpdateRequest,
    ) -> Result<RoleUpdateOutcome, RoleUpdateFailure> {
        let requester_key = req.requester_key;
        let org_key = req.org_key;

        let requester = match self.users.find_user_by_key(requester_key).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(
                    user_key = %requester_key,
                    "User: {} attempted to update a user role, however the user could not be found.",
                    requester_key
                );
                counter!("role_updates_total", "outcome" => "unauthenticated").increment(1);
                return Err(RoleUpdateFailure::Unauthenticated {
                    message: self.message(MessageId::AuthenticationRequired, req.locale),
                });
            }
            Err(e) => return Err(self.failure(req, None, None, e)),
        };

        if requester.user_name.eq_ignore_ascii_case(&req.user_name) {
            tracing::warn!(
                user_key = %requester_key,
                org_key = %org_key,
                "User: {} attempted to update their own role in org: {}.",
                requester_key,
                org_key
            );
            return Ok(self.reject(Rejection::SelfUpdate, req.locale));
        }

        let target = match self.users.find_user_by_user_name(&req.user_name).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(
                    user_key = %requester_key,
                    user_name = %req.user_name,
                    "User: {} attempted to update a user: {} role in org: {}, however there is no user associated with that user name.",
                    requester_key,
                    req.user_name,
                    org_key
                );
                return Ok(self.reject(Rejection::UnknownUser, req.locale));
            }
            Err(e) => return Err(self.failure(req, None, None, e)),
        };
        let target_key = target.user_key;

        if target_key == requester_key {
            tracing::warn!(
                user_key = %requester_key,
                org_key = %org_key,
                "User: {} attempted to update their own role in org: {}.",
                requester_key,
                org_key
            );
            return Ok(self.reject(Rejection::SelfUpdate, req.locale));
        }

        let org = match self.orgs.find_org_by_key(org_key).await {
            Ok(Some(org)) => org,
            Ok(None) => {
                tracing::warn!(
                    user_key = %requester_key,
                    target_key = %target_key,
                    "User: {} attempted to update a user: {} role in org: {}, however there is no org associated with that id.",
                    requester_key,
                    target_key,
                    org_key
                );
                return Ok(self.reject(Rejection::UnknownOrganization, req.locale));
            }
            Err(e) => return Err(self.failure(req, Some(target_key), None, e)),
        };

        let requester_permission = match self
            .permissions
            .check_permission(requester_key, org_key)
            .await
        {
            Ok(Some(permission)) => permission,
            Ok(None) => {
                tracing::warn!(
                    user_key = %requester_key,
                    target_key = %target_key,
                    org_slug = %org.slug,
                    "User: {} attempted to update a user: {} role in org: {}, however they do not have permission to do so.",
                    requester_key,
                    target_key,
                    org.slug
                );
                return Ok(self.reject(Rejection::RequesterNotAffiliated, req.locale));
            }
            Err(e) => return Err(self.failure(req, Some(target_key), Some(&org.slug), e)),
        };

        let current = match self.affiliations.find_affiliation(org_key, target_key).await {
            Ok(Some(affiliation)) => affiliation.permission,
            Ok(None) => {
                tracing::warn!(
                    user_key = %requester_key,
                    target_key = %target_key,
                    org_slug = %org.slug,
                    "User: {} attempted to update a user: {} role in org: {}, however that user does not have an affiliation with that organization.",
                    requester_key,
                    target_key,
                    org.slug
                );
                return Ok(self.reject(Rejection::TargetNotAffiliated, req.locale));
            }
            Err(e) => return Err(self.failure(req, Some(target_key), Some(&org.slug), e)),
        };

        if !requester_permission.outranks(current) || req.role > requester_permission {
            tracing::warn!(
                user_key = %requester_key,
                target_key = %target_key,
                org_slug = %org.slug,
                requester_permission = %requester_permission,
                from = %current,
                to = %req.role,
                "User: {} attempted to update a user: {} role in org: {} from {} to {}, however they do not have permission to do so.",
                requester_key,
                target_key,
                org.slug,
                current,
                req.role
            );
            return Ok(self.reject(Rejection::InsufficientPrivilege, req.locale));
        }

        let write = AffiliationWrite::UpsertPermission {
            org_key,
            user_key: target_key,
            permission: req.role,
        };
        let committed = async {
            let mut tx = self.transactions.begin().await?;
            tx.execute(write).await?;
            tx.commit().await
        }
        .await;
        if let Err(e) = committed {
            return Err(self.failure(req, Some(target_key), Some(&org.slug), e));
        }

        tracing::info!(
            user_key = %requester_key,
            target_key = %target_key,
            org_slug = %org.slug,
            from = %current,
            to = %req.role,
            "User: {} successfully updated user: {} role from {} to {} in org: {}.",
            requester_key,
            target_key,
            current,
            req.role,
            org.slug
        );
        counter!("role_updates_total", "outcome" => "updated").increment(1);

        Ok(RoleUpdateOutcome::Updated {
            status: self.message(MessageId::RoleUpdated, req.locale),
            user: UserView::from(&target),
        })
    }

    fn message(&self, id: MessageId, locale: Locale) -> String {
        self.localizer.message(id, locale)
    }

    fn reject(&self, reason: Rejection, locale: Locale) -> RoleUpdateOutcome {
        counter!("role_updates_total", "outcome" => reason.as_str()).increment(1);
        RoleUpdateOutcome::Rejected {
            code: REJECTION_CODE,
            description: self.message(reason.message_id(), locale),
            reason,
        }
    }

    /// Log a storage failure with full context and convert it into the
    /// generic client-facing failure.
    ///
    /// `target_key` and `org_slug` are `None` until the lookup that resolves
    /// them has succeeded; the fields are then logged empty and the message
    /// names the requested user name or org key instead.
    fn failure(
        &self,
        req: &RoleUpdateRequest,
        target_key: Option<Uuid>,
        org_slug: Option<&str>,
        err: DataAccessError,
    ) -> RoleUpdateFailure {
        let target: &dyn Display = match &target_key {
            Some(key) => key,
            None => &req.user_name,
        };
        let org: &dyn Display = match &org_slug {
            Some(slug) => slug,
            None => &req.org_key,
        };
        tracing::error!(
            user_key = %req.requester_key,
            target_key = %target_key.map(|k| k.to_string()).unwrap_or_default(),
            user_name = %req.user_name,
            org_key = %req.org_key,
            org_slug = org_slug.unwrap_or_default(),
            phase = %err.phase(),
            error = %err,
            "Database error occurred when user: {} attempted to update a user's: {} role in org: {}, error: {}",
            req.requester_key,
            target,
            org,
            err
        );
        counter!("role_updates_total", "outcome" => "error").increment(1);
        RoleUpdateFailure::DataAccess {
            message: self.message(MessageId::RoleUpdateFailed, req.locale),
            source: err,
        }
    }
}
