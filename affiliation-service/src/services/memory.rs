//! In-process store implementing every storage collaborator.
//!
//! Writes made inside a transaction are staged and applied under a single
//! lock on commit, so a failed or dropped transaction leaves no trace. A
//! failure can be injected at any [`Phase`] to exercise error paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::error::{DataAccessError, Phase};
use super::repository::{
    AffiliationRepository, AffiliationTransaction, AffiliationWrite, OrganizationRepository,
    StoreHealth, TransactionRunner, UserRepository,
};
use crate::models::{Affiliation, Organization, Permission, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    orgs: HashMap<Uuid, Organization>,
    affiliations: HashMap<(Uuid, Uuid), Affiliation>,
    failure: Option<InjectedFailure>,
}

/// Fail every call at `phase` from the `nth` one (1-based) onwards.
struct InjectedFailure {
    phase: Phase,
    nth: usize,
    seen: usize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_user(&self, user: User) -> User {
        self.lock().users.insert(user.user_key, user.clone());
        user
    }

    pub fn insert_org(&self, org: Organization) -> Organization {
        self.lock().orgs.insert(org.org_key, org.clone());
        org
    }

    pub fn insert_affiliation(&self, org_key: Uuid, user_key: Uuid, permission: Permission) {
        self.lock().affiliations.insert(
            (org_key, user_key),
            Affiliation::new(org_key, user_key, permission),
        );
    }

    /// Committed edge between `org_key` and `user_key`.
    pub fn affiliation(&self, org_key: Uuid, user_key: Uuid) -> Option<Affiliation> {
        self.lock().affiliations.get(&(org_key, user_key)).cloned()
    }

    pub fn affiliation_count(&self) -> usize {
        self.lock().affiliations.len()
    }

    /// Make every subsequent call at `phase` fail until cleared.
    pub fn fail_at(&self, phase: Phase) {
        self.fail_from(phase, 1);
    }

    /// Let the first `nth - 1` calls at `phase` through, then fail the rest.
    pub fn fail_from(&self, phase: Phase, nth: usize) {
        self.lock().failure = Some(InjectedFailure {
            phase,
            nth: nth.max(1),
            seen: 0,
        });
    }

    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    fn check(&self, phase: Phase) -> Result<(), DataAccessError> {
        let tripped = match self.lock().failure.as_mut() {
            Some(failure) if failure.phase == phase => {
                failure.seen += 1;
                failure.seen >= failure.nth
            }
            _ => false,
        };
        if !tripped {
            return Ok(());
        }
        let cause = anyhow::anyhow!("injected {} failure", phase);
        Err(match phase {
            Phase::Query => DataAccessError::Query(cause),
            Phase::Cursor => DataAccessError::Cursor(cause),
            Phase::TransactionStep => DataAccessError::TransactionStep(cause),
            Phase::TransactionCommit => DataAccessError::TransactionCommit(cause),
        })
    }

    fn apply(inner: &mut Inner, write: AffiliationWrite) {
        match write {
            AffiliationWrite::UpsertPermission {
                org_key,
                user_key,
                permission,
            } => {
                let edge = inner
                    .affiliations
                    .entry((org_key, user_key))
                    .or_insert_with(|| Affiliation::new(org_key, user_key, permission));
                edge.permission = permission;
                edge.updated_utc = Utc::now();
            }
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_key(&self, user_key: Uuid) -> Result<Option<User>, DataAccessError> {
        self.check(Phase::Query)?;
        Ok(self.lock().users.get(&user_key).cloned())
    }

    async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<User>, DataAccessError> {
        self.check(Phase::Query)?;
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.user_name.eq_ignore_ascii_case(user_name))
            .cloned())
    }
}

#[async_trait]
impl OrganizationRepository for MemoryStore {
    async fn find_org_by_key(
        &self,
        org_key: Uuid,
    ) -> Result<Option<Organization>, DataAccessError> {
        self.check(Phase::Query)?;
        Ok(self.lock().orgs.get(&org_key).cloned())
    }

    async fn find_org_by_slug(&self, slug: &str) -> Result<Option<Organization>, DataAccessError> {
        self.check(Phase::Query)?;
        Ok(self.lock().orgs.values().find(|o| o.slug == slug).cloned())
    }
}

#[async_trait]
impl AffiliationRepository for MemoryStore {
    async fn find_affiliation(
        &self,
        org_key: Uuid,
        user_key: Uuid,
    ) -> Result<Option<Affiliation>, DataAccessError> {
        self.check(Phase::Query)?;
        self.check(Phase::Cursor)?;
        Ok(self.affiliation(org_key, user_key))
    }
}

pub struct MemoryTransaction {
    store: MemoryStore,
    staged: Vec<AffiliationWrite>,
}

#[async_trait]
impl AffiliationTransaction for MemoryTransaction {
    async fn execute(&mut self, write: AffiliationWrite) -> Result<(), DataAccessError> {
        self.store.check(Phase::TransactionStep)?;
        self.staged.push(write);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DataAccessError> {
        let MemoryTransaction { store, staged } = *self;
        store.check(Phase::TransactionCommit)?;
        let mut inner = store.lock();
        for write in staged {
            MemoryStore::apply(&mut inner, write);
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionRunner for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn AffiliationTransaction>, DataAccessError> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> Result<(), DataAccessError> {
        self.check(Phase::Query)
    }
}
