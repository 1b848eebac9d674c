//! Services layer for the affiliation service.
//!
//! Storage collaborators, the permission checker, the message catalog and
//! the role update authorizer.

mod database;
pub mod error;
pub mod i18n;
mod jwt;
mod memory;
pub mod metrics;
pub mod permission;
pub mod repository;
pub mod role_update;

pub use database::{Database, PgAffiliationTransaction};
pub use error::{DataAccessError, Phase, RoleUpdateFailure};
pub use i18n::{Locale, Localizer, MessageCatalog, MessageId};
pub use jwt::{AccessTokenClaims, JwtVerifier};
pub use memory::{MemoryStore, MemoryTransaction};
pub use permission::AffiliationPermissionChecker;
pub use repository::{
    AffiliationRepository, AffiliationTransaction, AffiliationWrite, OrganizationRepository,
    PermissionChecker, StoreHealth, TransactionRunner, UserRepository,
};
pub use role_update::{
    Rejection, RoleUpdateAuthorizer, RoleUpdateOutcome, RoleUpdateRequest, REJECTION_CODE,
};
