//! PostgreSQL storage for users, organizations and affiliations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::{FromRow, Transaction};
use std::time::Duration;
use uuid::Uuid;

use super::error::DataAccessError;
use super::repository::{
    AffiliationRepository, AffiliationTransaction, AffiliationWrite, OrganizationRepository,
    StoreHealth, TransactionRunner, UserRepository,
};
use crate::config::DatabaseConfig;
use crate::models::{Affiliation, Organization, Permission, User};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized and timed by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataAccessError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Affiliation store pool ready"
        );
        Ok(Self::new(pool))
    }

    /// Apply the embedded users/organizations/affiliations schema.
    pub async fn migrate(&self) -> Result<(), DataAccessError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))?;
        tracing::info!("Affiliation schema is up to date");
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Seeding ====================

    /// Insert a user. Used by provisioning scripts and tests.
    pub async fn insert_user(&self, user: &User) -> Result<(), DataAccessError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_key, user_name, display_name, email_validated, tfa_validated, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.user_key)
        .bind(&user.user_name)
        .bind(&user.display_name)
        .bind(user.email_validated)
        .bind(user.tfa_validated)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Insert an organization.
    pub async fn insert_org(&self, org: &Organization) -> Result<(), DataAccessError> {
        sqlx::query(
            r#"
            INSERT INTO organizations (org_key, slug, name, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(org.org_key)
        .bind(&org.slug)
        .bind(&org.name)
        .bind(org.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))?;
        Ok(())
    }
}

/// Raw affiliation row; `permission` is validated on conversion.
#[derive(Debug, FromRow)]
struct AffiliationRow {
    org_key: Uuid,
    user_key: Uuid,
    permission: String,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<AffiliationRow> for Affiliation {
    type Error = anyhow::Error;

    fn try_from(row: AffiliationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            org_key: row.org_key,
            user_key: row.user_key,
            permission: row
                .permission
                .parse::<Permission>()
                .map_err(anyhow::Error::msg)?,
            updated_utc: row.updated_utc,
        })
    }
}

#[async_trait]
impl UserRepository for Database {
    async fn find_user_by_key(&self, user_key: Uuid) -> Result<Option<User>, DataAccessError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_key = $1")
            .bind(user_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))
    }

    async fn find_user_by_user_name(
        &self,
        user_name: &str,
    ) -> Result<Option<User>, DataAccessError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(user_name) = LOWER($1)")
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl OrganizationRepository for Database {
    async fn find_org_by_key(
        &self,
        org_key: Uuid,
    ) -> Result<Option<Organization>, DataAccessError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE org_key = $1")
            .bind(org_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))
    }

    async fn find_org_by_slug(&self, slug: &str) -> Result<Option<Organization>, DataAccessError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DataAccessError::Query(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl AffiliationRepository for Database {
    async fn find_affiliation(
        &self,
        org_key: Uuid,
        user_key: Uuid,
    ) -> Result<Option<Affiliation>, DataAccessError> {
        let mut rows = sqlx::query_as::<_, AffiliationRow>(
            r#"
            SELECT org_key, user_key, permission, updated_utc
            FROM affiliations
            WHERE org_key = $1 AND user_key = $2
            "#,
        )
        .bind(org_key)
        .bind(user_key)
        .fetch(&self.pool);

        let row = rows
            .try_next()
            .await
            .map_err(|e| DataAccessError::Cursor(anyhow::anyhow!(e)))?;

        row.map(Affiliation::try_from)
            .transpose()
            .map_err(DataAccessError::Cursor)
    }
}

/// Open PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgAffiliationTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AffiliationTransaction for PgAffiliationTransaction {
    async fn execute(&mut self, write: AffiliationWrite) -> Result<(), DataAccessError> {
        match write {
            AffiliationWrite::UpsertPermission {
                org_key,
                user_key,
                permission,
            } => {
                sqlx::query(
                    r#"
                    INSERT INTO affiliations (org_key, user_key, permission, updated_utc)
                    VALUES ($1, $2, $3, now())
                    ON CONFLICT (org_key, user_key)
                    DO UPDATE SET permission = EXCLUDED.permission, updated_utc = EXCLUDED.updated_utc
                    "#,
                )
                .bind(org_key)
                .bind(user_key)
                .bind(permission.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| DataAccessError::TransactionStep(anyhow::anyhow!(e)))?;
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DataAccessError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DataAccessError::TransactionCommit(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl TransactionRunner for Database {
    async fn begin(&self) -> Result<Box<dyn AffiliationTransaction>, DataAccessError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DataAccessError::TransactionStep(anyhow::anyhow!(e)))?;
        Ok(Box::new(PgAffiliationTransaction { tx }))
    }
}

#[async_trait]
impl StoreHealth for Database {
    async fn health_check(&self) -> Result<(), DataAccessError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                DataAccessError::Query(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }
}
