//! Role updates against a live PostgreSQL database.
//!
//! Run with `DATABASE_URL` pointing at a scratch database.

use affiliation_service::{
    config::DatabaseConfig,
    models::{Organization, Permission, User},
    services::{
        AffiliationRepository, AffiliationTransaction, AffiliationWrite, Database, Locale,
        MessageCatalog, Phase, RoleUpdateAuthorizer, RoleUpdateOutcome, RoleUpdateRequest,
        StoreHealth, TransactionRunner,
    },
};
use std::sync::Arc;
use uuid::Uuid;

async fn database() -> Database {
    dotenvy::dotenv().ok();
    let config = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 2,
        min_connections: 1,
        acquire_timeout_secs: 5,
        idle_timeout_secs: 60,
        max_lifetime_secs: 300,
    };
    let db = Database::connect(&config)
        .await
        .expect("Failed to connect to PostgreSQL");
    db.migrate().await.expect("Failed to run migrations");
    db
}

async fn grant(db: &Database, org_key: Uuid, user_key: Uuid, permission: Permission) {
    let mut tx = db.begin().await.unwrap();
    tx.execute(AffiliationWrite::UpsertPermission {
        org_key,
        user_key,
        permission,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn upsert_replaces_the_single_edge() {
    let db = database().await;
    db.health_check().await.unwrap();

    let suffix = Uuid::new_v4();
    let org = Organization::new(format!("org-{}", suffix), "Test Org");
    let admin = User::new(format!("admin-{}@example.gc.ca", suffix), "Admin");
    let member = User::new(format!("member-{}@example.gc.ca", suffix), "Member");
    db.insert_org(&org).await.unwrap();
    db.insert_user(&admin).await.unwrap();
    db.insert_user(&member).await.unwrap();
    grant(&db, org.org_key, admin.user_key, Permission::SuperAdmin).await;
    grant(&db, org.org_key, member.user_key, Permission::User).await;

    let store = Arc::new(db.clone());
    let authorizer = RoleUpdateAuthorizer::from_store(store, Arc::new(MessageCatalog), None);

    let outcome = authorizer
        .update_user_role(&RoleUpdateRequest {
            requester_key: admin.user_key,
            user_name: member.user_name.to_uppercase(),
            org_key: org.org_key,
            role: Permission::Admin,
            locale: Locale::En,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, RoleUpdateOutcome::Updated { .. }));

    let edge = db
        .find_affiliation(org.org_key, member.user_key)
        .await
        .unwrap()
        .expect("affiliation missing");
    assert_eq!(edge.permission, Permission::Admin);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM affiliations WHERE org_key = $1 AND user_key = $2",
    )
    .bind(org.org_key)
    .bind(member.user_key)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn dropped_transaction_leaves_no_trace() {
    let db = database().await;

    let suffix = Uuid::new_v4();
    let org = Organization::new(format!("org-{}", suffix), "Test Org");
    let user = User::new(format!("user-{}@example.gc.ca", suffix), "User");
    db.insert_org(&org).await.unwrap();
    db.insert_user(&user).await.unwrap();

    {
        let mut tx = db.begin().await.unwrap();
        tx.execute(AffiliationWrite::UpsertPermission {
            org_key: org.org_key,
            user_key: user.user_key,
            permission: Permission::Admin,
        })
        .await
        .unwrap();
    }

    assert!(db
        .find_affiliation(org.org_key, user.user_key)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn migrations_are_idempotent_and_pool_honours_bounds() {
    let db = database().await;
    db.migrate().await.expect("Re-running migrations failed");

    assert!(db.pool().size() <= 2);
    db.health_check().await.unwrap();
}

#[tokio::test]
async fn connect_reports_unreachable_database_as_query_failure() {
    let config = DatabaseConfig {
        url: "postgres://affiliations@127.0.0.1:1/affiliations".to_string(),
        max_connections: 1,
        min_connections: 0,
        acquire_timeout_secs: 1,
        idle_timeout_secs: 10,
        max_lifetime_secs: 60,
    };

    let err = match Database::connect(&config).await {
        Ok(_) => panic!("connected to a closed port"),
        Err(err) => err,
    };
    assert_eq!(err.phase(), Phase::Query);
}
