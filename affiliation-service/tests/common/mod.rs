//! Shared test harness for affiliation-service integration tests.
#![allow(dead_code)]

use affiliation_service::{
    build_router,
    config::AffiliationConfig,
    models::{Organization, Permission, User},
    services::{
        AccessTokenClaims, JwtVerifier, MemoryStore, MessageCatalog, RoleUpdateAuthorizer,
    },
    AppState,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use uuid::Uuid;

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_private_key.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_public_key.pem");

pub const ROLE_UPDATE_TARGET: &str = "affiliation_service::services::role_update";

pub fn test_config(super_admin_org_slug: Option<&str>) -> AffiliationConfig {
    let mut vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/affiliations_test".to_string()),
        ("JWT_PUBLIC_KEY_PATH", "tests/fixtures/test_public_key.pem".to_string()),
        ("SERVICE_NAME", "affiliation-service-test".to_string()),
        ("LOG_LEVEL", "error".to_string()),
    ]);
    if let Some(slug) = super_admin_org_slug {
        vars.insert("SUPER_ADMIN_ORG_SLUG", slug.to_string());
    }

    let common = CoreConfig {
        port: 0,
        ..CoreConfig::default()
    };

    AffiliationConfig::from_lookup(common, |key| vars.get(key).cloned())
        .expect("Failed to build test configuration")
}

pub fn authorizer(store: &MemoryStore, super_admin_org_slug: Option<&str>) -> RoleUpdateAuthorizer {
    RoleUpdateAuthorizer::from_store(
        Arc::new(store.clone()),
        Arc::new(MessageCatalog),
        super_admin_org_slug.map(str::to_string),
    )
}

/// Sign an RS256 access token for `user_key` with the fixture key.
pub fn access_token(user_key: Uuid) -> String {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        sub: user_key.to_string(),
        exp: (now + Duration::minutes(15)).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes())
        .expect("Failed to parse test private key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("Failed to sign token")
}

/// One organization with a requester and a target user in it.
pub struct Seed {
    pub store: MemoryStore,
    pub org: Organization,
    pub requester: User,
    pub target: User,
}

impl Seed {
    /// `None` leaves the corresponding user unaffiliated.
    pub fn new(requester: Option<Permission>, target: Option<Permission>) -> Self {
        let store = MemoryStore::new();
        let org = store.insert_org(Organization::new("treasury-board", "Treasury Board"));
        let requester_user =
            store.insert_user(User::new("requester@example.gc.ca", "Requester"));
        let target_user = store.insert_user(User::new("target@example.gc.ca", "Target"));

        if let Some(permission) = requester {
            store.insert_affiliation(org.org_key, requester_user.user_key, permission);
        }
        if let Some(permission) = target {
            store.insert_affiliation(org.org_key, target_user.user_key, permission);
        }

        Self {
            store,
            org,
            requester: requester_user,
            target: target_user,
        }
    }

    pub fn target_permission(&self) -> Option<Permission> {
        self.store
            .affiliation(self.org.org_key, self.target.user_key)
            .map(|a| a.permission)
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: MemoryStore,
}

impl TestApp {
    pub async fn spawn(store: MemoryStore) -> Self {
        Self::spawn_with(store, None).await
    }

    pub async fn spawn_with(store: MemoryStore, super_admin_org_slug: Option<&str>) -> Self {
        let config = test_config(super_admin_org_slug);
        let jwt = JwtVerifier::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes())
            .expect("Failed to load test public key");

        let state = AppState {
            config: config.clone(),
            authorizer: authorizer(&store, super_admin_org_slug),
            store_health: Arc::new(store.clone()),
            jwt,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener
            .local_addr()
            .expect("Failed to read local address")
            .port();

        let app = build_router(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            store,
        }
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub async fn update_user_role(
        &self,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        let mut request = self
            .client()
            .post(format!("{}/graphql/mutations/updateUserRole", self.address))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// A tracing event seen by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

/// Layer that records every event it sees.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Install a capture layer as the thread's default subscriber.
    ///
    /// Only usable from single-threaded test runtimes: events emitted on
    /// other threads are not seen.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Events emitted by the role update authorizer.
    pub fn role_update_events(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target.starts_with(ROLE_UPDATE_TARGET))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let message = visitor.fields.remove("message").unwrap_or_default();
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                message,
                fields: visitor.fields,
            });
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}
