#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use erp_api::auth::SessionKeys;
use erp_api::config::{AppConfig, StoreBackend};
use erp_api::database::{DataStore, MemoryStore, Row};
use erp_api::services::onboarding;
use erp_api::types::RoleName;
use erp_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

/// A seeded user plus a valid session token
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// In-process application over a seeded `MemoryStore`.
///
/// Two tenants are created: `acme` (alice admin, bob member) and `globex`
/// (carol admin). `outsider` has a valid session but no user row yet, and
/// `dormant` belongs to acme but is inactive.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub keys: SessionKeys,
    pub acme: Uuid,
    pub globex: Uuid,
    pub alice: Account,
    pub bob: Account,
    pub carol: Account,
    pub dormant: Account,
    pub outsider: Account,
}

pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.database.backend = StoreBackend::Memory;
    config.api.enable_request_logging = false;
    config.security.jwt_secret = SECRET.to_string();
    config
}

async fn seed_tenant(store: &MemoryStore, name: &str, slug: &str, max_users: i32, max_projects: i32) -> Result<Uuid> {
    let inserted = store
        .insert(
            "tenants",
            row(json!({
                "name": name,
                "slug": slug,
                "plan": "pro",
                "status": "active",
                "max_users": max_users,
                "max_projects": max_projects,
            })),
        )
        .await?;
    let id = inserted["id"].as_str().context("tenant id")?.parse()?;
    onboarding::seed_roles(store, id).await?;
    Ok(id)
}

async fn seed_user(
    store: &MemoryStore,
    keys: &SessionKeys,
    email: &str,
    tenant: Option<(Uuid, RoleName)>,
    active: bool,
) -> Result<Account> {
    let id = Uuid::new_v4();
    store
        .insert(
            "users",
            row(json!({
                "id": id,
                "tenant_id": tenant.map(|(t, _)| t),
                "email": email,
                "full_name": email.split('@').next(),
                "is_active": active,
            })),
        )
        .await?;
    if let Some((tenant_id, role)) = tenant {
        onboarding::grant_role(store, id, tenant_id, role)
            .await
            .map_err(|e| anyhow::anyhow!("grant_role failed: {}", e.message()))?;
    }
    Ok(Account {
        id,
        email: email.to_string(),
        token: keys.issue(id, email)?,
    })
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let config = test_config();
        let keys = SessionKeys::from_config(&config.security)?;

        let acme = seed_tenant(&store, "Acme", "acme", 10, 5).await?;
        let globex = seed_tenant(&store, "Globex", "globex", 10, 5).await?;

        let alice = seed_user(&store, &keys, "alice@acme.test", Some((acme, RoleName::Admin)), true).await?;
        let bob = seed_user(&store, &keys, "bob@acme.test", Some((acme, RoleName::Member)), true).await?;
        let carol = seed_user(&store, &keys, "carol@globex.test", Some((globex, RoleName::Admin)), true).await?;
        let dormant = seed_user(&store, &keys, "dormant@acme.test", Some((acme, RoleName::Member)), false).await?;

        let outsider_id = Uuid::new_v4();
        let outsider = Account {
            id: outsider_id,
            email: "newcomer@example.test".to_string(),
            token: keys.issue(outsider_id, "newcomer@example.test")?,
        };

        let shared: Arc<dyn DataStore> = store.clone();
        let state = AppState::new(shared, config)?;

        Ok(Self {
            router: app(state),
            store,
            keys,
            acme,
            globex,
            alice,
            bob,
            carol,
            dormant,
            outsider,
        })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Reply> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON response: {:?}", bytes))?
        };
        Ok(Reply { status, body })
    }

    pub async fn get(&self, uri: &str, who: &Account) -> Result<Reply> {
        self.request(Method::GET, uri, Some(&who.token), None).await
    }

    pub async fn post(&self, uri: &str, who: &Account, body: Value) -> Result<Reply> {
        self.request(Method::POST, uri, Some(&who.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, who: &Account, body: Value) -> Result<Reply> {
        self.request(Method::PUT, uri, Some(&who.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, who: &Account, body: Value) -> Result<Reply> {
        self.request(Method::PATCH, uri, Some(&who.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, who: &Account) -> Result<Reply> {
        self.request(Method::DELETE, uri, Some(&who.token), None).await
    }

    /// Create a row through the API and return its id
    pub async fn create(&self, uri: &str, who: &Account, body: Value) -> Result<String> {
        let reply = self.post(uri, who, body).await?;
        anyhow::ensure!(
            reply.status == StatusCode::CREATED,
            "POST {} returned {}: {}",
            uri,
            reply.status,
            reply.body
        );
        Ok(reply.data()["id"].as_str().context("created id")?.to_string())
    }
}
