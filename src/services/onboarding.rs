//! Tenant membership: self-service tenant creation, role grants, join
//! requests and invitations all end in `link_user`.

use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::TenancyConfig;
use crate::database::models::{from_row, Role, Tenant, User};
use crate::database::{DataStore, Query, Row, StoreError};
use crate::error::ApiError;
use crate::types::{RoleName, TenantStatus};

/// Roles every tenant starts with
pub const DEFAULT_ROLES: [RoleName; 4] = [RoleName::Admin, RoleName::Gestor, RoleName::Member, RoleName::Viewer];

/// Hex sha256 of an invitation token; only the hash is stored
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 64 hex characters of randomness
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn object(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(row) => row,
        _ => Row::new(),
    }
}

pub async fn find_user(store: &dyn DataStore, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row = store
        .select_one(&Query::from("users").eq("id", user_id.to_string()))
        .await?;
    Ok(row.map(from_row).transpose()?)
}

pub async fn find_tenant_by_slug(store: &dyn DataStore, slug: &str) -> Result<Option<Tenant>, ApiError> {
    let row = store.select_one(&Query::from("tenants").eq("slug", slug)).await?;
    Ok(row.map(from_row).transpose()?)
}

/// Create the user row for a principal on first contact
pub async fn ensure_user(
    store: &dyn DataStore,
    user_id: Uuid,
    email: &str,
    full_name: Option<String>,
) -> Result<User, ApiError> {
    if let Some(user) = find_user(store, user_id).await? {
        if full_name.is_some() && full_name != user.full_name {
            let updated = store
                .update(
                    &Query::from("users").eq("id", user_id.to_string()),
                    object(json!({ "full_name": full_name })),
                )
                .await?;
            if let Some(row) = updated.into_iter().next() {
                return Ok(from_row(row)?);
            }
        }
        return Ok(user);
    }

    let row = object(json!({
        "id": user_id,
        "tenant_id": null,
        "email": email.to_lowercase(),
        "full_name": full_name,
        "is_active": false,
    }));
    let inserted = store.insert("users", row).await?;
    tracing::info!(user_id = %user_id, "User profile created");
    Ok(from_row(inserted)?)
}

/// Insert the default role set for a new tenant
pub async fn seed_roles(store: &dyn DataStore, tenant_id: Uuid) -> Result<(), StoreError> {
    for role in DEFAULT_ROLES {
        let row = object(json!({ "tenant_id": tenant_id, "name": role }));
        match store.insert("roles", row).await {
            Ok(_) | Err(StoreError::UniqueViolation(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn role_id(store: &dyn DataStore, tenant_id: Uuid, role: RoleName) -> Result<Uuid, ApiError> {
    let query = Query::from("roles")
        .eq("tenant_id", tenant_id.to_string())
        .eq("name", role.as_str());
    if let Some(row) = store.select_one(&query).await? {
        return Ok(from_row::<Role>(row)?.id);
    }
    let inserted = store
        .insert("roles", object(json!({ "tenant_id": tenant_id, "name": role })))
        .await?;
    Ok(from_row::<Role>(inserted)?.id)
}

/// Grant a tenant role; granting an existing role is a no-op
pub async fn grant_role(store: &dyn DataStore, user_id: Uuid, tenant_id: Uuid, role: RoleName) -> Result<(), ApiError> {
    let role_id = role_id(store, tenant_id, role).await?;
    let row = object(json!({ "user_id": user_id, "role_id": role_id, "tenant_id": tenant_id }));
    match store.insert("user_roles", row).await {
        Ok(_) | Err(StoreError::UniqueViolation(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Attach a user to a tenant, activate it and grant `role`
pub async fn link_user(store: &dyn DataStore, user_id: Uuid, tenant_id: Uuid, role: RoleName) -> Result<User, ApiError> {
    let updated = store
        .update(
            &Query::from("users").eq("id", user_id.to_string()),
            object(json!({ "tenant_id": tenant_id, "is_active": true })),
        )
        .await?;
    let row = updated
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("User profile not found"))?;

    grant_role(store, user_id, tenant_id, role).await?;
    tracing::info!(user_id = %user_id, tenant_id = %tenant_id, role = %role, "User linked to tenant");
    Ok(from_row(row)?)
}

/// Active users of a tenant
pub async fn member_count(store: &dyn DataStore, tenant_id: Uuid) -> Result<usize, ApiError> {
    let rows = store
        .select(&Query::from("users").eq("tenant_id", tenant_id.to_string()))
        .await?;
    Ok(rows
        .iter()
        .filter(|row| row.get("is_active").and_then(|v| v.as_bool()).unwrap_or(false))
        .count())
}

/// Forbidden once the tenant's plan limit on users is reached
pub async fn ensure_user_capacity(store: &dyn DataStore, tenant: &Tenant) -> Result<(), ApiError> {
    let Some(max) = tenant.user_limit() else {
        return Ok(());
    };
    let members = member_count(store, tenant.id).await?;
    if members >= max {
        tracing::info!(tenant_id = %tenant.id, members, max, "User limit reached");
        return Err(ApiError::forbidden("User limit reached for this plan"));
    }
    Ok(())
}

/// Self-service tenant creation; the caller becomes its admin
pub async fn create_tenant(
    store: &dyn DataStore,
    tenancy: &TenancyConfig,
    user: &User,
    name: &str,
    slug: &str,
) -> Result<(Tenant, User), ApiError> {
    if user.tenant_id.is_some() {
        return Err(ApiError::conflict("You already belong to a tenant"));
    }

    let row = object(json!({
        "name": name,
        "slug": slug,
        "plan": tenancy.default_plan,
        "status": TenantStatus::Active,
        "max_users": tenancy.default_max_users,
        "max_projects": tenancy.default_max_projects,
    }));
    let tenant: Tenant = match store.insert("tenants", row).await {
        Ok(row) => from_row(row)?,
        Err(StoreError::UniqueViolation(_)) => {
            return Err(ApiError::conflict(format!("The slug '{}' is already taken", slug)));
        }
        Err(e) => return Err(e.into()),
    };

    seed_roles(store, tenant.id).await?;
    let user = link_user(store, user.id, tenant.id, RoleName::Admin).await?;

    tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, user_id = %user.id, "Tenant created");
    Ok((tenant, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use crate::middleware::tenant::load_roles;

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
        assert_eq!(generate_token().len(), 64);
    }

    #[tokio::test]
    async fn creating_a_tenant_makes_the_caller_admin() {
        let store = MemoryStore::new();
        let config = AppConfig::development();
        let user = ensure_user(&store, Uuid::new_v4(), "Founder@Example.com", None).await.unwrap();
        assert_eq!(user.email, "founder@example.com");
        assert!(!user.is_active);

        let (tenant, user) = create_tenant(&store, &config.tenancy, &user, "Acme", "acme").await.unwrap();
        assert_eq!(user.tenant_id, Some(tenant.id));
        assert!(user.is_active);
        assert_eq!(store.count("roles").await, 4);

        let roles = load_roles(&store, user.id, tenant.id).await.unwrap();
        assert_eq!(roles, vec![RoleName::Admin]);

        let err = create_tenant(&store, &config.tenancy, &user, "Again", "again").await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn taken_slug_is_a_conflict() {
        let store = MemoryStore::new();
        let config = AppConfig::development();
        let first = ensure_user(&store, Uuid::new_v4(), "a@example.com", None).await.unwrap();
        let second = ensure_user(&store, Uuid::new_v4(), "b@example.com", None).await.unwrap();

        create_tenant(&store, &config.tenancy, &first, "Acme", "acme").await.unwrap();
        let err = create_tenant(&store, &config.tenancy, &second, "Acme 2", "acme").await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }
}
