mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use erp_api::database::{DataStore, Query};

use common::{Account, TestApp};

fn stranger(app: &TestApp, email: &str) -> Result<Account> {
    let id = Uuid::new_v4();
    Ok(Account {
        id,
        email: email.to_string(),
        token: app.keys.issue(id, email)?,
    })
}

#[tokio::test]
async fn setup_routes_require_a_session() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app.request(Method::GET, "/api/setup/status", None, None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn status_reports_missing_setup() -> Result<()> {
    let app = TestApp::new().await?;

    let fresh = app.get("/api/setup/status", &app.outsider).await?;
    assert_eq!(fresh.status, StatusCode::OK);
    assert!(fresh.data()["user"].is_null());
    assert_eq!(fresh.data()["needsSetup"], true);

    let member = app.get("/api/setup/status", &app.bob).await?;
    assert_eq!(member.data()["needsSetup"], false);
    assert_eq!(member.data()["tenant"]["slug"], "acme");
    Ok(())
}

#[tokio::test]
async fn self_service_tenant_makes_the_caller_admin() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app
        .post("/api/setup/tenant", &app.outsider, json!({ "name": "Initech Labs" }))
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["tenant"]["slug"], "initech-labs");
    assert_eq!(res.data()["tenant"]["plan"], "free");
    assert_eq!(res.data()["user"]["isActive"], true);

    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["roles"], json!(["admin"]));

    // a second tenant for the same user is refused
    let again = app.post("/api/setup/tenant", &app.outsider, json!({ "name": "Other" })).await?;
    assert_eq!(again.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn taken_slugs_conflict() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app
        .post("/api/setup/tenant", &app.outsider, json!({ "name": "Acme Two", "slug": "acme" }))
        .await?;

    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn access_request_is_reviewed_by_an_admin() -> Result<()> {
    let app = TestApp::new().await?;

    let requested = app
        .post(
            "/api/setup/access-requests",
            &app.outsider,
            json!({ "tenant_slug": "acme", "message": "Hi, I'm new" }),
        )
        .await?;
    assert_eq!(requested.status, StatusCode::CREATED);
    assert_eq!(requested.data()["status"], "pending");
    let request_id = requested.data()["id"].as_str().unwrap().to_string();

    let duplicate = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "acme" }))
        .await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    // members cannot review requests
    let denied = app.get("/api/access-requests", &app.bob).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let pending = app.get("/api/access-requests", &app.alice).await?;
    assert_eq!(pending.data().as_array().unwrap().len(), 1);
    assert_eq!(pending.data()[0]["user"]["email"], "newcomer@example.test");

    // another tenant cannot see or approve it
    let foreign = app.get("/api/access-requests", &app.carol).await?;
    assert_eq!(foreign.data().as_array().unwrap().len(), 0);
    let foreign = app
        .post(&format!("/api/access-requests/{}/approve", request_id), &app.carol, json!({}))
        .await?;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let approved = app
        .post(
            &format!("/api/access-requests/{}/approve", request_id),
            &app.alice,
            json!({ "role": "viewer" }),
        )
        .await?;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.data()["status"], "accepted");
    assert_eq!(approved.data()["reviewedBy"], app.alice.id.to_string());

    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["tenantId"], app.acme.to_string());
    assert_eq!(me.data()["roles"], json!(["viewer"]));

    let twice = app
        .post(&format!("/api/access-requests/{}/reject", request_id), &app.alice, json!({}))
        .await?;
    assert_eq!(twice.status, StatusCode::CONFLICT);
    Ok(())
}

async fn approve_raw(app: &TestApp, request_id: &str, content_type: Option<&str>, body: &'static str) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/access-requests/{}/approve", request_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.alice.token));
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let res = app.router.clone().oneshot(builder.body(Body::from(body))?).await?;
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn approve_rejects_unreadable_bodies_instead_of_defaulting() -> Result<()> {
    let app = TestApp::new().await?;
    let requested = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "acme" }))
        .await?;
    let request_id = requested.data()["id"].as_str().unwrap().to_string();

    let (status, body) = approve_raw(&app, &request_id, None, r#"{"role":"gestor"}"#).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");

    let (status, body) = approve_raw(&app, &request_id, Some("application/json"), r#"{"role":"#).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");

    // nothing was granted by the failed attempts
    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.error_code(), "NO_TENANT");

    let (status, body) = approve_raw(&app, &request_id, Some("application/json"), r#"{"role":"gestor"}"#).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "accepted");
    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.data()["roles"], json!(["gestor"]));
    Ok(())
}

#[tokio::test]
async fn approve_without_body_grants_member() -> Result<()> {
    let app = TestApp::new().await?;
    let requested = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "acme" }))
        .await?;
    let request_id = requested.data()["id"].as_str().unwrap().to_string();

    let (status, _) = approve_raw(&app, &request_id, None, "").await?;
    assert_eq!(status, StatusCode::OK);

    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.data()["roles"], json!(["member"]));
    Ok(())
}

#[tokio::test]
async fn access_request_for_unknown_or_inactive_tenant() -> Result<()> {
    let app = TestApp::new().await?;

    let unknown = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "nobody" }))
        .await?;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    app.store
        .update(
            &Query::from("tenants").eq("slug", "globex"),
            json!({ "status": "inactive" }).as_object().cloned().unwrap(),
        )
        .await?;
    let inactive = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "globex" }))
        .await?;
    assert_eq!(inactive.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn rejected_requests_do_not_link_the_user() -> Result<()> {
    let app = TestApp::new().await?;
    let requested = app
        .post("/api/setup/access-requests", &app.outsider, json!({ "tenant_slug": "acme" }))
        .await?;
    let request_id = requested.data()["id"].as_str().unwrap().to_string();

    let rejected = app
        .post(&format!("/api/access-requests/{}/reject", request_id), &app.alice, json!({}))
        .await?;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.data()["status"], "rejected");

    let me = app.get("/api/me", &app.outsider).await?;
    assert_eq!(me.error_code(), "NO_TENANT");
    Ok(())
}

#[tokio::test]
async fn invitations_are_accepted_by_the_invited_email() -> Result<()> {
    let app = TestApp::new().await?;
    let invitee = stranger(&app, "dana@acme.test")?;
    let impostor = stranger(&app, "mallory@evil.test")?;

    let denied = app.post("/api/invitations", &app.bob, json!({ "email": "dana@acme.test" })).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let issued = app
        .post("/api/invitations", &app.alice, json!({ "email": "Dana@Acme.test", "role": "gestor" }))
        .await?;
    assert_eq!(issued.status, StatusCode::CREATED);
    assert_eq!(issued.data()["email"], "dana@acme.test");
    assert!(issued.data().get("tokenHash").is_none());
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let duplicate = app.post("/api/invitations", &app.alice, json!({ "email": "dana@acme.test" })).await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let listed = app.get("/api/invitations", &app.alice).await?;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);
    assert!(listed.data()[0].get("token").is_none());

    let wrong = app
        .post("/api/setup/invitations/accept", &impostor, json!({ "token": token }))
        .await?;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);

    let bogus = app
        .post("/api/setup/invitations/accept", &invitee, json!({ "token": "not-a-real-token" }))
        .await?;
    assert_eq!(bogus.status, StatusCode::NOT_FOUND);

    let accepted = app
        .post("/api/setup/invitations/accept", &invitee, json!({ "token": token }))
        .await?;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.data()["tenant"]["id"], app.acme.to_string());

    let me = app.get("/api/me", &invitee).await?;
    assert_eq!(me.data()["roles"], json!(["gestor"]));

    let reused = app
        .post("/api/setup/invitations/accept", &invitee, json!({ "token": token }))
        .await?;
    assert_eq!(reused.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn existing_members_cannot_be_invited() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app.post("/api/invitations", &app.alice, json!({ "email": "bob@acme.test" })).await?;

    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn revoked_invitations_cannot_be_used() -> Result<()> {
    let app = TestApp::new().await?;
    let invitee = stranger(&app, "erin@acme.test")?;
    let issued = app.post("/api/invitations", &app.alice, json!({ "email": "erin@acme.test" })).await?;
    let id = issued.data()["id"].as_str().unwrap().to_string();
    let token = issued.data()["token"].as_str().unwrap().to_string();

    let revoked = app.delete(&format!("/api/invitations/{}", id), &app.alice).await?;
    assert_eq!(revoked.status, StatusCode::OK);

    let res = app
        .post("/api/setup/invitations/accept", &invitee, json!({ "token": token }))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn user_limit_blocks_new_members() -> Result<()> {
    let app = TestApp::new().await?;
    app.store
        .update(
            &Query::from("tenants").eq("slug", "acme"),
            json!({ "max_users": 2 }).as_object().cloned().unwrap(),
        )
        .await?;

    // alice and bob are the two active users
    let res = app.post("/api/invitations", &app.alice, json!({ "email": "full@acme.test" })).await?;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "User limit reached for this plan");
    Ok(())
}
