mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use erp_api::database::{DataStore, Query};
use erp_api::services::onboarding;
use erp_api::types::RoleName;

use common::TestApp;

fn is_code(value: &Value, prefix: &str) -> bool {
    value
        .as_str()
        .and_then(|code| code.strip_prefix(prefix))
        .and_then(|rest| rest.strip_prefix('-'))
        .map_or(false, |digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[tokio::test]
async fn create_sprint_assigns_a_code() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app
        .post(
            "/api/sprints",
            &app.alice,
            json!({ "name": "Sprint 1", "start_date": "2025-03-01", "end_date": "2025-03-14" }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["success"], true);
    let sprint = res.data();
    assert!(is_code(&sprint["code"], "SPR"), "{}", sprint["code"]);
    assert_eq!(sprint["code"], "SPR-001");
    assert_eq!(sprint["status"], "planned");
    assert_eq!(sprint["startDate"], "2025-03-01");
    assert_eq!(sprint["tenantId"], app.acme.to_string());

    let second = app
        .post(
            "/api/sprints",
            &app.alice,
            json!({ "name": "Sprint 2", "start_date": "2025-03-15", "end_date": "2025-03-28" }),
        )
        .await?;
    assert_eq!(second.data()["code"], "SPR-002");

    // codes are sequenced per tenant
    let globex = app
        .post(
            "/api/sprints",
            &app.carol,
            json!({ "name": "G1", "start_date": "2025-03-01", "end_date": "2025-03-14" }),
        )
        .await?;
    assert_eq!(globex.data()["code"], "SPR-001");
    Ok(())
}

#[tokio::test]
async fn created_project_round_trips() -> Result<()> {
    let app = TestApp::new().await?;

    let created = app
        .post(
            "/api/projects",
            &app.alice,
            json!({
                "name": "ERP rollout",
                "description": "Phase one",
                "priority": "high",
                "budget": 12500.5,
                "start_date": "2025-01-01",
                "end_date": "2025-06-30"
            }),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.data()["id"].as_str().unwrap().to_string();

    let fetched = app.get(&format!("/api/projects/{}", id), &app.bob).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    let project = fetched.data();
    assert_eq!(project["name"], "ERP rollout");
    assert_eq!(project["code"], "PROJ-001");
    assert_eq!(project["priority"], "high");
    assert_eq!(project["status"], "planning");
    assert_eq!(project["budget"], 12500.5);
    assert_eq!(project["endDate"], "2025-06-30");
    // owner defaults to the creator and is embedded as a ref
    assert_eq!(project["ownerId"], app.alice.id.to_string());
    assert_eq!(project["owner"]["email"], "alice@acme.test");
    assert_eq!(project["members"], json!([]));
    Ok(())
}

#[tokio::test]
async fn patching_task_to_done_is_visible() -> Result<()> {
    let app = TestApp::new().await?;
    let task = app.create("/api/tasks", &app.alice, json!({ "title": "Ship" })).await?;
    let uri = format!("/api/tasks/{}", task);

    let patched = app.patch(&uri, &app.bob, json!({ "status": "done" })).await?;
    assert_eq!(patched.status, StatusCode::OK);

    let fetched = app.get(&uri, &app.alice).await?;
    assert_eq!(fetched.data()["status"], "done");
    assert_eq!(fetched.data()["title"], "Ship");
    assert!(fetched.data()["completedAt"].is_string());

    let reopened = app.put(&uri, &app.alice, json!({ "status": "in-progress" })).await?;
    assert_eq!(reopened.status, StatusCode::OK);
    assert!(reopened.data()["completedAt"].is_null());
    Ok(())
}

#[tokio::test]
async fn deleting_missing_rows_is_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let missing = Uuid::new_v4();

    for resource in ["projects", "sprints", "tasks", "tags", "decisions", "kaizens", "meetings"] {
        let res = app.delete(&format!("/api/{}/{}", resource, missing), &app.alice).await?;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{}", resource);
        assert_eq!(res.error_code(), "NOT_FOUND");
    }

    let task = app.create("/api/tasks", &app.alice, json!({ "title": "T" })).await?;
    let res = app.delete(&format!("/api/tasks/{}", task), &app.alice).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Task deleted");
    let again = app.delete(&format!("/api/tasks/{}", task), &app.alice).await?;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn tasks_embed_relations_and_filter() -> Result<()> {
    let app = TestApp::new().await?;
    let project = app.create("/api/projects", &app.alice, json!({ "name": "Core" })).await?;
    let sprint = app
        .create(
            "/api/sprints",
            &app.alice,
            json!({ "name": "S1", "project_id": project, "start_date": "2025-03-01", "end_date": "2025-03-14" }),
        )
        .await?;
    let tag = app.create("/api/tags", &app.alice, json!({ "name": "backend", "color": "#3B82F6" })).await?;

    let res = app
        .post(
            "/api/tasks",
            &app.alice,
            json!({
                "title": "API",
                "project_id": project,
                "sprint_id": sprint,
                "assignee_id": app.bob.id,
                "tag_ids": [tag]
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    let task = res.data();
    assert_eq!(task["code"], "TASK-001");
    assert_eq!(task["project"]["code"], "PROJ-001");
    assert_eq!(task["sprint"]["name"], "S1");
    assert_eq!(task["assignee"]["email"], "bob@acme.test");
    assert_eq!(task["tags"], json!([{ "id": tag, "name": "backend", "color": "#3b82f6" }]));
    assert_eq!(task["completedHours"], 0.0);

    app.create("/api/tasks", &app.alice, json!({ "title": "Loose" })).await?;

    let filtered = app.get(&format!("/api/tasks?project_id={}", project), &app.alice).await?;
    assert_eq!(filtered.data().as_array().unwrap().len(), 1);

    let all = app.get("/api/tasks", &app.alice).await?;
    let titles: Vec<&str> = all.data().as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    // newest first
    assert_eq!(titles, vec!["Loose", "API"]);
    Ok(())
}

#[tokio::test]
async fn task_tags_can_be_replaced() -> Result<()> {
    let app = TestApp::new().await?;
    let a = app.create("/api/tags", &app.alice, json!({ "name": "a" })).await?;
    let b = app.create("/api/tags", &app.alice, json!({ "name": "b" })).await?;
    let foreign = app.create("/api/tags", &app.carol, json!({ "name": "c" })).await?;
    let task = app.create("/api/tasks", &app.alice, json!({ "title": "Tagged", "tag_ids": [a] })).await?;
    let uri = format!("/api/tasks/{}/tags", task);

    let res = app.put(&uri, &app.alice, json!({ "tag_ids": [b, a] })).await?;
    assert_eq!(res.status, StatusCode::OK);
    let names: Vec<&str> = res.data()["tags"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a", "b"]);

    let res = app.put(&uri, &app.alice, json!({ "tag_ids": [foreign] })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["fieldErrors"]["tag_ids"].is_string());

    let res = app.put(&uri, &app.alice, json!({ "tag_ids": [] })).await?;
    assert_eq!(res.data()["tags"], json!([]));
    Ok(())
}

#[tokio::test]
async fn duplicate_tag_names_conflict() -> Result<()> {
    let app = TestApp::new().await?;
    app.create("/api/tags", &app.alice, json!({ "name": "ops" })).await?;

    let res = app.post("/api/tags", &app.alice, json!({ "name": "ops" })).await?;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.error_code(), "CONFLICT");
    // another tenant may reuse the name
    let other = app.post("/api/tags", &app.carol, json!({ "name": "ops" })).await?;
    assert_eq!(other.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn time_logs_keep_task_hours_in_sync() -> Result<()> {
    let app = TestApp::new().await?;
    let task = app.create("/api/tasks", &app.alice, json!({ "title": "Build", "estimated_hours": 10 })).await?;
    let logs = format!("/api/tasks/{}/time-logs", task);

    let first = app.post(&logs, &app.alice, json!({ "hours": 2, "logged_date": "2025-03-02" })).await?;
    assert_eq!(first.status, StatusCode::CREATED);
    let bobs = app.post(&logs, &app.bob, json!({ "hours": 3.5, "logged_date": "2025-03-03" })).await?;
    let bobs_id = bobs.data()["id"].as_str().unwrap().to_string();

    let fetched = app.get(&format!("/api/tasks/{}", task), &app.alice).await?;
    assert_eq!(fetched.data()["completedHours"], 5.5);

    let listed = app.get(&logs, &app.alice).await?;
    let dates: Vec<&str> = listed.data().as_array().unwrap().iter().map(|l| l["loggedDate"].as_str().unwrap()).collect();
    assert_eq!(dates, vec!["2025-03-03", "2025-03-02"]);
    assert_eq!(listed.data()[0]["user"]["email"], "bob@acme.test");

    // only the author or an admin may delete
    let alices_id = first.data()["id"].as_str().unwrap().to_string();
    let denied = app.delete(&format!("{}/{}", logs, alices_id), &app.bob).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    // a gestor is still not an admin here
    onboarding::grant_role(app.store.as_ref(), app.bob.id, app.acme, RoleName::Gestor)
        .await
        .map_err(|e| anyhow::anyhow!("grant_role failed: {}", e.message()))?;
    let denied = app.delete(&format!("{}/{}", logs, alices_id), &app.bob).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let removed = app.delete(&format!("{}/{}", logs, bobs_id), &app.alice).await?;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.data()["hoursSynced"], true);

    let fetched = app.get(&format!("/api/tasks/{}", task), &app.alice).await?;
    assert_eq!(fetched.data()["completedHours"], 2.0);

    let recalculated = app.post(&format!("/api/tasks/{}/recalculate-hours", task), &app.alice, json!({})).await?;
    assert_eq!(recalculated.status, StatusCode::OK);
    assert_eq!(recalculated.data()["completedHours"], 2.0);
    Ok(())
}

#[tokio::test]
async fn deleting_a_sprint_returns_tasks_to_the_backlog() -> Result<()> {
    let app = TestApp::new().await?;
    let sprint = app
        .create(
            "/api/sprints",
            &app.alice,
            json!({ "name": "S", "start_date": "2025-03-01", "end_date": "2025-03-14" }),
        )
        .await?;
    let task = app.create("/api/tasks", &app.alice, json!({ "title": "T", "sprint_id": sprint })).await?;

    let res = app.delete(&format!("/api/sprints/{}", sprint), &app.alice).await?;
    assert_eq!(res.status, StatusCode::OK);

    let fetched = app.get(&format!("/api/tasks/{}", task), &app.alice).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    assert!(fetched.data()["sprintId"].is_null());
    Ok(())
}

#[tokio::test]
async fn sprint_burndown_tracks_remaining_hours() -> Result<()> {
    let app = TestApp::new().await?;
    let sprint = app
        .create(
            "/api/sprints",
            &app.alice,
            json!({ "name": "S", "start_date": "2025-03-01", "end_date": "2025-03-05" }),
        )
        .await?;
    app.create("/api/tasks", &app.alice, json!({ "title": "A", "sprint_id": sprint, "estimated_hours": 6 }))
        .await?;
    app.create(
        "/api/tasks",
        &app.alice,
        json!({ "title": "B", "sprint_id": sprint, "estimated_hours": 4, "status": "done" }),
    )
    .await?;

    let res = app.get(&format!("/api/sprints/{}/burndown", sprint), &app.alice).await?;

    assert_eq!(res.status, StatusCode::OK);
    let burndown = res.data();
    assert_eq!(burndown["totalHours"], 10.0);
    assert_eq!(burndown["taskCount"], 2);
    assert_eq!(burndown["completedCount"], 1);
    let points = burndown["points"].as_array().unwrap();
    assert_eq!(points.len(), 5);
    assert_eq!(points[0]["date"], "2025-03-01");
    assert_eq!(points[0]["ideal"], 10.0);
    assert_eq!(points[4]["ideal"], 0.0);
    Ok(())
}

#[tokio::test]
async fn board_groups_tasks_by_status() -> Result<()> {
    let app = TestApp::new().await?;
    app.create("/api/tasks", &app.alice, json!({ "title": "A" })).await?;
    app.create("/api/tasks", &app.alice, json!({ "title": "B", "status": "review" })).await?;

    let res = app.get("/api/tasks/board", &app.alice).await?;

    assert_eq!(res.status, StatusCode::OK);
    let columns = res.data().as_array().unwrap();
    let review = columns.iter().find(|c| c["status"] == "review").unwrap();
    assert_eq!(review["tasks"][0]["title"], "B");
    let total: usize = columns.iter().map(|c| c["tasks"].as_array().unwrap().len()).sum();
    assert_eq!(total, 2);
    Ok(())
}

#[tokio::test]
async fn project_limit_is_enforced() -> Result<()> {
    let app = TestApp::new().await?;
    for n in 0..5 {
        app.create("/api/projects", &app.alice, json!({ "name": format!("P{}", n) })).await?;
    }

    let res = app.post("/api/projects", &app.alice, json!({ "name": "One too many" })).await?;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.store.count("projects").await, 5);
    Ok(())
}

#[tokio::test]
async fn null_plan_limits_mean_unlimited() -> Result<()> {
    let app = TestApp::new().await?;
    app.store
        .update(
            &Query::from("tenants").eq("slug", "acme"),
            json!({ "max_users": null, "max_projects": null }).as_object().cloned().unwrap(),
        )
        .await?;

    let me = app.get("/api/me", &app.alice).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert!(me.data()["tenant"]["maxProjects"].is_null());

    for n in 0..7 {
        let res = app.post("/api/projects", &app.alice, json!({ "name": format!("P{}", n) })).await?;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    assert_eq!(app.store.count("projects").await, 7);

    let invited = app.post("/api/invitations", &app.alice, json!({ "email": "more@acme.test" })).await?;
    assert_eq!(invited.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn project_members_are_managed() -> Result<()> {
    let app = TestApp::new().await?;
    let project = app.create("/api/projects", &app.alice, json!({ "name": "Team" })).await?;
    let members = format!("/api/projects/{}/members", project);

    let added = app.post(&members, &app.alice, json!({ "user_id": app.bob.id, "role": "manager" })).await?;
    assert_eq!(added.status, StatusCode::CREATED);
    assert_eq!(added.data()["user"]["email"], "bob@acme.test");

    let duplicate = app.post(&members, &app.alice, json!({ "user_id": app.bob.id })).await?;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let outsider = app.post(&members, &app.alice, json!({ "user_id": app.carol.id })).await?;
    assert_eq!(outsider.status, StatusCode::BAD_REQUEST);

    let shown = app.get(&format!("/api/projects/{}", project), &app.alice).await?;
    assert_eq!(shown.data()["members"].as_array().unwrap().len(), 1);

    let removed = app.delete(&format!("{}/{}", members, app.bob.id), &app.alice).await?;
    assert_eq!(removed.status, StatusCode::OK);
    let listed = app.get(&members, &app.alice).await?;
    assert_eq!(listed.data(), &json!([]));
    Ok(())
}

#[tokio::test]
async fn decisions_kaizens_and_meetings() -> Result<()> {
    let app = TestApp::new().await?;
    let project = app.create("/api/projects", &app.alice, json!({ "name": "Platform" })).await?;

    let decision = app
        .post(
            "/api/decisions",
            &app.alice,
            json!({ "title": "Adopt Rust", "related_project_id": project, "alternatives": ["Go"] }),
        )
        .await?;
    assert_eq!(decision.status, StatusCode::CREATED);
    assert_eq!(decision.data()["code"], "ADR-001");
    assert_eq!(decision.data()["relatedProject"]["name"], "Platform");
    assert_eq!(decision.data()["alternatives"], json!(["Go"]));
    assert_eq!(decision.data()["consequences"], json!([]));
    let decision_id = decision.data()["id"].as_str().unwrap().to_string();

    let accepted = app
        .patch(&format!("/api/decisions/{}", decision_id), &app.alice, json!({ "status": "accepted" }))
        .await?;
    assert_eq!(accepted.status, StatusCode::OK);
    assert!(accepted.data()["decidedAt"].is_string());

    let by_project = app.get(&format!("/api/decisions?project_id={}", project), &app.alice).await?;
    assert_eq!(by_project.data().as_array().unwrap().len(), 1);

    let kaizen = app
        .create("/api/kaizens", &app.alice, json!({ "title": "Shorter standups", "responsible_id": app.bob.id }))
        .await?;
    let uri = format!("/api/kaizens/{}", kaizen);
    app.patch(&uri, &app.alice, json!({ "status": "approved" })).await?;
    app.patch(&uri, &app.alice, json!({ "status": "in-progress" })).await?;
    let implemented = app.patch(&uri, &app.alice, json!({ "status": "implemented" })).await?;
    assert_eq!(implemented.status, StatusCode::OK);
    assert!(implemented.data()["implementedAt"].is_string());
    assert_eq!(implemented.data()["responsible"]["email"], "bob@acme.test");

    let meeting = app
        .post(
            "/api/meetings",
            &app.alice,
            json!({
                "title": "Planning",
                "meeting_type": "planning",
                "meeting_date": "2025-03-03",
                "duration_minutes": 60,
                "participants_count": 5,
                "effectiveness_score": 4
            }),
        )
        .await?;
    assert_eq!(meeting.status, StatusCode::CREATED);
    assert_eq!(meeting.data()["code"], "MTG-001");
    assert_eq!(meeting.data()["effectivenessLevel"], "high");
    Ok(())
}
