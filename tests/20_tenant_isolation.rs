mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn lists_only_show_the_callers_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    app.create("/api/projects", &app.alice, json!({ "name": "Acme rollout" })).await?;
    app.create("/api/projects", &app.carol, json!({ "name": "Globex rollout" })).await?;
    app.create("/api/tags", &app.carol, json!({ "name": "urgent" })).await?;

    let acme = app.get("/api/projects", &app.bob).await?;
    assert_eq!(acme.status, StatusCode::OK);
    let names: Vec<&str> = acme
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Acme rollout"]);
    assert!(acme.data()[0]["tenantId"] == app.acme.to_string());

    let tags = app.get("/api/tags", &app.alice).await?;
    assert_eq!(tags.data().as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn cross_tenant_ids_are_not_found() -> Result<()> {
    let app = TestApp::new().await?;
    let project = app.create("/api/projects", &app.carol, json!({ "name": "Secret" })).await?;
    let uri = format!("/api/projects/{}", project);

    let get = app.get(&uri, &app.alice).await?;
    assert_eq!(get.status, StatusCode::NOT_FOUND);
    assert_eq!(get.error_code(), "NOT_FOUND");

    let patch = app.patch(&uri, &app.alice, json!({ "name": "Mine now" })).await?;
    assert_eq!(patch.status, StatusCode::NOT_FOUND);

    let delete = app.delete(&uri, &app.alice).await?;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    // untouched for the owner
    let owner = app.get(&uri, &app.carol).await?;
    assert_eq!(owner.status, StatusCode::OK);
    assert_eq!(owner.data()["name"], "Secret");
    Ok(())
}

#[tokio::test]
async fn client_supplied_tenant_id_is_ignored() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app
        .post(
            "/api/projects",
            &app.alice,
            json!({ "name": "Sneaky", "tenant_id": app.globex, "tenantId": app.globex }),
        )
        .await?;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["tenantId"], app.acme.to_string());
    let globex = app.get("/api/projects", &app.carol).await?;
    assert_eq!(globex.data().as_array().unwrap().len(), 0);
    Ok(())
}

#[tokio::test]
async fn references_must_belong_to_the_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    let foreign = app.create("/api/projects", &app.carol, json!({ "name": "Globex" })).await?;

    let res = app
        .post("/api/tasks", &app.alice, json!({ "title": "Leak", "project_id": foreign }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["fieldErrors"]["project_id"], "Project not found");

    let res = app
        .post("/api/tasks", &app.alice, json!({ "title": "Assign", "assignee_id": app.carol.id }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["fieldErrors"]["assignee_id"], "User not found");
    assert_eq!(app.store.count("tasks").await, 0);
    Ok(())
}

#[tokio::test]
async fn time_logs_of_foreign_tasks_are_hidden() -> Result<()> {
    let app = TestApp::new().await?;
    let task = app.create("/api/tasks", &app.carol, json!({ "title": "Globex task" })).await?;

    let res = app.get(&format!("/api/tasks/{}/time-logs", task), &app.alice).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .post(&format!("/api/tasks/{}/time-logs", task), &app.alice, json!({ "hours": 1 }))
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.count("time_logs").await, 0);
    Ok(())
}

#[tokio::test]
async fn malformed_ids_are_not_found() -> Result<()> {
    let app = TestApp::new().await?;

    let res = app.get("/api/tasks/not-a-uuid", &app.alice).await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
