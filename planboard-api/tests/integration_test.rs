/// Integration tests for the Planboard API
///
/// These tests drive the full router over an in-memory store:
/// - Authentication on every `/v1` route
/// - Project and task lifecycle with notifications and counters
/// - Engine error to HTTP status mapping
/// - Inbox and activity feed reads

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_v1_requires_bearer_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/v1/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let request = axum::http::Request::builder()
        .uri("/v1/projects")
        .header("authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(ctx.app.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Owner creates a project and a task for a collaborator, the collaborator
/// completes it, and the owner hears about it.
#[tokio::test]
async fn test_project_task_lifecycle() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;

    let (status, project) = ctx
        .post(
            "/v1/projects",
            &ada,
            json!({
                "name": "Launch",
                "collaborators": [{ "user_id": grace.id }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", project);
    assert_eq!(project["owner_id"], ada.id.to_string());
    assert_eq!(project["total_tasks"], 0);
    let project_id = project["id"].as_str().unwrap().to_string();

    // Grace was invited
    let (_, inbox) = ctx.get("/v1/notifications", &grace).await;
    assert_eq!(inbox["notifications"][0]["type"], "project_invite");

    let (status, task) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &ada,
            json!({ "title": "Write copy", "assigned_to": [grace.id] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    assert_eq!(task["status"], "todo");
    let task_id = task["id"].as_str().unwrap().to_string();

    let (_, inbox) = ctx.get("/v1/notifications", &grace).await;
    assert_eq!(inbox["notifications"][0]["type"], "task_assigned");
    assert_eq!(
        inbox["notifications"][0]["message"],
        "Ada assigned you to \"Write copy\""
    );

    // The assignee may move the status
    let (status, updated) = ctx
        .patch(
            &format!("/v1/tasks/{}", task_id),
            &grace,
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["status"], "completed");

    let (_, project) = ctx.get(&format!("/v1/projects/{}", project_id), &ada).await;
    assert_eq!(project["total_tasks"], 1);
    assert_eq!(project["completed_tasks"], 1);

    let (_, inbox) = ctx.get("/v1/notifications?unread_only=true", &ada).await;
    let first = &inbox["notifications"][0];
    assert_eq!(first["type"], "task_completed");
    assert_eq!(first["message"], "Grace completed \"Write copy\"");

    let (_, stats) = ctx
        .get(&format!("/v1/projects/{}/stats", project_id), &ada)
        .await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed"], 1);

    // ...but not rename it
    let (status, _) = ctx
        .patch(
            &format!("/v1/tasks/{}", task_id),
            &grace,
            json!({ "title": "Mine now" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&format!("/v1/tasks/{}", task_id), &ada).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, project) = ctx.get(&format!("/v1/projects/{}", project_id), &ada).await;
    assert_eq!(project["total_tasks"], 0);
    assert_eq!(project["completed_tasks"], 0);
}

#[tokio::test]
async fn test_error_status_mapping() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;
    let project_id = ctx.create_project(&ada, "Launch").await;

    // 404 for a project that does not exist
    let (status, body) = ctx
        .get(&format!("/v1/projects/{}", uuid::Uuid::new_v4()), &ada)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // 403 for an outsider
    let (status, body) = ctx.get(&format!("/v1/projects/{}", project_id), &grace).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    // 422 for request validation
    let (status, body) = ctx.post("/v1/projects", &ada, json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "name");

    // 400 for a body that does not deserialize
    let (status, body) = ctx.post("/v1/projects", &ada, json!({ "name": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    // 409 for a duplicate collaborator
    let uri = format!("/v1/projects/{}/collaborators", project_id);
    let (status, _) = ctx.post(&uri, &ada, json!({ "user_id": grace.id })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = ctx.post(&uri, &ada, json!({ "user_id": grace.id })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // 422 for an unknown role
    let carol = ctx.user("Carol").await;
    let (status, _) = ctx
        .post(&uri, &ada, json!({ "user_id": carol.id, "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_patch_ignores_counter_fields() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let project_id = ctx.create_project(&ada, "Launch").await;

    let (status, project) = ctx
        .patch(
            &format!("/v1/projects/{}", project_id),
            &ada,
            json!({ "name": "Relaunch", "total_tasks": 99, "completed_tasks": 7 }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Relaunch");
    assert_eq!(project["total_tasks"], 0);
    assert_eq!(project["completed_tasks"], 0);
}

#[tokio::test]
async fn test_urgent_tasks_ordering() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let project_id = ctx.create_project(&ada, "Launch").await;
    let tasks_uri = format!("/v1/projects/{}/tasks", project_id);
    let now = Utc::now();

    for (title, priority, due) in [
        ("later", "low", Some(now + Duration::days(2))),
        ("sooner", "medium", Some(now + Duration::hours(6))),
        ("undated", "high", None),
        ("far", "low", Some(now + Duration::days(30))),
    ] {
        let (status, _) = ctx
            .post(
                &tasks_uri,
                &ada,
                json!({ "title": title, "priority": priority, "due_date": due }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx.get("/v1/tasks/urgent", &ada).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["sooner", "later", "undated"]);
}

#[tokio::test]
async fn test_comment_mentions_and_inbox() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;
    let project_id = ctx.create_project(&ada, "Launch").await;
    ctx.post(
        &format!("/v1/projects/{}/collaborators", project_id),
        &ada,
        json!({ "user_id": grace.id }),
    )
    .await;

    let (_, task) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &ada,
            json!({ "title": "Write copy" }),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();
    let comments_uri = format!("/v1/tasks/{}/comments", task_id);

    // project_id is required
    let (status, _) = ctx
        .post(&comments_uri, &grace, json!({ "content": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, comment) = ctx
        .post(
            &comments_uri,
            &grace,
            json!({
                "project_id": project_id,
                "content": "Draft is up",
                "mentions": [ada.id]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", comment);

    let (_, listed) = ctx.get(&comments_uri, &ada).await;
    assert_eq!(listed["comments"].as_array().unwrap().len(), 1);

    // Ada was mentioned, so she gets the mention rather than the comment notice
    let (_, inbox) = ctx.get("/v1/notifications", &ada).await;
    let notifications = inbox["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "mention");
    let notification_id = notifications[0]["id"].as_str().unwrap().to_string();

    let (_, count) = ctx.get("/v1/notifications/unread-count", &ada).await;
    assert_eq!(count["unread"], 1);

    // Grace cannot touch Ada's notification
    let (status, _) = ctx
        .send(
            "POST",
            &format!("/v1/notifications/{}/read", notification_id),
            Some(&grace),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, read) = ctx
        .send(
            "POST",
            &format!("/v1/notifications/{}/read", notification_id),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["is_read"], true);

    let (_, count) = ctx.get("/v1/notifications/unread-count", &ada).await;
    assert_eq!(count["unread"], 0);

    let (status, _) = ctx
        .delete(&format!("/v1/notifications/{}", notification_id), &ada)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, inbox) = ctx.get("/v1/notifications", &ada).await;
    assert!(inbox["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_all_read() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;

    for name in ["Launch", "Docs"] {
        ctx.post(
            "/v1/projects",
            &ada,
            json!({ "name": name, "collaborators": [{ "user_id": grace.id }] }),
        )
        .await;
    }

    let (status, body) = ctx
        .send("POST", "/v1/notifications/read-all", Some(&grace), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, body) = ctx
        .send("POST", "/v1/notifications/read-all", Some(&grace), None)
        .await;
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn test_activity_feeds() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;
    let project_id = ctx.create_project(&ada, "Launch").await;

    ctx.post(
        &format!("/v1/projects/{}/tasks", project_id),
        &ada,
        json!({ "title": "Write copy" }),
    )
    .await;

    let (status, feed) = ctx
        .get(&format!("/v1/projects/{}/activities?limit=10", project_id), &ada)
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = feed["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created_task", "created_project"]);

    let (status, _) = ctx
        .get(&format!("/v1/projects/{}/activities", project_id), &grace)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, mine) = ctx.get("/v1/activities/me", &grace).await;
    assert!(mine["activities"].as_array().unwrap().is_empty());

    let (status, _) = ctx.get("/v1/activities/me?limit=abc", &ada).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_project_removes_tasks() {
    let ctx = TestContext::new();
    let ada = ctx.user("Ada").await;
    let grace = ctx.user("Grace").await;
    let project_id = ctx.create_project(&ada, "Launch").await;

    let (_, task) = ctx
        .post(
            &format!("/v1/projects/{}/tasks", project_id),
            &ada,
            json!({ "title": "Write copy" }),
        )
        .await;
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, _) = ctx.delete(&format!("/v1/projects/{}", project_id), &grace).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&format!("/v1/projects/{}", project_id), &ada).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.get(&format!("/v1/tasks/{}", task_id), &ada).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, projects) = ctx.get("/v1/projects", &ada).await;
    assert!(projects["projects"].as_array().unwrap().is_empty());
}
