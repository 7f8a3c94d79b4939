mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, read_json, TestApp};
use serde_json::{json, Value};

async fn unread(app: &TestApp, path: &str, token: &str) -> Result<i64> {
    let body: Value = read_json(app.get(path, Some(token)).await?).await?;
    Ok(body["count"].as_i64().unwrap_or(-1))
}

#[tokio::test]
async fn residents_write_to_the_office_and_staff_reply() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let (resident_id, resident) = app.user_with_token("maria", "resident", "verified").await?;
    let (staff_id, staff) = app.user_with_token("clerk", "staff", "verified").await?;
    let (_, admin) = app.user_with_token("captain", "admin", "verified").await?;

    let addressed = app
        .post_json(
            "/api/messages",
            &json!({ "recipient_id": staff_id, "subject": "Hi", "body": "Hello" }),
            Some(&resident),
        )
        .await?;
    assert_eq!(addressed.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/messages",
            &json!({ "subject": "Clearance", "body": "When can I pick it up?" }),
            Some(&resident),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sent: Value = read_json(response).await?;
    assert!(sent["recipient_id"].is_null());

    // Every office account sees the same office message.
    assert_eq!(unread(&app, "/api/messages/unread-count", &staff).await?, 1);
    assert_eq!(unread(&app, "/api/messages/unread-count", &admin).await?, 1);
    assert_eq!(unread(&app, "/api/messages/unread-count", &resident).await?, 0);

    let office: Vec<Value> = read_json(app.get("/api/messages", Some(&staff)).await?).await?;
    assert_eq!(office.len(), 1);
    let message_id = office[0]["id"].as_str().unwrap_or_default().to_string();

    let response = app
        .post_empty(&format!("/api/messages/{message_id}/read"), Some(&staff))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(unread(&app, "/api/messages/unread-count", &admin).await?, 0);

    let not_visible = app
        .post_empty(&format!("/api/messages/{message_id}/read"), Some(&resident))
        .await?;
    assert_eq!(not_visible.status(), StatusCode::NOT_FOUND);

    let unaddressed = app
        .post_json(
            "/api/messages",
            &json!({ "subject": "Re: Clearance", "body": "Tomorrow" }),
            Some(&staff),
        )
        .await?;
    assert_eq!(unaddressed.status(), StatusCode::BAD_REQUEST);

    let reply = app
        .post_json(
            "/api/messages",
            &json!({ "recipient_id": resident_id, "subject": "Re: Clearance", "body": "Tomorrow" }),
            Some(&staff),
        )
        .await?;
    assert_eq!(reply.status(), StatusCode::CREATED);
    assert_eq!(unread(&app, "/api/messages/unread-count", &resident).await?, 1);

    let sent_box: Vec<Value> =
        read_json(app.get("/api/messages?box=sent", Some(&resident)).await?).await?;
    assert_eq!(sent_box.len(), 1);
    assert_eq!(sent_box[0]["subject"], "Clearance");

    let bad_box = app.get("/api/messages?box=archive", Some(&resident)).await?;
    assert_eq!(bad_box.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unread_notifications_follow_read_state() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };
    let (resident_id, resident) = app.user_with_token("maria", "resident", "verified").await?;
    let (_, staff) = app.user_with_token("clerk", "staff", "verified").await?;

    for request_type in ["barangay-clearance", "certificate-of-residency"] {
        let created: Value =
            read_json(app.submit_request(&resident, request_type, "0").await?).await?;
        let id = created["id"].as_str().unwrap_or_default().to_string();
        let response = app
            .post_json(
                &format!("/api/requests/{id}/decline"),
                &json!({ "reason": "Incomplete" }),
                Some(&staff),
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let rows = app
        .count(&format!(
            "SELECT COUNT(*) AS count FROM inbox_items \
             WHERE recipient_id = '{resident_id}' AND kind = 'notification' AND NOT read"
        ))
        .await?;
    assert_eq!(rows, 2);
    assert_eq!(
        unread(&app, "/api/notifications/unread-count", &resident).await?,
        rows
    );
    assert_eq!(unread(&app, "/api/notifications/unread-count", &staff).await?, 0);

    let notifications: Vec<Value> =
        read_json(app.get("/api/notifications", Some(&resident)).await?).await?;
    let first = notifications[0]["id"].as_str().unwrap_or_default().to_string();
    let response = app
        .post_empty(&format!("/api/notifications/{first}/read"), Some(&resident))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(unread(&app, "/api/notifications/unread-count", &resident).await?, 1);

    let cleared: Value = read_json(
        app.post_empty("/api/notifications/read-all", Some(&resident))
            .await?,
    )
    .await?;
    assert_eq!(cleared["updated"], 1);
    assert_eq!(unread(&app, "/api/notifications/unread-count", &resident).await?, 0);

    app.cleanup().await?;
    Ok(())
}
