mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use townsquare::middleware::ACCOUNT_HEADER;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        request = request.header(ACCOUNT_HEADER, actor);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn event_body(title: &str) -> Value {
    let starts_at = chrono::Utc::now() + chrono::Duration::days(5);
    json!({
        "title": title,
        "description": "Bring a friend",
        "location": "Town Square, Borås",
        "category": "market",
        "starts_at": starts_at,
    })
}

#[tokio::test]
async fn health_and_banner() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn writes_need_a_known_account() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());

    let (status, _) = send(&app, "POST", "/api/events", None, Some(event_body("Fair"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/events",
        Some("not-a-uuid"),
        Some(event_body("Fair")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stranger = uuid::Uuid::new_v4().to_string();
    let (status, _) = send(
        &app,
        "POST",
        "/api/events",
        Some(&stranger),
        Some(event_body("Fair")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_create_rsvp_and_notify_over_http() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());

    let (status, owner) = send(
        &app,
        "POST",
        "/api/accounts",
        None,
        Some(json!({ "display_name": "Olle", "email": "olle@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let owner_id = owner["id"].as_str().unwrap().to_string();

    let guest = w.member().await.id.to_string();

    let (status, event) = send(
        &app,
        "POST",
        "/api/events",
        Some(&owner_id),
        Some(event_body("Flea Market")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_i64().unwrap();

    let rsvp_uri = format!("/api/events/{event_id}/rsvp");
    let (status, receipt) = send(&app, "POST", &rsvp_uri, Some(&guest), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(receipt["notification"].is_i64());

    let (status, body) = send(&app, "POST", &rsvp_uri, Some(&guest), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, count) = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}/rsvp/count"),
        None,
        None,
    )
    .await;
    assert_eq!(count["count"], 1);

    let (_, mine) = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}/rsvp/me"),
        Some(&guest),
        None,
    )
    .await;
    assert_eq!(mine["has_rsvp"], true);
    let (_, anon) = send(&app, "GET", &format!("/api/events/{event_id}/rsvp/me"), None, None).await;
    assert_eq!(anon["has_rsvp"], false);

    let (_, details) = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}"),
        Some(&owner_id),
        None,
    )
    .await;
    assert_eq!(details["creator_name"], "Olle");
    assert_eq!(details["rsvp_count"], 1);
    assert_eq!(details["viewer_is_creator"], true);
    assert!(details["weather"].is_null());

    let (_, unread) = send(
        &app,
        "GET",
        "/api/me/notifications/unread",
        Some(&owner_id),
        None,
    )
    .await;
    assert_eq!(unread["unread"], 1);

    let (_, inbox) = send(&app, "GET", "/api/me/notifications", Some(&owner_id), None).await;
    let notification_id = inbox["notifications"][0]["id"].as_i64().unwrap();
    assert_eq!(inbox["notifications"][0]["event"]["id"], event_id);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/me/notifications/{notification_id}/read"),
        Some(&guest),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/me/notifications/read-all",
        Some(&owner_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marked_read"], 1);

    let (status, _) = send(&app, "DELETE", &rsvp_uri, Some(&guest), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invalid_event_is_unprocessable_with_fields() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());
    let owner = w.member().await.id.to_string();

    let mut body = event_body("");
    body["category"] = json!("rave");
    let (status, json) = send(&app, "POST", "/api/events", Some(&owner), Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["category", "title"]);
}

#[tokio::test]
async fn listing_filters_by_category_and_keyword() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());
    let owner = w.member().await;
    w.event_by(&owner, "Board Games", 2).await;
    w.state
        .catalog
        .create(
            owner.id,
            townsquare::models::EventInput {
                category: "concert".into(),
                ..common::event_input("Jazz Evening", 4)
            },
        )
        .await
        .unwrap();

    let (_, all) = send(&app, "GET", "/api/events", None, None).await;
    assert_eq!(all["count"], 2);

    let (_, concerts) = send(&app, "GET", "/api/events?category=concert", None, None).await;
    assert_eq!(concerts["count"], 1);
    assert_eq!(concerts["events"][0]["title"], "Jazz Evening");

    let (_, games) = send(&app, "GET", "/api/events?q=BOARD", None, None).await;
    assert_eq!(games["count"], 1);

    let (status, _) = send(&app, "GET", "/api/events?category=rave", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_check_the_role() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());
    let member = w.member().await;
    let admin = w.admin.id.to_string();

    let (status, _) = send(
        &app,
        "GET",
        "/api/admin/overview",
        Some(&member.id.to_string()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, overview) = send(&app, "GET", "/api/admin/overview", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["accounts"], 2);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/accounts/{admin}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let event = w.event_by(&member, "Left Behind", 6).await;
    let (status, removed) = send(
        &app,
        "DELETE",
        &format!("/api/admin/accounts/{}", member.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["removed"]["orphaned_events"], 1);

    let (_, orphans) = send(&app, "GET", "/api/admin/orphaned-events", Some(&admin), None).await;
    assert_eq!(orphans["events"][0]["id"], event.id.0);

    let (status, claimed) = send(
        &app,
        "POST",
        &format!("/api/admin/orphaned-events/{}/reassign", event.id),
        Some(&admin),
        Some(json!({ "new_owner": admin })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claimed["created_by"], admin);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/admin/accounts/{admin}/roles/Wizard"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_fields_come_back_as_a_validation_body() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());
    let owner = w.member().await.id.to_string();

    let (status, json) = send(
        &app,
        "POST",
        "/api/events",
        Some(&owner),
        Some(json!({ "title": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["success"], false);
    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["category", "description", "location", "starts_at"]);

    let (status, json) = send(
        &app,
        "POST",
        "/api/accounts",
        None,
        Some(json!({ "display_name": "Nils" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["fields"][0]["field"], "email");
}

#[tokio::test]
async fn profile_and_admin_statistics_routes() {
    let w = common::world().await;
    let app = townsquare::app(w.state.clone());
    let host = w.member().await;
    let fan = w.member().await;
    let event = w.event_by(&host, "Allotment Open Day", 3).await;
    w.state.rsvps.create_rsvp(event.id, fan.id).await.unwrap();

    let fan_id = fan.id.to_string();
    let (status, stats) = send(&app, "GET", "/api/me/stats", Some(&fan_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["rsvps_made"], 1);
    assert_eq!(stats["upcoming_events"], 1);
    assert_eq!(stats["favourite_category"], "other");

    let admin = w.admin.id.to_string();
    let (status, details) = send(
        &app,
        "GET",
        &format!("/api/admin/accounts/{}", host.id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["display_name"], host.display_name);
    assert_eq!(details["events_created"], 1);
    assert_eq!(details["roles"], json!(["User"]));

    let (status, statistics) =
        send(&app, "GET", "/api/admin/statistics", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statistics["upcoming"], 1);
    assert_eq!(statistics["most_popular"]["id"], event.id.0);
    assert_eq!(statistics["most_popular"]["rsvps"], 1);

    let (status, _) = send(&app, "GET", "/api/admin/statistics", Some(&fan_id), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
