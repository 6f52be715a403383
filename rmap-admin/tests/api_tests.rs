//! Integration tests for the rmap-admin HTTP API
//!
//! Each test runs the full router against a throwaway SQLite file with the
//! geocoder disabled, so no network traffic is generated.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rmap_admin::AppState;
use rmap_common::config::TomlConfig;
use rmap_common::db::{count_listings, fetch_listings, init_database, ListingTable};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "rmap-test-boundary";

async fn create_test_app_with(
    customize: impl FnOnce(&mut TomlConfig),
) -> (TempDir, AppState, Router) {
    let dir = TempDir::new().unwrap();
    let mut config = TomlConfig {
        database: dir.path().join("rmap.db"),
        image_root: dir.path().join("images"),
        ..Default::default()
    };
    config.geocoder.enabled = false;
    customize(&mut config);

    let pool = init_database(&config.database).await.unwrap();
    let state = AppState::new(pool, config).unwrap();
    let app = rmap_admin::build_router(state.clone());
    (dir, state, app)
}

async fn create_test_app() -> (TempDir, AppState, Router) {
    create_test_app_with(|_| {}).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Start a wizard session and return its cookie
async fn start_session(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/listings/upload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie issued")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn multipart_body(csv: Option<&str>, disable_strict: bool) -> Vec<u8> {
    let mut body = String::new();
    if let Some(csv) = csv {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"listings\"; filename=\"listings.csv\"\r\nContent-Type: text/csv\r\n\r\n{}\r\n",
            BOUNDARY, csv
        ));
    }
    if disable_strict {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"disableStrict\"\r\n\r\ntrue\r\n",
            BOUNDARY
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

async fn upload(app: &Router, cookie: &str, csv: Option<&str>, disable_strict: bool) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/listings/upload")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(csv, disable_strict)))
        .unwrap();
    send(app, request).await
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, org_user: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = org_user {
        builder = builder.header("x-rmap-user-id", user.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn backup_guids(pool: &SqlitePool) -> Vec<i64> {
    fetch_listings(pool, ListingTable::Backup)
        .await
        .unwrap()
        .iter()
        .map(|l| l.guid)
        .collect()
}

fn pantry(guid: i64) -> Value {
    json!({
        "guid": guid,
        "full_name": "Community Pantry",
        "category": "Food: Pantry",
        "description": "Weekly groceries",
        "full_address": "1 Main St, Casper, WY",
        "latitude": 42.85,
        "longitude": -106.3,
        "keywords": ["Groceries", "Free"],
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, _state, app) = create_test_app().await;

    let (status, body) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rmap-admin");
}

#[tokio::test]
async fn test_row_without_coordinates_is_staged() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let csv = "GUID,Full Name,Category,Description,Latitude,Longitude\n\
               1,Teen Center,Health: Mental Health,Drop-in counselling,,\n";
    let (status, body) = upload(&app, &cookie, Some(csv), false).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["report"]["staged_rows"], 1);
    assert_eq!(body["report"]["unmapped_rows"], 1);
    assert_eq!(body["session"]["upload"], true);

    let staged = fetch_listings(&state.db, ListingTable::Staging).await.unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].full_name, "Teen Center");
    assert_eq!(staged[0].city, None);
    assert_eq!(staged[0].coordinates(), None);
    assert_eq!(staged[0].parent_category.as_deref(), Some("Health"));
    assert_eq!(staged[0].sub_category.as_deref(), Some("Mental Health"));
}

#[tokio::test]
async fn test_row_outside_region_is_dropped() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let csv = "guid,full_name,category,description,full_address,latitude,longitude\n\
               1,Casper Clinic,Health,Clinic,\"9 Elm St, Casper, WY\",42.85,-106.3\n\
               2,Ogden Clinic,Health,Clinic,\"1 Main St, Ogden, UT\",41.0,-112.0\n";
    let (status, body) = upload(&app, &cookie, Some(csv), false).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["report"]["parsed_rows"], 2);
    assert_eq!(body["report"]["staged_rows"], 1);
    assert_eq!(body["report"]["dropped_outside_region"], json!([2]));

    let staged = fetch_listings(&state.db, ListingTable::Staging).await.unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].guid, 1);
    assert_eq!(staged[0].city.as_deref(), Some("Casper"));
}

#[tokio::test]
async fn test_escape_hatch_after_two_failures() {
    let (_dir, _state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    // Missing description is a strict-only violation
    let csv = "guid,full_name,category\n1,Clinic,Health\n";

    let (status, body) = upload(&app, &cookie, Some(csv), false).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["errors"][0]["field"], "description");
    assert_eq!(body["show_escape_hatch"], false);

    // Requested too early: still strict
    let (status, body) = upload(&app, &cookie, Some(csv), true).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["session"]["attempts"], 2);
    assert_eq!(body["show_escape_hatch"], true);

    // Third attempt re-uses the retained rows
    let (status, body) = upload(&app, &cookie, None, true).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["report"]["mode"], "relaxed");
    assert_eq!(body["report"]["attempt"], 3);
    assert_eq!(body["report"]["staged_rows"], 1);

    let (status, body) = send(&app, get_with_cookie("/listings/preview", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["attempts"], 0);
    assert_eq!(body["session"]["show_escape_hatch"], false);
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_coordinate_only_violations_still_stage() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let csv = "guid,full_name,category,description,latitude,longitude\n\
               1,Clinic,Health,Clinic,north,-106.3\n";
    let (status, body) = upload(&app, &cookie, Some(csv), false).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["report"]["mode"], "strict");
    assert_eq!(body["report"]["coordinate_warnings"].as_array().unwrap().len(), 1);
    assert_eq!(body["report"]["coordinate_warnings"][0]["field"], "latitude");

    let staged = fetch_listings(&state.db, ListingTable::Staging).await.unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].latitude, None);
}

#[tokio::test]
async fn test_unreadable_upload() {
    let (_dir, _state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let (status, body) = upload(&app, &cookie, Some("guid,full_name\n1,a,extra\n"), false).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "FILE_UNREADABLE");
    assert_eq!(body["session"]["staging_state"], "parse_failed");

    // No file and nothing retained
    let (status, _) = upload(&app, &cookie, None, false).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_repeated_guid_is_a_validation_error() {
    let (_dir, _state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let csv = "guid,full_name,category,description\n\
               1,Clinic,Health,Clinic\n\
               1,Shelter,Housing,Beds\n";
    for _ in 0..3 {
        let (status, body) = upload(&app, &cookie, Some(csv), true).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert_eq!(body["errors"][0]["field"], "guid");
        assert_eq!(body["errors"][0]["kind"], "duplicate");
        assert_eq!(body["errors"][0]["row"], 2);
        assert_eq!(body["errors"][0]["first_row"], 1);
        assert_eq!(body["session"]["staging_state"], "validation_failed");
    }
}

#[tokio::test]
async fn test_staging_times_out_while_pipeline_busy() {
    let (_dir, state, app) = create_test_app_with(|config| config.staging_timeout_secs = 1).await;
    let cookie = start_session(&app).await;

    let _busy = state.pipeline_lock.lock().await;
    let csv = "guid,full_name,category,description\n1,Clinic,Health,Clinic\n";
    let (status, body) = upload(&app, &cookie, Some(csv), false).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STAGING_TIMEOUT");
    assert_eq!(body["session"]["staging_state"], "persist_failed");
}

#[tokio::test]
async fn test_geocode_step_tolerates_disabled_geocoder() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let csv = "guid,full_name,category,description,full_address\n\
               1,Clinic,Health,Clinic,\"9 Elm St, Laramie, WY\"\n";
    let (status, _) = upload(&app, &cookie, Some(csv), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, post_with_cookie("/listings/geocode", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["attempted"], 1);
    assert_eq!(body["summary"]["geocoded"], 0);
    assert_eq!(body["summary"]["failed"], json!([1]));
    assert_eq!(body["session"]["geocoding"], true);

    let staged = fetch_listings(&state.db, ListingTable::Staging).await.unwrap();
    assert_eq!(staged[0].coordinates(), None);
}

#[tokio::test]
async fn test_promotion_replaces_production() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let (status, _) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(100), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let csv = "guid,full_name,category,description,full_address,latitude,longitude\n\
               1,Casper Clinic,Health,Clinic,\"9 Elm St, Casper, WY\",42.85,-106.3\n\
               2,Teen Center,Health: Mental Health,Counselling,,,\n";
    let (status, _) = upload(&app, &cookie, Some(csv), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(&app, get_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "updated");
    assert_eq!(body["report"]["backup_rows"], 1);
    assert_eq!(body["report"]["production_rows"], 2);
    assert_eq!(body["report"]["cached_rows"], 1);
    assert_eq!(body["report"]["record"]["filename"], "listings.csv");
    assert_eq!(body["session"]["update"], true);

    let production = fetch_listings(&state.db, ListingTable::Production).await.unwrap();
    let guids: Vec<i64> = production.iter().map(|l| l.guid).collect();
    assert_eq!(guids, vec![1, 2]);
    assert_eq!(count_listings(&state.db, ListingTable::Backup).await.unwrap(), 1);

    // Resubmitting the same batch must not snapshot the promoted rows
    let (status, _) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let backup = fetch_listings(&state.db, ListingTable::Backup).await.unwrap();
    assert_eq!(backup.iter().map(|l| l.guid).collect::<Vec<_>>(), vec![100]);

    let (_, body) = send(&app, get_with_cookie("/listings/status", &cookie)).await;
    assert_eq!(body["session"]["staging_state"], "promoted");
    assert_eq!(body["session"]["update"], true);
}

#[tokio::test]
async fn test_promotion_failure_after_production_replaced() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(100), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let csv = "guid,full_name,category,description\n\
               1,Clinic,Health,Clinic\n\
               2,Shelter,Housing: Emergency,Beds\n";
    let (status, _) = upload(&app, &cookie, Some(csv), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // A view cannot be dropped with DROP TABLE, so the cache rebuild fails
    sqlx::query("DROP TABLE geocoding").execute(&state.db).await.unwrap();
    sqlx::query("CREATE VIEW geocoding AS SELECT 1 AS guid")
        .execute(&state.db)
        .await
        .unwrap();

    let (status, body) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "PROMOTION_FAILED");
    assert_eq!(body["failed_step"], "rebuild_geocode_cache");
    assert_eq!(
        body["completed_steps"],
        json!(["backup_snapshot", "replace_production"])
    );
    assert_eq!(body["production_replaced"], true);
    assert!(body["detail"].as_str().unwrap().contains("listing_backup"));
    assert_eq!(body["session"]["update"], false);

    let backup = fetch_listings(&state.db, ListingTable::Backup).await.unwrap();
    assert_eq!(backup.len(), 1);
    assert_eq!(backup[0].guid, 100);

    let production = fetch_listings(&state.db, ListingTable::Production).await.unwrap();
    let guids: Vec<i64> = production.iter().map(|l| l.guid).collect();
    assert_eq!(guids, vec![1, 2]);
}

#[tokio::test]
async fn test_promotion_retry_keeps_backup_and_resumes() {
    let (_dir, state, app) = create_test_app().await;
    let cookie = start_session(&app).await;

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(100), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let csv = "guid,full_name,category,description,full_address,latitude,longitude\n\
               1,Casper Clinic,Health,Clinic,\"9 Elm St, Casper, WY\",42.85,-106.3\n\
               2,Shelter,Housing: Emergency,Beds,,,\n";
    let (status, _) = upload(&app, &cookie, Some(csv), false).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    sqlx::query("DROP TABLE geocoding").execute(&state.db).await.unwrap();
    sqlx::query("CREATE VIEW geocoding AS SELECT 1 AS guid")
        .execute(&state.db)
        .await
        .unwrap();

    for _ in 0..2 {
        let (status, body) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["failed_step"], "rebuild_geocode_cache");
        assert_eq!(
            body["completed_steps"],
            json!(["backup_snapshot", "replace_production"])
        );
        assert_eq!(backup_guids(&state.db).await, vec![100]);
    }

    // Storage recovers; the retry finishes steps 3 and 4 only
    sqlx::query("DROP VIEW geocoding").execute(&state.db).await.unwrap();
    let (status, body) = send(&app, post_with_cookie("/listings/update", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["resumed"], true);
    assert_eq!(body["report"]["backup_rows"], 1);
    assert_eq!(body["report"]["production_rows"], 2);
    assert_eq!(body["report"]["cached_rows"], 1);
    assert_eq!(body["report"]["record"]["row_count"], 2);
    assert_eq!(
        body["report"]["completed"],
        json!([
            "backup_snapshot",
            "replace_production",
            "rebuild_geocode_cache",
            "record_metadata"
        ])
    );

    assert_eq!(backup_guids(&state.db).await, vec![100]);
    let production = fetch_listings(&state.db, ListingTable::Production).await.unwrap();
    assert_eq!(production.iter().map(|l| l.guid).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_manual_listing_lifecycle() {
    let (_dir, _state, app) = create_test_app().await;

    let (status, body) = send(&app, json_request("POST", "/listings", pantry(100), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["city"], "Casper");
    assert_eq!(body["parent_category"], "Food");
    assert_eq!(body["sub_category"], "Pantry");
    assert_eq!(body["keywords"], json!(["Groceries"]));
    assert_eq!(body["cost_keywords"], json!(["Free"]));

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(100), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut edited = pantry(100);
    edited["full_name"] = json!("Casper Community Pantry");
    let (status, body) = send(&app, json_request("PUT", "/listings/100", edited, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Casper Community Pantry");

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri("/listings/100")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Request::builder().uri("/listings/100").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_listing_rejections() {
    let (_dir, _state, app) = create_test_app().await;

    let mut outside = pantry(1);
    outside["latitude"] = json!(41.0);
    outside["longitude"] = json!(-112.0);
    let (status, body) = send(&app, json_request("POST", "/listings", outside, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNPROCESSABLE");

    let mut incomplete = pantry(2);
    incomplete.as_object_mut().unwrap().remove("description");
    let (status, body) = send(&app, json_request("POST", "/listings", incomplete, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(body["errors"][0]["field"], "description");
}

#[tokio::test]
async fn test_org_users_only_edit_managed_listings() {
    let (_dir, _state, app) = create_test_app().await;

    let (status, body) = send(&app, json_request("POST", "/listings", pantry(7), Some(42))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["managed_by"], 42);

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(8), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Owner may edit but not hand the listing to someone else
    let mut edited = pantry(7);
    edited["managed_by"] = json!(99);
    let (status, body) = send(&app, json_request("PUT", "/listings/7", edited, Some(42))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["managed_by"], 42);

    let (status, body) = send(&app, json_request("PUT", "/listings/8", pantry(8), Some(42))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Staff edits keep ownership when the body omits it
    let (status, body) = send(&app, json_request("PUT", "/listings/7", pantry(7), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["managed_by"], 42);
}

#[tokio::test]
async fn test_listing_image_upload() {
    let (dir, _state, app) = create_test_app().await;

    let (status, _) = send(&app, json_request("POST", "/listings", pantry(5), None)).await;
    assert_eq!(status, StatusCode::CREATED);

    let image_request = |content_type: &str| {
        Request::builder()
            .method("POST")
            .uri("/listings/5/image")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(b"\x89PNG\r\n".to_vec()))
            .unwrap()
    };

    let (status, body) = send(&app, image_request("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    let first = body["image_url"].as_str().unwrap().to_string();
    assert!(first.starts_with("listings/5/"));
    assert!(dir.path().join("images").join(&first).exists());

    let (status, body) = send(&app, image_request("image/png")).await;
    assert_eq!(status, StatusCode::OK);
    let second = body["image_url"].as_str().unwrap().to_string();
    assert_ne!(first, second);
    assert!(!dir.path().join("images").join(&first).exists());

    let (status, _) = send(&app, image_request("image/gif")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_schema_document() {
    let (_dir, _state, app) = create_test_app().await;

    let (status, strict) = send(
        &app,
        Request::builder()
            .uri("/listings/schema")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, relaxed) = send(
        &app,
        Request::builder()
            .uri("/listings/schema?mode=relaxed")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(strict, relaxed);
}
