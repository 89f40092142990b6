//! Integration tests for gearpoll-srv API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Session creation with identity validation (localized messages)
//! - Pair presentation and the full answer flow to completion
//! - Resume filtering for a returning respondent (matched by email)
//! - Answer rejection after completion
//! - Catalog image serving and traversal rejection

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use gearpoll_common::catalog::load_catalog;
use gearpoll_common::config::ServiceConfig;
use gearpoll_common::db::init_database;
use gearpoll_common::Language;
use gearpoll_srv::{build_router, AppState};

const GEARS: [(&str, &str, &str); 4] = [
    ("Trawl: drags the seabed", "Chalut: racle le fond", "trawl.png"),
    ("Longline: baited hooks", "Palangre: lignes d'hameçons", "longline.png"),
    ("Gillnet: wall of mesh", "Filet maillant: mur de mailles", "gillnet.png"),
    ("Dredge: scrapes shellfish", "Drague: racle les coquillages", "dredge.png"),
];

/// Test helper: write a four-item catalog and matching images into `dir`
fn write_fixtures(dir: &Path) {
    let assets = dir.join("assets");
    let images = assets.join("images");
    std::fs::create_dir_all(&images).unwrap();

    let mut file = std::fs::File::create(assets.join("descriptions.csv")).unwrap();
    writeln!(file, "EN,FR,path_image").unwrap();
    for (en, fr, image) in GEARS {
        writeln!(file, "{},{},{}", en, fr, image).unwrap();
    }

    for (_, _, name) in GEARS {
        image::RgbImage::from_pixel(10, 10, image::Rgb([30, 90, 160]))
            .save(images.join(name))
            .unwrap();
    }
}

/// Test helper: build app state over a temp root folder
async fn setup_app(dir: &TempDir) -> axum::Router {
    write_fixtures(dir.path());

    let config = ServiceConfig::resolve(Some(dir.path()), None, None).unwrap();
    let pool = init_database(&config.database_path()).await.unwrap();

    let mut catalogs = std::collections::HashMap::new();
    for language in Language::ALL {
        let catalog =
            load_catalog(&config.catalog_path, language, config.max_catalog_items).unwrap();
        catalogs.insert(language, std::sync::Arc::new(catalog));
    }

    build_router(AppState::new(pool, catalogs, config))
}

/// Test helper: JSON request
fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: bodyless request
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn identity_body(email: &str, language: &str) -> Value {
    json!({
        "language": language,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "source": "newsletter",
    })
}

async fn create_session(app: &axum::Router, email: &str, language: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/session", identity_body(email, language)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gearpoll-srv");
    assert!(body["version"].is_string());
}

// =============================================================================
// Identity validation
// =============================================================================

#[tokio::test]
async fn test_session_creation_rejects_empty_fields_english() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let body = json!({
        "language": "en",
        "first_name": "",
        "last_name": "Lovelace",
        "email": "ada@example.org",
    });
    let response = app
        .oneshot(json_request("POST", "/api/session", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("first name"));
}

#[tokio::test]
async fn test_session_creation_rejects_empty_fields_french() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let body = json!({
        "language": "fr",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "   ",
    });
    let response = app
        .oneshot(json_request("POST", "/api/session", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Veuillez"));
    assert!(message.contains("e-mail"));
}

// =============================================================================
// Session creation and pair presentation
// =============================================================================

#[tokio::test]
async fn test_session_creation_generates_all_pairs() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    assert!(session["session_id"].is_string());
    // 4 catalog items -> C(4,2) = 6 pairs
    assert_eq!(session["progress"]["total"], 6);
    assert_eq!(session["progress"]["index"], 0);
    assert_eq!(session["completed"], false);
}

#[tokio::test]
async fn test_current_pair_has_display_fields() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "fr").await;
    let id = session["session_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/current", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["completed"], false);
    for side in ["left", "right"] {
        assert!(body[side]["title"].is_string());
        assert!(body[side]["description"].is_string());
        let url = body[side]["image_url"].as_str().unwrap();
        assert!(url.starts_with("/api/images/"));
    }
    assert_ne!(body["left"]["key"], body["right"]["key"]);

    // The FR catalog backs a French session
    let title = body["left"]["title"].as_str().unwrap();
    assert!(GEARS.iter().any(|(_, fr, _)| fr.starts_with(title)));

    // Re-fetching the current pair is stable within a trial
    let again = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/current", id)))
        .await
        .unwrap();
    let again = extract_json(again.into_body()).await;
    assert_eq!(again["left"]["key"], body["left"]["key"]);
    assert_eq!(again["right"]["key"], body["right"]["key"]);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let uri = format!("/api/session/{}/current", uuid::Uuid::new_v4());
    let response = app.oneshot(get_request(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Answer flow, completion, and resume
// =============================================================================

/// Answer the current pair; returns the answer response body
async fn answer_once(app: &axum::Router, id: &str, result: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{}/answer", id),
            json!({ "result": result }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

#[tokio::test]
async fn test_full_answer_flow_to_completion() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    for trial in 0..6 {
        let result = ["left", "right", "same"][trial % 3];
        let body = answer_once(&app, &id, result).await;
        assert_eq!(body["progress"]["index"], trial as i64 + 1);
        assert_eq!(body["completed"], trial == 5);
    }

    // Progress reports completion; current pair is gone
    let progress = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/progress", id)))
        .await
        .unwrap();
    let progress = extract_json(progress.into_body()).await;
    assert_eq!(progress["completed"], true);
    assert_eq!(progress["progress"]["index"], 6);

    let current = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/current", id)))
        .await
        .unwrap();
    let current = extract_json(current.into_body()).await;
    assert_eq!(current["completed"], true);
    assert!(current["left"].is_null());

    // Further submissions are rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{}/answer", id),
            json!({ "result": "left" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_resume_excludes_answered_pairs() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    // First visit: answer two of the six pairs, then abandon the session
    let first = create_session(&app, "ada@example.org", "en").await;
    let first_id = first["session_id"].as_str().unwrap().to_string();
    answer_once(&app, &first_id, "left").await;
    answer_once(&app, &first_id, "same").await;

    // Fresh session for the same email resumes with the remaining four
    let resumed = create_session(&app, "ada@example.org", "en").await;
    assert_eq!(resumed["progress"]["total"], 4);
    assert_eq!(resumed["progress"]["index"], 0);
    assert_eq!(resumed["completed"], false);

    // A different respondent still gets all six
    let other = create_session(&app, "grace@example.org", "en").await;
    assert_eq!(other["progress"]["total"], 6);
}

#[tokio::test]
async fn test_completed_survey_covers_each_pair_once() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    // Two answers in a first session, the remaining four in a resumed one
    let first = create_session(&app, "ada@example.org", "en").await;
    let first_id = first["session_id"].as_str().unwrap().to_string();
    answer_once(&app, &first_id, "right").await;
    answer_once(&app, &first_id, "right").await;

    let resumed = create_session(&app, "ada@example.org", "en").await;
    let resumed_id = resumed["session_id"].as_str().unwrap().to_string();
    for _ in 0..4 {
        answer_once(&app, &resumed_id, "same").await;
    }

    // Respondent finished: the next fresh session has nothing to do
    let done = create_session(&app, "ada@example.org", "en").await;
    assert_eq!(done["progress"]["total"], 0);
    assert_eq!(done["completed"], true);

    // Six records, each unordered pair exactly once
    let config = ServiceConfig::resolve(Some(dir.path()), None, None).unwrap();
    let pool = init_database(&config.database_path()).await.unwrap();
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT option_left, option_right FROM records WHERE email = ?")
            .bind("ada@example.org")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(rows.len(), 6);
    let unordered: HashSet<(String, String)> = rows
        .iter()
        .map(|(l, r)| gearpoll_common::pairing::canonical_pair(l, r))
        .collect();
    assert_eq!(unordered.len(), 6);
}

#[tokio::test]
async fn test_answer_records_carry_identity_and_source() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    let id = session["session_id"].as_str().unwrap().to_string();
    answer_once(&app, &id, "same").await;

    let config = ServiceConfig::resolve(Some(dir.path()), None, None).unwrap();
    let pool = init_database(&config.database_path()).await.unwrap();
    let row: (String, String, String, i64, String, String) = sqlx::query_as(
        "SELECT language, first_name, email, n_trials, result, source FROM records LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(row.0, "en");
    assert_eq!(row.1, "Ada");
    assert_eq!(row.2, "ada@example.org");
    assert_eq!(row.3, 0); // trial index captured before the advance
    assert_eq!(row.4, "same");
    assert_eq!(row.5, "newsletter");
}

#[tokio::test]
async fn test_failed_answer_write_leaves_session_unchanged() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let before = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/current", id)))
        .await
        .unwrap();
    let before = extract_json(before.into_body()).await;

    // Pull the answer log out from under the service
    let config = ServiceConfig::resolve(Some(dir.path()), None, None).unwrap();
    let pool = init_database(&config.database_path()).await.unwrap();
    sqlx::query("DROP TABLE records")
        .execute(&pool)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{}/answer", id),
            json!({ "result": "left" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "STORAGE_WRITE");

    // The index did not advance
    let progress = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/progress", id)))
        .await
        .unwrap();
    let progress = extract_json(progress.into_body()).await;
    assert_eq!(progress["progress"]["index"], 0);
    assert_eq!(progress["completed"], false);

    // The same pair is still current, so the client can simply retry
    let after = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/current", id)))
        .await
        .unwrap();
    let after = extract_json(after.into_body()).await;
    assert_eq!(after["left"]["key"], before["left"]["key"]);
    assert_eq!(after["right"]["key"], before["right"]["key"]);
}

#[tokio::test]
async fn test_completed_sessions_are_evicted_on_later_creation() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    let id = session["session_id"].as_str().unwrap().to_string();
    for _ in 0..6 {
        answer_once(&app, &id, "left").await;
    }

    // Final state remains readable until another survey starts
    let progress = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/progress", id)))
        .await
        .unwrap();
    assert_eq!(progress.status(), StatusCode::OK);

    // A new respondent's session sweeps the finished one out of the store
    create_session(&app, "grace@example.org", "en").await;
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/session/{}/progress", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_answer_result_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let session = create_session(&app, "ada@example.org", "en").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/api/session/{}/answer", id),
            json!({ "result": "winner" }),
        ))
        .await
        .unwrap();
    // serde rejects values outside the three-way schema
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Images and UI
// =============================================================================

#[tokio::test]
async fn test_image_endpoint_serves_downscaled_png() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/images/trawl.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    // 10x10 fixture at 0.3 linear scale
    assert_eq!(decoded.width(), 3);
    assert_eq!(decoded.height(), 3);
}

#[tokio::test]
async fn test_image_endpoint_rejects_traversal() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/images/..%2Fgearpoll.db"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get_request("/api/images/missing.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ui_routes_serve_embedded_assets() {
    let dir = TempDir::new().unwrap();
    let app = setup_app(&dir).await;

    let response = app.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("survey"));

    let response = app.oneshot(get_request("/static/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/javascript"
    );
}
