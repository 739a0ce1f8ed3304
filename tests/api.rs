// =============================================================================
// Farmstead Backend - API Integration Tests
// =============================================================================
// Drives the real router in-process against a throwaway SQLite database.
// =============================================================================

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use farmstead_backend::config::Config;
use farmstead_backend::db::Database;
use farmstead_backend::{create_router, AppState};

struct TestApp {
    router: Router,
    db: Database,
    // Holds the SQLite file for the lifetime of the test.
    _db_dir: TempDir,
}

async fn test_app() -> TestApp {
    let db_dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}", db_dir.path().join("test.db").display());

    let db = Database::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();

    let config = Config {
        bind_address: "127.0.0.1:0".into(),
        database_url: db_url,
        jwt_secret: "test-secret".into(),
        jwt_expiry_hours: 1,
    };

    let state = AppState {
        config: Arc::new(config),
        db: db.clone(),
    };

    TestApp {
        router: create_router(state),
        db,
        _db_dir: db_dir,
    }
}

async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(router: &Router, username: &str) -> String {
    let (status, body) = request(
        router,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": username, "password": "quackquack"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_location(router: &Router, token: &str, name: &str) {
    let (status, _) = request(
        router,
        "POST",
        "/locations",
        Some(token),
        Some(json!({"type": "farm", "name": name, "address": "1 Pond Lane"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_livestock(router: &Router, token: &str, location_id: i64, birthdate: &str) {
    let (status, _) = request(
        router,
        "POST",
        "/livestocks",
        Some(token),
        Some(json!({
            "name": "Daisy",
            "breed": "Mallard",
            "species": "duck",
            "birthplace_id": location_id,
            "birthdate": birthdate,
            "gender": "female",
            "location_id": location_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_register_login_and_me() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;

    // Duplicate registration is rejected.
    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "farmer", "password": "other"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    // Wrong password is rejected.
    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/token",
        None,
        Some(json!({"username": "farmer", "password": "honk"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect username or password");

    // Correct credentials issue a fresh token.
    let (status, body) = request(
        &app.router,
        "POST",
        "/auth/token",
        None,
        Some(json!({"username": "farmer", "password": "quackquack"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["username"], "farmer");
    assert!(body["user"].get("password_hash").is_none());

    // The token identifies the user.
    let (status, body) = request(&app.router, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "farmer");

    let (status, _) = request(&app.router, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app().await;
    for uri in ["/locations", "/livestocks", "/predicts"] {
        let (status, _) = request(&app.router, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "route {uri}");
    }
}

// =============================================================================
// Locations
// =============================================================================

#[tokio::test]
async fn test_location_crud() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/locations",
        Some(&token),
        Some(json!({"type": "farm", "name": "Sunny Acres", "address": "1 Pond Lane"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Location created successfully with ID 1");

    let (status, body) = request(&app.router, "GET", "/locations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["type"], "farm");
    assert_eq!(body[0]["name"], "Sunny Acres");

    // Partial update touches only the supplied fields.
    let (status, _) = request(
        &app.router,
        "PATCH",
        "/locations/1",
        Some(&token),
        Some(json!({"name": "Rainy Acres"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app.router, "GET", "/locations/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Rainy Acres");
    assert_eq!(body["address"], "1 Pond Lane");

    let (status, _) = request(&app.router, "DELETE", "/locations/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(&app.router, "GET", "/locations/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Location with supplied ID does not exist");
}

// =============================================================================
// Livestock
// =============================================================================

#[tokio::test]
async fn test_livestock_requires_existing_location() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/livestocks",
        Some(&token),
        Some(json!({
            "name": "Daisy",
            "breed": "Mallard",
            "species": "duck",
            "birthplace_id": 99,
            "birthdate": "2020-01-01",
            "gender": "female",
            "location_id": 99,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Location with supplied ID does not exist");
}

#[tokio::test]
async fn test_livestock_crud() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;
    create_location(&app.router, &token, "Sunny Acres").await;

    let (status, body) = request(
        &app.router,
        "POST",
        "/livestocks",
        Some(&token),
        Some(json!({
            "name": "Daisy",
            "breed": "Mallard",
            "species": "duck",
            "birthplace_id": 1,
            "birthdate": "2020-01-01",
            "gender": "female",
            "location_id": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["message"]
        .as_str()
        .unwrap()
        .strip_prefix("Livestock created successfully with ID ")
        .unwrap()
        .to_string();

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/livestocks/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Daisy");
    assert_eq!(body["birthdate"], "2020-01-01");
    assert_eq!(body["gender"], "female");

    // Re-homing to a missing location is rejected before writing.
    let (status, _) = request(
        &app.router,
        "PATCH",
        &format!("/livestocks/{id}"),
        Some(&token),
        Some(json!({"location_id": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
        &app.router,
        "PATCH",
        &format!("/livestocks/{id}"),
        Some(&token),
        Some(json!({"name": "Donald", "gender": "male"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/livestocks/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Donald");
    assert_eq!(body["gender"], "male");
    assert_eq!(body["breed"], "Mallard");

    let (status, _) = request(
        &app.router,
        "DELETE",
        &format!("/livestocks/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/livestocks/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Livestock with supplied ID does not exist");
}

// =============================================================================
// Predictions
// =============================================================================

#[tokio::test]
async fn test_predict_with_insufficient_data() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;
    create_location(&app.router, &token, "Sunny Acres").await;

    // One year of history is not enough to fit a line.
    create_livestock(&app.router, &token, 1, "2020-01-01").await;
    create_livestock(&app.router, &token, 1, "2020-06-01").await;

    let (status, body) = request(&app.router, "GET", "/predicts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Not enough data to predict");
    assert!(body.get("current_data").is_none());
    assert!(body.get("predicted_data").is_none());
}

#[tokio::test]
async fn test_predict_three_years_ahead() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;
    create_location(&app.router, &token, "Sunny Acres").await;
    create_location(&app.router, &token, "Muddy Hollow").await;

    // Location 1 grows by two animals a year: 2 / 4 / 6.
    for birthdate in ["2020-01-01", "2020-06-01"] {
        create_livestock(&app.router, &token, 1, birthdate).await;
    }
    for birthdate in ["2021-01-01", "2021-03-01", "2021-06-01", "2021-09-01"] {
        create_livestock(&app.router, &token, 1, birthdate).await;
    }
    for birthdate in [
        "2022-01-01",
        "2022-02-01",
        "2022-03-01",
        "2022-04-01",
        "2022-05-01",
        "2022-06-01",
    ] {
        create_livestock(&app.router, &token, 1, birthdate).await;
    }
    // Location 2 only has a single animal.
    create_livestock(&app.router, &token, 2, "2021-05-01").await;

    // Scoped forecast sees only location 1: a perfect slope-2 line.
    let (status, body) = request(&app.router, "GET", "/predicts/1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Predicted data for 3 years ahead");
    assert_eq!(
        body["current_data"],
        json!({"2020": 2, "2021": 4, "2022": 6})
    );
    assert_eq!(
        body["predicted_data"],
        json!({"2023": 8, "2024": 10, "2025": 12})
    );

    // The unscoped forecast aggregates every location.
    let (status, body) = request(&app.router, "GET", "/predicts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["current_data"],
        json!({"2020": 2, "2021": 5, "2022": 6})
    );
    assert_eq!(
        body["predicted_data"],
        json!({"2023": 8, "2024": 10, "2025": 12})
    );

    // A single year of history at location 2 short-circuits, as does a
    // location with no animals at all.
    let (status, body) = request(&app.router, "GET", "/predicts/2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Not enough data to predict");

    let (status, body) = request(&app.router, "GET", "/predicts/99", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Not enough data to predict");
}

#[tokio::test]
async fn test_predict_fails_loudly_on_corrupt_birthdate() {
    let app = test_app().await;
    let token = register(&app.router, "farmer").await;

    // A row written behind the API's back with a non-ISO date.
    sqlx::query(
        r#"
        INSERT INTO livestock (id, name, breed, species, birthplace_id, birthdate, gender, location_id)
        VALUES ('rogue', 'Daisy', 'Mallard', 'duck', 1, '01/02/2020', 'female', 1)
        "#,
    )
    .execute(app.db.pool())
    .await
    .unwrap();

    let (status, body) = request(&app.router, "GET", "/predicts", Some(&token), None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}
