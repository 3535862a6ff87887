use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use tower::ServiceExt;

use migration::MigratorTrait;

async fn app() -> (Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, role) in [("alice", "user"), ("bob", "user"), ("root", "admin")] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, email, role, default_currency) \
             VALUES (?, ?, ?, ?, ?)",
            vec![
                username.into(),
                "password".into(),
                format!("{username}@example.com").into(),
                role.into(),
                "EUR".into(),
            ],
        ))
        .await
        .unwrap();
    }

    let engine = engine::Engine::builder().database(db.clone()).build();
    (server::app(Arc::new(engine), db.clone()), db)
}

fn basic_auth(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

fn request(method: &str, uri: &str, user: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth(user, "password"))
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_credentials_are_rejected() {
    let (app, _db) = app().await;

    let response = app
        .oneshot(Request::get("/balance").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _db) = app().await;

    let response = app
        .oneshot(
            Request::get("/balance")
                .header(header::AUTHORIZATION, basic_auth("alice", "wrong"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn income_moves_the_balance() {
    let (app, _db) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            "alice",
            Some(serde_json::json!({
                "kind": "income",
                "amount_minor": 125_00,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["status"], "completed");

    let response = app
        .oneshot(request("GET", "/balance", "alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let balance = json_body(response).await;
    assert_eq!(balance["balance_minor"], 125_00);
    assert_eq!(balance["total_income_minor"], 125_00);
}

#[tokio::test]
async fn unknown_category_is_unprocessable() {
    let (app, _db) = app().await;

    let response = app
        .oneshot(request(
            "POST",
            "/transactions",
            "alice",
            Some(serde_json::json!({
                "kind": "expense",
                "amount_minor": 10_00,
                "category": "nope",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn duplicate_category_conflicts() {
    let (app, _db) = app().await;

    let body = serde_json::json!({ "name": "Groceries" });
    let response = app
        .clone()
        .oneshot(request("POST", "/categories", "alice", Some(body.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same name, different case.
    let response = app
        .oneshot(request(
            "POST",
            "/categories",
            "alice",
            Some(serde_json::json!({ "name": "groceries" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn transactions_are_owner_scoped() {
    let (app, _db) = app().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/transactions",
            "alice",
            Some(serde_json::json!({
                "kind": "income",
                "amount_minor": 50_00,
            })),
        ))
        .await
        .unwrap();
    let created = json_body(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(request("GET", &format!("/transactions/{id}"), "bob", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_users_listing_is_admin_only() {
    let (app, _db) = app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/transactions/all", "alice", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request("GET", "/transactions/all", "root", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
