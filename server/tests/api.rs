use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use products_hr::{HrModule, seed_hr_demo};
use sea_orm::Database;
use serde_json::{Value, json};
use server::{AppConfig, AppState, build_router};
use tower::ServiceExt;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    seed_hr_demo(&db).await.unwrap();
    let secret = STANDARD.encode(b"integration-test-secret-material-0123456789");
    let config = AppConfig::from_source(|key| match key {
        "JWT_SECRET_BASE64" => Some(secret.clone()),
        _ => None,
    })
    .unwrap();
    build_router(AppState::new(HrModule::new(db), config))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec(), headers)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router, username: &str, password: &str) -> Value {
    let (status, body, _) = send(
        app,
        json_request(
            "POST",
            "/api/auth/token/",
            None,
            json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn access(app: &Router, username: &str, password: &str) -> String {
    login(app, username, password).await["access"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn admin_logs_in_and_creates_department() {
    let app = app().await;
    let pair = login(&app, "admin", "admin123").await;
    assert!(pair["access"].is_string());
    assert!(pair["refresh"].is_string());
    let token = pair["access"].as_str().unwrap();

    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/departments/",
            Some(token),
            json!({ "name": "Eng", "budget": "1000000.00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["name"], "Eng");
    assert_eq!(created["budget"], "1000000.00");
    assert!(created["id"].is_string());
    assert!(created["created_at"].is_string());
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = app().await;
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/token/",
            None,
            json!({ "username": "admin", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["detail"],
        "No active account found with the given credentials"
    );
    assert_eq!(error["code"], "UNAUTHENTICATED");

    let (status, _, _) = send(
        &app,
        Request::builder()
            .uri("/api/employees/")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_issues_a_new_access_token() {
    let app = app().await;
    let pair = login(&app, "manager", "manager123").await;
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/token/refresh/",
            None,
            json!({ "refresh": pair["refresh"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refreshed: Value = serde_json::from_slice(&body).unwrap();
    let token = refreshed["access"].as_str().unwrap();
    let (status, _, _) = send(&app, get("/api/projects/", token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/token/refresh/",
            None,
            json!({ "refresh": pair["access"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_report_type_is_a_bad_request() {
    let app = app().await;
    let token = access(&app, "admin", "admin123").await;
    for uri in ["/api/reports/?type=bogus", "/api/reports/"] {
        let (status, body, _) = send(&app, get(uri, &token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["detail"], "Unknown or missing report 'type'.");
    }

    let (status, body, _) = send(
        &app,
        get("/api/reports/?type=salary_cost_per_department", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows[0]["name"], "Engineering");
    assert_eq!(rows[0]["total_salary"], "2300000.00");
    assert!(rows[2]["total_salary"].is_null());
}

#[tokio::test]
async fn export_returns_csv_attachment() {
    let app = app().await;
    let token = access(&app, "manager", "manager123").await;
    let (status, body, headers) = send(&app, get("/api/export/?type=employees_csv", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"employees.csv\""
    );
    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("id,username,email,role,department,salary,title,is_active")
    );
    assert_eq!(lines.count(), 2);

    let (status, body, _) = send(&app, get("/api/export/?type=pdf", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["detail"], "Unknown export type.");
}

#[tokio::test]
async fn role_rules_surface_as_status_codes() {
    let app = app().await;
    let manager = access(&app, "manager", "manager123").await;
    let staff = access(&app, "employee", "employee123").await;

    let (status, body, _) = send(&app, get("/api/employees/", &staff)).await;
    assert_eq!(status, StatusCode::OK);
    let rows: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["username"], "employee");
    assert_eq!(rows[0]["department"]["name"], "Engineering");
    assert!(rows[0].get("password").is_none());
    assert!(rows[0].get("password_hash").is_none());
    let my_id = rows[0]["id"].as_str().unwrap().to_string();

    let (status, body, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/employees/{my_id}/"),
            Some(&manager),
            json!({ "role": "ADMIN" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "FORBIDDEN");

    let (status, body, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/employees/{my_id}/"),
            Some(&staff),
            json!({ "first_name": "Emily" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let echoed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed["first_name"], "Emily");
    assert_eq!(echoed["salary"], "800000.00");
    assert!(echoed["department"].is_string());

    let (status, _, _) = send(
        &app,
        json_request(
            "POST",
            "/api/departments/",
            Some(&manager),
            json!({ "name": "Shadow IT" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, get("/api/projects/not-a-uuid/", &manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_are_invalid_input() {
    let app = app().await;
    let token = access(&app, "admin", "admin123").await;
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/employees/",
            Some(&token),
            json!({ "username": "x", "role": "SUPERUSER" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], "INVALID_INPUT");

    let (status, _, _) = send(&app, get("/api/employees/?ordering=password_hash", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_lifecycle_over_http() {
    let app = app().await;
    let admin = access(&app, "admin", "admin123").await;
    let (status, body, _) = send(
        &app,
        json_request(
            "POST",
            "/api/projects/",
            Some(&admin),
            json!({
                "name": "Data Lake",
                "description": "Warehouse",
                "start_date": "2024-02-01",
                "employees": []
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(created["start_date"], "2024-02-01");
    assert!(created["end_date"].is_null());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/projects/{id}/"))
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body, _) = send(&app, get(&format!("/api/projects/{id}/"), &admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["detail"], "Not found.");
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = app().await;
    let (status, body, _) = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["db_ok"], true);
}
