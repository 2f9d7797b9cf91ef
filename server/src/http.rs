use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, Method, header},
    response::IntoResponse,
    routing::{get, post},
};
use products_hr::HrModule;
use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{config::AppConfig, handlers};

#[derive(Clone)]
pub struct AppState {
    pub hr: HrModule,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(hr: HrModule, config: AppConfig) -> Self {
        Self {
            hr,
            config: Arc::new(config),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "hr server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_origin(AllowOrigin::list(allowed))
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/token/", post(handlers::obtain_token))
        .route("/api/auth/token/refresh/", post(handlers::refresh_token))
        .route(
            "/api/departments/",
            get(handlers::list_departments).post(handlers::create_department),
        )
        .route(
            "/api/departments/{id}/",
            get(handlers::get_department)
                .put(handlers::update_department)
                .patch(handlers::update_department)
                .delete(handlers::delete_department),
        )
        .route(
            "/api/employees/",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/api/employees/{id}/",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .patch(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route(
            "/api/projects/",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/{id}/",
            get(handlers::get_project)
                .put(handlers::update_project)
                .patch(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/api/reports/", get(handlers::reports))
        .route("/api/export/", get(handlers::export))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db = state.hr.db();
    let db_ok = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "SELECT 1".to_string(),
        ))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
