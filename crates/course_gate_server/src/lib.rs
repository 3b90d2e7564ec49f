//! HTTP front for the course availability gate.
//!
//! Serves the local `/api/health` report that the client's secondary probe
//! reads, plus course routes that always answer with live or bundled data.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, debug_handler};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tower_http::timeout::TimeoutLayer;

use course_gate_client::config::Config;
use course_gate_client::health::{
    HEALTHY, HealthCache, HealthChecker, HealthReport, ServiceReport, ServiceReports, UNHEALTHY,
};
use course_gate_client::resilient::ResilientCourseClient;
use course_gate_client::{
    Category, Course, CourseApi, CourseApiError, CourseQuery, DEFAULT_PAGE_SIZE, Paginated,
};

pub mod error;

use error::{ServerError, ServerResult};

pub const DEFAULT_ADDRESS: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Slack on top of the worst-case upstream time before the router gives up.
pub const REQUEST_BUDGET_MARGIN: Duration = Duration::from_secs(1);

/// Longest a course request may take: both probe tiers, one live call, plus margin.
///
/// A request cut short here would lose the bundled answer, so the budget must
/// cover every upstream wait the gate can make.
pub fn request_budget(cfg: &Config) -> Duration {
    cfg.probe_timeout * 2 + cfg.request_timeout + REQUEST_BUDGET_MARGIN
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub client: Config,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, CourseApiError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Result<Self, CourseApiError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let address = match get("ADDRESS") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|_| {
                CourseApiError::Config(format!("ADDRESS is not a socket address: {raw:?}"))
            })?,
            None => SocketAddr::from(DEFAULT_ADDRESS),
        };
        let client = Config::from_env_with(get)?;
        Ok(Self { address, client })
    }
}

pub struct AppState {
    pub courses: ResilientCourseClient,
    /// Remote-only gate behind `/api/health`; never probes this service's own route.
    pub backend_health: HealthCache,
    pub backend_url: String,
    pub request_budget: Duration,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn from_config(cfg: &Config, metrics: PrometheusHandle) -> Result<Self, CourseApiError> {
        let courses = ResilientCourseClient::from_config(cfg)?;
        let remote = HealthChecker::new(&cfg.api_base_url, None, cfg.probe_timeout)?;
        let backend_url = remote.remote_url().to_string();
        Ok(Self {
            courses,
            backend_health: HealthCache::new(Arc::new(remote), cfg.health_ttl),
            backend_url,
            request_budget: request_budget(cfg),
            metrics,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let timeout = state.request_budget;
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/health", get(api_health))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/featured", get(featured_courses))
        .route("/api/courses/categories", get(list_categories))
        .route("/api/courses/{id}", get(get_course))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .with_state(state)
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn api_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let snapshot = state.backend_health.current().await;
    let (status, backend) = if snapshot.healthy {
        ("ok", HEALTHY)
    } else {
        ("degraded", UNHEALTHY)
    };
    Json(HealthReport {
        status: status.to_string(),
        timestamp: Some(Utc::now()),
        services: ServiceReports {
            backend: Some(ServiceReport {
                status: backend.to_string(),
                checked_at: Some(snapshot.checked_at),
                url: Some(state.backend_url.clone()),
            }),
        },
    })
}

#[debug_handler]
async fn list_courses(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CourseQuery>, QueryRejection>,
) -> ServerResult<Json<Paginated<Course>>> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let page = state.courses.list_courses(&query).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct FeaturedParams {
    limit: Option<u32>,
}

#[debug_handler]
async fn featured_courses(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FeaturedParams>, QueryRejection>,
) -> ServerResult<Json<Vec<Course>>> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    Ok(Json(state.courses.featured_courses(limit).await?))
}

#[debug_handler]
async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<Vec<Category>>> {
    Ok(Json(state.courses.list_categories().await?))
}

#[debug_handler]
async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Course>> {
    Ok(Json(state.courses.get_course(&id).await?))
}
