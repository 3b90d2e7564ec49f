//! "Check health, try the backend, fall back" as one reusable policy.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::fallback::FallbackDataProvider;
use crate::health::{HealthCache, HealthChecker, HealthSnapshot};
use crate::http_client::ReqwestCourseClient;
use crate::{Category, Course, CourseApi, CourseApiError, CourseQuery, Paginated, observability};

/// Why live data could not be used.
#[derive(Debug)]
pub enum Unavailable {
    /// The health gate reported the backend down; no request was made.
    Unhealthy,
    /// The backend was considered healthy but the call itself failed.
    Failed(CourseApiError),
}

impl Unavailable {
    pub fn label(&self) -> &'static str {
        match self {
            Unavailable::Unhealthy => "unhealthy",
            Unavailable::Failed(_) => "request_failed",
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Unhealthy => f.write_str("backend reported unhealthy"),
            Unavailable::Failed(e) => write!(f, "backend call failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub enum Availability<T> {
    Live(T),
    Unavailable(Unavailable),
}

/// Run `real` when the gate reports healthy, otherwise (or when `real` fails)
/// answer from `fallback`.
///
/// Errors from `real` never reach the caller; only `fallback`'s own error does.
pub async fn resilient_fetch<T, R, Fut, F>(
    health: &HealthCache,
    operation: &'static str,
    real: R,
    fallback: F,
) -> Result<T, CourseApiError>
where
    R: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, CourseApiError>>,
    F: FnOnce() -> Result<T, CourseApiError>,
{
    let availability = if health.is_healthy().await {
        match real().await {
            Ok(v) => Availability::Live(v),
            Err(e) => Availability::Unavailable(Unavailable::Failed(e)),
        }
    } else {
        Availability::Unavailable(Unavailable::Unhealthy)
    };

    match availability {
        Availability::Live(v) => {
            debug!(operation, "served live data");
            observability::record_live(operation);
            Ok(v)
        }
        Availability::Unavailable(reason) => {
            warn!(operation, reason = %reason, "serving fallback data");
            observability::record_fallback(operation, reason.label());
            fallback()
        }
    }
}

/// [`CourseApi`] that always answers, from the backend when possible and from
/// the bundled dataset otherwise.
#[derive(Clone)]
pub struct ResilientCourseClient {
    api: Arc<dyn CourseApi>,
    health: Arc<HealthCache>,
    fallback: Arc<FallbackDataProvider>,
}

impl ResilientCourseClient {
    pub fn new(
        api: Arc<dyn CourseApi>,
        health: Arc<HealthCache>,
        fallback: Arc<FallbackDataProvider>,
    ) -> Self {
        Self {
            api,
            health,
            fallback,
        }
    }

    /// Wire the reqwest client, two-tier health checker and bundled dataset from `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self, CourseApiError> {
        let api = ReqwestCourseClient::from_config(cfg)?;
        let checker = HealthChecker::from_config(cfg)?;
        let health = HealthCache::new(Arc::new(checker), cfg.health_ttl);
        Ok(Self::new(
            Arc::new(api),
            Arc::new(health),
            Arc::new(FallbackDataProvider::bundled()),
        ))
    }

    /// Current gate state, probing only when the cached value is stale.
    pub async fn health(&self) -> HealthSnapshot {
        self.health.current().await
    }
}

#[async_trait]
impl CourseApi for ResilientCourseClient {
    async fn list_courses(
        &self,
        query: &CourseQuery,
    ) -> Result<Paginated<Course>, CourseApiError> {
        resilient_fetch(
            &self.health,
            "list_courses",
            || self.api.list_courses(query),
            || Ok(self.fallback.courses(query)),
        )
        .await
    }

    async fn get_course(&self, id: &str) -> Result<Course, CourseApiError> {
        resilient_fetch(
            &self.health,
            "get_course",
            || self.api.get_course(id),
            || self.fallback.course_by_id(id),
        )
        .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CourseApiError> {
        resilient_fetch(
            &self.health,
            "list_categories",
            || self.api.list_categories(),
            || Ok(self.fallback.categories()),
        )
        .await
    }

    async fn featured_courses(&self, limit: u32) -> Result<Vec<Course>, CourseApiError> {
        let limit = CourseQuery::clamp_limit(limit);
        resilient_fetch(
            &self.health,
            "featured_courses",
            || self.api.featured_courses(limit),
            || Ok(self.fallback.featured_courses(limit)),
        )
        .await
    }
}
