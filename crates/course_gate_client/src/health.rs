//! Backend health probing and the cache in front of it.
//!
//! [`HealthChecker`] asks the backend's `/health` endpoint first and, if that
//! fails for any reason, the local proxy's `/api/health` report. It never
//! returns an error: every failure reads as "unhealthy".
//!
//! [`HealthCache`] memoises the last answer for a fixed interval. The cached
//! state sits behind an async mutex held across the probe, so concurrent
//! callers on a stale cache share one in-flight probe. The last result is also
//! published on a watch channel so readers never wait on that probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;
use crate::{CourseApiError, observability};

/// Status string the local proxy reports for a reachable backend.
pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    /// `true` when the backend is reachable and reports itself healthy.
    async fn probe(&self) -> bool;
}

/// The JSON document served at the local `/api/health` route.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub services: ServiceReports,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceReports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<ServiceReport>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl HealthReport {
    pub fn backend_healthy(&self) -> bool {
        self.services
            .backend
            .as_ref()
            .map(|b| b.status == HEALTHY)
            .unwrap_or(false)
    }
}

/// Two-tier probe: remote `{api}/health`, then local `{local}/api/health`.
#[derive(Clone, Debug)]
pub struct HealthChecker {
    remote_url: String,
    local_url: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HealthChecker {
    pub fn new(
        api_base_url: &str,
        local_base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, CourseApiError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            remote_url: format!("{}/health", api_base_url.trim_end_matches('/')),
            local_url: local_base_url.map(|b| format!("{}/api/health", b.trim_end_matches('/'))),
            timeout,
            client,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CourseApiError> {
        Self::new(
            &cfg.api_base_url,
            cfg.local_base_url.as_deref(),
            cfg.probe_timeout,
        )
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn local_url(&self) -> Option<&str> {
        self.local_url.as_deref()
    }

    async fn probe_remote(&self) -> Result<(), CourseApiError> {
        let resp = self
            .client
            .get(&self.remote_url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CourseApiError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(())
    }

    async fn probe_local(&self, url: &str) -> Result<bool, CourseApiError> {
        let resp = self.client.get(url).timeout(self.timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CourseApiError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let text = resp.text().await?;
        let report: HealthReport = serde_json::from_str(&text)
            .map_err(|e| CourseApiError::Decode(format!("health report: {e}")))?;
        Ok(report.backend_healthy())
    }
}

#[async_trait]
impl HealthProbe for HealthChecker {
    async fn probe(&self) -> bool {
        match self.probe_remote().await {
            Ok(()) => {
                debug!(url = %self.remote_url, "backend health probe succeeded");
                observability::record_probe("remote", "healthy");
                return true;
            }
            Err(e) => {
                debug!(url = %self.remote_url, error = %e, "backend health probe failed");
                observability::record_probe("remote", "failed");
            }
        }

        let Some(local) = self.local_url.as_deref() else {
            warn!(url = %self.remote_url, "backend unreachable and no local health route configured");
            return false;
        };

        match self.probe_local(local).await {
            Ok(true) => {
                debug!(url = %local, "local health route reports backend healthy");
                observability::record_probe("local", "healthy");
                true
            }
            Ok(false) => {
                warn!(url = %local, "local health route reports backend unhealthy");
                observability::record_probe("local", "unhealthy");
                false
            }
            Err(e) => {
                warn!(url = %local, error = %e, "local health probe failed");
                observability::record_probe("local", "failed");
                false
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug)]
struct CachedHealth {
    snapshot: HealthSnapshot,
    at: Instant,
}

/// Memoises [`HealthProbe::probe`] for `ttl`.
pub struct HealthCache {
    probe: Arc<dyn HealthProbe>,
    ttl: Duration,
    state: Mutex<Option<CachedHealth>>,
    last: watch::Sender<Option<HealthSnapshot>>,
}

impl HealthCache {
    pub fn new(probe: Arc<dyn HealthProbe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            state: Mutex::new(None),
            last: watch::channel(None).0,
        }
    }

    pub async fn is_healthy(&self) -> bool {
        self.current().await.healthy
    }

    /// The cached snapshot when still fresh, otherwise a new probe's result.
    pub async fn current(&self) -> HealthSnapshot {
        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if cached.at.elapsed() < self.ttl {
                observability::record_cache_hit();
                return cached.snapshot;
            }
        }

        let healthy = self.probe.probe().await;
        let snapshot = HealthSnapshot {
            healthy,
            checked_at: Utc::now(),
        };
        debug!(healthy, "health cache refreshed");
        *state = Some(CachedHealth {
            snapshot,
            at: Instant::now(),
        });
        self.last.send_replace(Some(snapshot));
        snapshot
    }

    /// Last recorded result without probing; `None` before the first probe.
    ///
    /// Returns immediately even while another caller is probing.
    pub fn snapshot(&self) -> Option<HealthSnapshot> {
        *self.last.borrow()
    }

    /// Forget the cached result so the next call probes again.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = None;
        self.last.send_replace(None);
    }
}
