use crate::CourseApiError;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_HEALTH_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    /// Base of the local proxy serving `/api/health`, probed when the backend is unreachable.
    pub local_base_url: Option<String>,
    pub api_token: Option<SecretString>,
    pub probe_timeout: Duration,
    pub health_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            local_base_url: None,
            api_token: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            health_ttl: DEFAULT_HEALTH_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, CourseApiError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, CourseApiError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api_base_url = non_empty(get("COURSE_API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let local_base_url = non_empty(get("COURSE_GATE_LOCAL_URL"));
        let api_token = non_empty(get("COURSE_API_TOKEN")).map(|t| SecretString::new(t.into()));

        let probe_timeout = millis(
            &mut get,
            "COURSE_GATE_PROBE_TIMEOUT_MS",
            DEFAULT_PROBE_TIMEOUT,
        )?;
        let request_timeout = millis(
            &mut get,
            "COURSE_GATE_REQUEST_TIMEOUT_MS",
            DEFAULT_REQUEST_TIMEOUT,
        )?;
        let health_ttl = match non_empty(get("COURSE_GATE_HEALTH_TTL_SECS")) {
            Some(raw) => Duration::from_secs(parse_u64("COURSE_GATE_HEALTH_TTL_SECS", &raw)?),
            None => DEFAULT_HEALTH_TTL,
        };

        Ok(Self {
            api_base_url,
            local_base_url,
            api_token,
            probe_timeout,
            health_ttl,
            request_timeout,
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn millis<F>(get: &mut F, key: &str, default: Duration) -> Result<Duration, CourseApiError>
where
    F: FnMut(&str) -> Option<String>,
{
    match non_empty(get(key)) {
        Some(raw) => Ok(Duration::from_millis(parse_u64(key, &raw)?)),
        None => Ok(default),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, CourseApiError> {
    raw.parse::<u64>().map_err(|_| {
        CourseApiError::Config(format!(
            "{key} must be a non-negative integer, got {raw:?}"
        ))
    })
}
