//! HTTP client for the course backend.
//!
//! This module provides a reqwest-based implementation of the [`CourseApi`](crate::CourseApi)
//! trait. Every failure is returned to the caller; see [`crate::resilient`] for
//! the variant that falls back to bundled data.

use crate::config::Config;
use crate::{Category, Course, CourseApi, CourseApiError, CourseQuery, Paginated};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Some deployments wrap payloads as `{ "data": ... }`, others return them bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(v) => v,
        }
    }
}

/// Client for the course backend using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestCourseClient {
    base_url: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl ReqwestCourseClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. "http://localhost:8000/api/v1"
    /// * `token` - optional bearer token sent with every request
    /// * `timeout` - per-request timeout
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, CourseApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CourseApiError> {
        Self::new(&cfg.api_base_url, cfg.api_token.clone(), cfg.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/courses/{id}` with `id` as a single escaped path segment.
    fn course_url(&self, id: &str) -> Result<reqwest::Url, CourseApiError> {
        let invalid = |why: String| CourseApiError::Config(format!("base url {}: {why}", self.base_url));
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot take a path".into()))?
            .pop_if_empty()
            .push("courses")
            .push(id);
        Ok(url)
    }

    /// Build a GET request, authenticated when a token is configured.
    fn get_request(&self, url: impl reqwest::IntoUrl) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match &self.token {
            Some(t) => req.bearer_auth(t.expose_secret()),
            None => req,
        }
    }

    /// Execute a request and decode the JSON body, unwrapping a `data` envelope if present.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CourseApiError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        // Read body as text first so decode failures can quote it.
        let text = resp.text().await?;
        serde_json::from_str::<Envelope<T>>(&text)
            .map(Envelope::into_inner)
            .map_err(|e| {
                let body_snippet: String = text.chars().take(512).collect();
                CourseApiError::Decode(format!("{e} - body: {body_snippet}"))
            })
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> CourseApiError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();

        match status {
            404 => CourseApiError::NotFound(body_snippet),
            _ => CourseApiError::Status {
                status,
                body: body_snippet,
            },
        }
    }
}

#[async_trait]
impl CourseApi for ReqwestCourseClient {
    async fn list_courses(
        &self,
        query: &CourseQuery,
    ) -> Result<Paginated<Course>, CourseApiError> {
        let url = format!("{}/courses", self.base_url);
        let pairs = query.query_pairs();
        self.execute_json(self.get_request(&url).query(&pairs))
            .await
    }

    async fn get_course(&self, id: &str) -> Result<Course, CourseApiError> {
        // Dot segments would be dropped from the path and address another resource.
        if id.is_empty() || id == "." || id == ".." {
            return Err(CourseApiError::course_not_found(id));
        }
        let url = self.course_url(id)?;
        self.execute_json(self.get_request(url)).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CourseApiError> {
        let url = format!("{}/courses/categories", self.base_url);
        self.execute_json(self.get_request(&url)).await
    }

    async fn featured_courses(&self, limit: u32) -> Result<Vec<Course>, CourseApiError> {
        let query = CourseQuery {
            featured: Some(true),
            ..CourseQuery::page(1, limit)
        };
        let page = self.list_courses(&query).await?;
        let mut items = page.items;
        items.truncate(CourseQuery::clamp_limit(limit) as usize);
        Ok(items)
    }
}
