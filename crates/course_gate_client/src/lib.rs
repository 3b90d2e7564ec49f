//! Course catalogue client with an availability gate.
//!
//! [`http_client::ReqwestCourseClient`] talks to the backend directly and
//! propagates every failure. [`resilient::ResilientCourseClient`] wraps it with a
//! cached two-tier health probe and the bundled [`fallback::FallbackDataProvider`],
//! so callers always receive a usable response of the same shape.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod config;
pub mod fallback;
pub mod health;
pub mod http_client;
pub mod observability;
pub mod pagination;
pub mod resilient;

pub use pagination::{Paginated, Pagination};

#[derive(Debug, Error)]
pub enum CourseApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    NotFound(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl CourseApiError {
    pub fn course_not_found(id: &str) -> Self {
        CourseApiError::NotFound(format!("Course with id {id} not found"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CourseApiError::NotFound(_))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
    AllLevels,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub instructor: Instructor,
    /// Category slug.
    pub category: String,
    pub level: CourseLevel,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub reviews_count: u32,
    #[serde(default)]
    pub students_count: u32,
    #[serde(default)]
    pub duration_hours: f32,
    #[serde(default)]
    pub lessons_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub courses_count: u32,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Backends disagree on whether ids are strings or integers; accept both.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing parameters shared by the live endpoint and the fallback dataset.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CourseQuery {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

impl Default for CourseQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            category: None,
            level: None,
            search: None,
            featured: None,
        }
    }
}

impl CourseQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    /// A page size within `1..=MAX_PAGE_SIZE`.
    pub fn clamp_limit(limit: u32) -> u32 {
        limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// Clamp `page` to at least 1 and `limit` into `1..=MAX_PAGE_SIZE`.
    pub fn normalized(&self) -> Self {
        let mut q = self.clone();
        q.page = q.page.max(1);
        q.limit = Self::clamp_limit(q.limit);
        q.search = q
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        q
    }

    /// Query-string pairs for the live `/courses` endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let q = self.normalized();
        let mut pairs: Vec<(&'static str, String)> = vec![
            ("page", q.page.to_string()),
            ("limit", q.limit.to_string()),
        ];
        if let Some(c) = q.category {
            pairs.push(("category", c));
        }
        if let Some(level) = q.level {
            if let Ok(serde_json::Value::String(s)) = serde_json::to_value(level) {
                pairs.push(("level", s));
            }
        }
        if let Some(s) = q.search {
            pairs.push(("search", s));
        }
        if let Some(f) = q.featured {
            pairs.push(("featured", f.to_string()));
        }
        pairs
    }
}

/// The raw domain operations of the course backend.
#[async_trait]
pub trait CourseApi: Send + Sync + 'static {
    async fn list_courses(
        &self,
        query: &CourseQuery,
    ) -> Result<Paginated<Course>, CourseApiError>;

    async fn get_course(&self, id: &str) -> Result<Course, CourseApiError>;

    async fn list_categories(&self) -> Result<Vec<Category>, CourseApiError>;

    /// Featured courses, at most `limit` of them.
    async fn featured_courses(&self, limit: u32) -> Result<Vec<Course>, CourseApiError>;
}
