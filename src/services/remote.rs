//! 托管数据服务客户端
//! 通过 REST 接口（PostgREST 风格）读取课程、写入进度，并从鉴权服务获取当前用户

use crate::config::RemoteConfig;
use crate::error::StoreError;
use crate::models::{Course, CourseProgress, CourseSummary};
use crate::services::store::{CourseStore, IdentityProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const COURSE_TABLE: &str = "course_id";
const PROGRESS_TABLE: &str = "user_course_progress";

/// 课程表行
#[derive(Debug, Deserialize)]
struct CourseRow {
    id: String,
    course_name: Option<String>,
    course_description: Option<String>,
    #[serde(default)]
    course_content: Option<String>,
    #[serde(default)]
    course_status: Option<String>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id,
            name: row.course_name.unwrap_or_default(),
            description: row.course_description,
            content: row.course_content.unwrap_or_default(),
            status: row.course_status.unwrap_or_else(|| "open".to_string()),
        }
    }
}

/// 进度表行
#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    user_id: String,
    course_id: String,
    current_page: u32,
    total_pages: u32,
    percentage: u32,
    completed: bool,
    #[serde(default)]
    highest_quiz_score: Option<u32>,
    updated_at: DateTime<Utc>,
}

impl From<ProgressRow> for CourseProgress {
    fn from(row: ProgressRow) -> Self {
        Self {
            user_id: row.user_id,
            course_id: row.course_id,
            current_page: row.current_page,
            total_pages: row.total_pages,
            percentage: row.percentage,
            completed: row.completed,
            highest_quiz_score: row.highest_quiz_score.unwrap_or(0),
            updated_at: row.updated_at,
        }
    }
}

impl From<&CourseProgress> for ProgressRow {
    fn from(p: &CourseProgress) -> Self {
        Self {
            user_id: p.user_id.clone(),
            course_id: p.course_id.clone(),
            current_page: p.current_page,
            total_pages: p.total_pages,
            percentage: p.percentage,
            completed: p.completed,
            highest_quiz_score: Some(p.highest_quiz_score),
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

/// REST 数据服务客户端
#[derive(Clone)]
pub struct RestStore {
    base_url: String,
    http_client: Arc<reqwest::Client>,
}

impl RestStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http_client: Arc::new(client),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CourseStore for RestStore {
    async fn fetch_course(&self, course_id: &str) -> Result<Course, StoreError> {
        let request = self
            .http_client
            .get(self.table_url(COURSE_TABLE))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", course_id))]);

        let rows: Vec<CourseRow> = self.fetch_rows(request).await?;
        rows.into_iter()
            .next()
            .map(Course::from)
            .ok_or_else(|| StoreError::NotFound(format!("course {}", course_id)))
    }

    async fn list_open_courses(&self) -> Result<Vec<CourseSummary>, StoreError> {
        let request = self.http_client.get(self.table_url(COURSE_TABLE)).query(&[
            ("select", "id,course_name,course_description"),
            ("course_status", "eq.open"),
        ]);

        let rows: Vec<CourseRow> = self.fetch_rows(request).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let course = Course::from(row);
                CourseSummary::from(&course)
            })
            .collect())
    }

    async fn fetch_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<CourseProgress>, StoreError> {
        let request = self.http_client.get(self.table_url(PROGRESS_TABLE)).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", user_id)),
            ("course_id", format!("eq.{}", course_id)),
        ]);

        let rows: Vec<ProgressRow> = self.fetch_rows(request).await?;
        Ok(rows.into_iter().next().map(CourseProgress::from))
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>, StoreError> {
        let request = self.http_client.get(self.table_url(PROGRESS_TABLE)).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", user_id)),
        ]);

        let rows: Vec<ProgressRow> = self.fetch_rows(request).await?;
        Ok(rows.into_iter().map(CourseProgress::from).collect())
    }

    async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StoreError> {
        let response = self
            .http_client
            .post(self.table_url(PROGRESS_TABLE))
            .query(&[("on_conflict", "user_id,course_id")])
            .header("Prefer", "resolution=merge-duplicates")
            .json(&ProgressRow::from(progress))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn insert_progress_if_absent(&self, progress: &CourseProgress) -> Result<bool, StoreError> {
        let response = self
            .http_client
            .post(self.table_url(PROGRESS_TABLE))
            .query(&[("on_conflict", "user_id,course_id")])
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&ProgressRow::from(progress))
            .send()
            .await?;

        let body = check_status(response).await?.text().await?;
        let inserted: Vec<ProgressRow> = serde_json::from_str(&body)?;
        Ok(!inserted.is_empty())
    }
}

/// 鉴权服务提供的当前用户
#[derive(Clone)]
pub struct RestIdentity {
    base_url: String,
    http_client: Arc<reqwest::Client>,
    has_session: bool,
}

impl RestIdentity {
    pub fn new(config: &RemoteConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http_client: Arc::new(client),
            has_session: config.access_token.is_some(),
        })
    }
}

#[async_trait]
impl IdentityProvider for RestIdentity {
    async fn current_user(&self) -> Result<Option<String>, StoreError> {
        if !self.has_session {
            return Ok(None);
        }

        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self.http_client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let body = check_status(response).await?.text().await?;
        let user: UserResponse = serde_json::from_str(&body)?;
        Ok(Some(user.id))
    }
}

fn default_headers(config: &RemoteConfig) -> Result<HeaderMap, StoreError> {
    let invalid = |e: reqwest::header::InvalidHeaderValue| StoreError::Status {
        status: 0,
        message: format!("invalid header value: {}", e),
    };

    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(&config.api_key).map_err(invalid)?);

    let token = config.access_token.as_deref().unwrap_or(&config.api_key);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid)?,
    );
    Ok(headers)
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteConfig {
        RemoteConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "anon-key".to_string(),
            access_token: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_table_url_trims_slash() {
        let store = RestStore::new(&config()).unwrap();
        assert_eq!(
            store.table_url(PROGRESS_TABLE),
            "https://example.supabase.co/rest/v1/user_course_progress"
        );
    }

    #[test]
    fn test_course_row_mapping() {
        let row: CourseRow = serde_json::from_str(
            r#"{"id":"c1","course_name":"Basic Literacy","course_description":null,"course_content":"Text."}"#,
        )
        .unwrap();
        let course = Course::from(row);
        assert_eq!(course.name, "Basic Literacy");
        assert_eq!(course.content, "Text.");
        assert_eq!(course.status, "open");
    }

    #[test]
    fn test_progress_row_missing_score() {
        let row: ProgressRow = serde_json::from_str(
            r#"{"user_id":"u1","course_id":"c1","current_page":2,"total_pages":5,
                "percentage":40,"completed":false,"highest_quiz_score":null,
                "updated_at":"2026-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        let progress = CourseProgress::from(row);
        assert_eq!(progress.highest_quiz_score, 0);
        assert_eq!(progress.percentage, 40);
    }

    #[test]
    fn test_progress_row_serializes_columns() {
        let progress = CourseProgress::completed("u1", "c1", 4, 3);
        let json = serde_json::to_value(ProgressRow::from(&progress)).unwrap();
        assert_eq!(json["completed"], true);
        assert_eq!(json["highest_quiz_score"], 3);
        assert_eq!(json["current_page"], 4);
    }

    #[tokio::test]
    async fn test_identity_without_session_is_anonymous() {
        let identity = RestIdentity::new(&config()).unwrap();
        assert_eq!(identity.current_user().await.unwrap(), None);
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        let mut cfg = config();
        cfg.api_key = "bad\nkey".to_string();
        assert!(RestStore::new(&cfg).is_err());
    }
}
