// 外部数据源接口
// 课程/进度存储与当前用户身份，以能力形式注入会话流程

use crate::error::StoreError;
use crate::models::{Course, CourseProgress, CourseSummary};
use async_trait::async_trait;

/// 课程与学习进度存储
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn fetch_course(&self, course_id: &str) -> Result<Course, StoreError>;

    /// 状态为 open 的课程
    async fn list_open_courses(&self) -> Result<Vec<CourseSummary>, StoreError>;

    async fn fetch_progress(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<CourseProgress>, StoreError>;

    async fn list_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>, StoreError>;

    /// 按 (user_id, course_id) 覆盖写入
    async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StoreError>;

    /// 不存在时插入，返回是否插入
    async fn insert_progress_if_absent(&self, progress: &CourseProgress) -> Result<bool, StoreError>;
}

/// 当前登录用户
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<String>, StoreError>;
}

/// 固定用户身份
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<String>);

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<String>, StoreError> {
        Ok(self.0.clone())
    }
}
