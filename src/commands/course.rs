// 课程命令模块
// 课程列表、分页阅读与学习进度

use super::AppState;
use crate::error::StoreError;
use crate::models::{CourseProgress, CourseSummary, Page};
use crate::services::progress;
use serde::{Deserialize, Serialize};

/// 课程传输对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// 阅读页传输对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDto {
    pub page_number: u32,
    pub total_pages: u32,
    pub content: String,
}

/// 学习进度传输对象
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressDto {
    pub course_id: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub percentage: u32,
    pub completed: bool,
    pub highest_quiz_score: u32,
    pub updated_at: String,
}

impl From<&CourseSummary> for CourseDto {
    fn from(course: &CourseSummary) -> Self {
        Self {
            id: course.id.clone(),
            name: course.name.clone(),
            description: course.description.clone(),
        }
    }
}

impl From<CourseProgress> for ProgressDto {
    fn from(progress: CourseProgress) -> Self {
        Self {
            course_id: progress.course_id,
            current_page: progress.current_page,
            total_pages: progress.total_pages,
            percentage: progress.percentage,
            completed: progress.completed,
            highest_quiz_score: progress.highest_quiz_score,
            updated_at: progress.updated_at.to_rfc3339(),
        }
    }
}

fn page_to_dto(page: Page, total_pages: u32) -> PageDto {
    PageDto {
        page_number: page.page_number,
        total_pages,
        content: page.content,
    }
}

/// 获取开放课程，可按关键字筛选
pub async fn get_courses(query: Option<String>, state: &AppState) -> Result<Vec<CourseDto>, String> {
    let courses = state
        .store
        .list_open_courses()
        .await
        .map_err(|e| e.to_string())?;

    let query = query.unwrap_or_default();
    Ok(progress::filter_courses(&courses, &query)
        .into_iter()
        .map(CourseDto::from)
        .collect())
}

/// 打开课程，首次打开时建立进度记录
pub async fn open_course(course_id: String, state: &AppState) -> Result<bool, String> {
    progress::open_course(state.store.as_ref(), state.identity.as_ref(), &course_id)
        .await
        .map_err(|e| e.to_string())
}

/// 获取课程分页内容
pub async fn get_course_pages(course_id: String, state: &AppState) -> Result<Vec<PageDto>, String> {
    let pages = state.course_pages(&course_id).await.map_err(|e| e.to_string())?;
    let total = pages.len() as u32;
    Ok(pages.into_iter().map(|p| page_to_dto(p, total)).collect())
}

/// 获取当前用户在某课程上的进度
pub async fn get_course_progress(
    course_id: String,
    state: &AppState,
) -> Result<Option<ProgressDto>, String> {
    let user_id = state
        .identity
        .current_user()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| StoreError::Unauthenticated.to_string())?;

    let progress = state
        .store
        .fetch_progress(&user_id, &course_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(progress.map(ProgressDto::from))
}

/// "继续学习"推荐
pub async fn get_continue_learning(state: &AppState) -> Result<Option<ProgressDto>, String> {
    let progress = progress::continue_learning(state.store.as_ref(), state.identity.as_ref())
        .await
        .map_err(|e| e.to_string())?;
    Ok(progress.map(ProgressDto::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{state, state_with};
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_get_courses_open_only() {
        let (state, _) = state();

        let all = get_courses(None, &state).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);

        let found = get_courses(Some("  LITERACY".to_string()), &state).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Basic Literacy");
    }

    #[tokio::test]
    async fn test_get_course_pages_drops_preamble() {
        let (state, _) = state();

        let pages = get_course_pages("c1".to_string(), &state).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].total_pages, 1);
        assert!(pages[0].content.starts_with("# Alternative Learning System"));
        assert!(!pages[0].content.contains("Welcome"));
    }

    #[tokio::test]
    async fn test_get_course_pages_small_pages() {
        let config = AppConfig {
            page_size: 80,
            strip_markdown: true,
            ..AppConfig::default()
        };
        let (state, _) = state_with(config, Some("u1"));

        let pages = get_course_pages("c1".to_string(), &state).await.unwrap();
        assert!(pages.len() > 1);
        assert!(pages[0].content.starts_with("Alternative Learning System"));
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.page_number as usize, i + 1);
            assert_eq!(page.total_pages as usize, pages.len());
            assert!(!page.content.trim().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_course_is_error() {
        let (state, _) = state();
        assert!(get_course_pages("nope".to_string(), &state).await.is_err());
    }

    #[tokio::test]
    async fn test_open_course_and_progress() {
        let (state, _) = state();

        assert!(get_course_progress("c1".to_string(), &state).await.unwrap().is_none());
        assert!(get_continue_learning(&state).await.unwrap().is_none());

        assert!(open_course("c1".to_string(), &state).await.unwrap());
        assert!(!open_course("c1".to_string(), &state).await.unwrap());

        let progress = get_course_progress("c1".to_string(), &state).await.unwrap().unwrap();
        assert_eq!(progress.percentage, 1);
        assert!(!progress.completed);

        let next = get_continue_learning(&state).await.unwrap().unwrap();
        assert_eq!(next.course_id, "c1");
    }

    #[tokio::test]
    async fn test_progress_requires_user() {
        let (state, _) = state_with(AppConfig::default(), None);
        assert!(get_course_progress("c1".to_string(), &state).await.is_err());
        assert!(get_continue_learning(&state).await.is_err());
        assert!(!open_course("c1".to_string(), &state).await.unwrap());
    }
}
