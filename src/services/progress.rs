// 学习进度服务
// 打开课程时初始化进度、选出"继续学习"的课程、按关键字筛选课程

use crate::error::StoreError;
use crate::models::{CourseProgress, CourseSummary};
use crate::services::store::{CourseStore, IdentityProvider};

/// 首次打开课程时创建初始进度，返回是否新建
pub async fn open_course(
    store: &dyn CourseStore,
    identity: &dyn IdentityProvider,
    course_id: &str,
) -> Result<bool, StoreError> {
    let Some(user_id) = identity.current_user().await? else {
        return Ok(false);
    };

    if store.fetch_progress(&user_id, course_id).await?.is_some() {
        return Ok(false);
    }

    let created = store
        .insert_progress_if_absent(&CourseProgress::initial(&user_id, course_id))
        .await?;
    if created {
        log::debug!("created initial progress for {} on {}", user_id, course_id);
    }
    Ok(created)
}

/// 未完成且已有进度的课程中百分比最高者；并列时取前者
pub fn pick_continue_learning(progress: &[CourseProgress]) -> Option<&CourseProgress> {
    progress
        .iter()
        .filter(|p| !p.completed && p.percentage > 0)
        .reduce(|best, p| if best.percentage >= p.percentage { best } else { p })
}

pub async fn continue_learning(
    store: &dyn CourseStore,
    identity: &dyn IdentityProvider,
) -> Result<Option<CourseProgress>, StoreError> {
    let Some(user_id) = identity.current_user().await? else {
        return Err(StoreError::Unauthenticated);
    };
    let progress = store.list_progress(&user_id).await?;
    Ok(pick_continue_learning(&progress).cloned())
}

/// 名称或简介包含关键字（忽略大小写）；空关键字返回全部
pub fn filter_courses<'a>(courses: &'a [CourseSummary], query: &str) -> Vec<&'a CourseSummary> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return courses.iter().collect();
    }

    courses
        .iter()
        .filter(|c| {
            c.name.to_lowercase().contains(&q)
                || c
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&q))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;
    use crate::services::database::SqliteStore;
    use crate::services::store::StaticIdentity;

    fn progress(course_id: &str, percentage: u32, completed: bool) -> CourseProgress {
        CourseProgress {
            percentage,
            completed,
            ..CourseProgress::initial("u1", course_id)
        }
    }

    fn summary(id: &str, name: &str, description: Option<&str>) -> CourseSummary {
        CourseSummary {
            id: id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_pick_highest_unfinished() {
        let rows = vec![
            progress("a", 30, false),
            progress("b", 90, true),
            progress("c", 60, false),
            progress("d", 0, false),
        ];
        assert_eq!(pick_continue_learning(&rows).unwrap().course_id, "c");
    }

    #[test]
    fn test_pick_tie_keeps_earlier() {
        let rows = vec![progress("a", 50, false), progress("b", 50, false)];
        assert_eq!(pick_continue_learning(&rows).unwrap().course_id, "a");
    }

    #[test]
    fn test_pick_none_when_all_done() {
        let rows = vec![progress("a", 100, true), progress("b", 0, false)];
        assert!(pick_continue_learning(&rows).is_none());
    }

    #[test]
    fn test_filter_courses() {
        let courses = vec![
            summary("1", "Basic Literacy", Some("Reading and writing")),
            summary("2", "Numeracy", None),
            summary("3", "Life Skills", Some("Financial LITERACY at home")),
        ];
        let ids: Vec<&str> = filter_courses(&courses, "  literacy ").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(filter_courses(&courses, "").len(), 3);
        assert!(filter_courses(&courses, "chemistry").is_empty());
    }

    #[tokio::test]
    async fn test_open_course_creates_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .add_course(&Course {
                id: "c1".to_string(),
                name: "Literacy".to_string(),
                description: None,
                content: String::new(),
                status: "open".to_string(),
            })
            .unwrap();
        let identity = StaticIdentity::new("u1");

        assert!(open_course(&store, &identity, "c1").await.unwrap());
        assert!(!open_course(&store, &identity, "c1").await.unwrap());

        let p = store.get_progress("u1", "c1").unwrap().unwrap();
        assert_eq!((p.current_page, p.total_pages, p.percentage), (1, 1, 1));
        assert!(!p.completed);

        let next = continue_learning(&store, &identity).await.unwrap().unwrap();
        assert_eq!(next.course_id, "c1");
    }

    #[tokio::test]
    async fn test_anonymous_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        let identity = StaticIdentity::anonymous();
        assert!(!open_course(&store, &identity, "c1").await.unwrap());
        assert!(matches!(
            continue_learning(&store, &identity).await,
            Err(StoreError::Unauthenticated)
        ));
    }
}
