// 命令模块
// 提供供前端调用的命令接口，返回 DTO 与字符串错误

pub mod course;
pub mod quiz;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::models::Page;
use crate::services::attempt::QuizAttempt;
use crate::services::markdown::to_plain_text;
use crate::services::paginator::ContentPaginator;
use crate::services::quiz::QuizSynthesizer;
use crate::services::store::{CourseStore, IdentityProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub use course::{
    get_continue_learning,
    get_course_pages,
    get_course_progress,
    get_courses,
    open_course,
    CourseDto,
    PageDto,
    ProgressDto,
};

pub use quiz::{
    close_quiz,
    get_quiz,
    next_question,
    retry_quiz,
    select_answer,
    start_quiz,
    submit_answer,
    AnswerResultDto,
    QuestionDto,
    QuizViewDto,
};

/// 每个测验单独加锁，表锁只在查找和增删时短暂持有
type SharedAttempt = Arc<Mutex<QuizAttempt>>;

/// 应用状态
///
/// 测验在 `close_quiz` 之前一直保留（结束后仍可 `retry_quiz`），
/// 前端放弃测验时应调用 `close_quiz` 释放。
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn CourseStore>,
    identity: Arc<dyn IdentityProvider>,
    attempts: Mutex<HashMap<Uuid, SharedAttempt>>,
    seed: Option<u64>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn CourseStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            store,
            identity,
            attempts: Mutex::new(HashMap::new()),
            seed: None,
        }
    }

    /// 新建的测验使用固定种子出题
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 尚未关闭的测验数
    pub async fn open_quizzes(&self) -> usize {
        self.attempts.lock().await.len()
    }

    async fn insert_attempt(&self, id: Uuid, attempt: QuizAttempt) {
        self.attempts.lock().await.insert(id, Arc::new(Mutex::new(attempt)));
    }

    /// 取出测验句柄，表锁随即释放
    async fn attempt(&self, id: &Uuid) -> Option<SharedAttempt> {
        self.attempts.lock().await.get(id).cloned()
    }

    async fn remove_attempt(&self, id: &Uuid) -> bool {
        self.attempts.lock().await.remove(id).is_some()
    }

    fn paginator(&self) -> ContentPaginator {
        ContentPaginator::new(self.config.page_size).with_start_marker(self.config.start_marker.clone())
    }

    fn synthesizer(&self) -> QuizSynthesizer {
        QuizSynthesizer::new(self.config.quiz_question_count)
    }

    /// 读取课程正文并分页
    async fn course_pages(&self, course_id: &str) -> Result<Vec<Page>, StoreError> {
        let course = self.store.fetch_course(course_id).await?;
        let pages = if self.config.strip_markdown {
            self.paginator().paginate(&to_plain_text(&course.content))
        } else {
            self.paginator().paginate(&course.content)
        };
        log::debug!("course {} split into {} pages", course_id, pages.len());
        Ok(pages)
    }

    fn new_attempt(&self, course_id: &str, pages: Vec<Page>) -> QuizAttempt {
        let attempt = QuizAttempt::new(
            course_id,
            pages,
            self.synthesizer(),
            self.store.clone(),
            self.identity.clone(),
        );
        match self.seed {
            Some(seed) => attempt.with_seed(seed),
            None => attempt,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::Course;
    use crate::services::database::SqliteStore;
    use crate::services::store::StaticIdentity;

    pub const LESSON: &str = "Welcome to the program.\n\n\
        # Alternative Learning System K to 12 Basic Education Curriculum (ALS K to 12 BEC)\n\n\
        Learners should develop strong reading comprehension through consistent practice. \
        Community facilitators organize weekly sessions for adult learners.\n\n\
        Numeracy supports budgeting decisions within households and markets.";

    pub fn course(id: &str, name: &str, description: Option<&str>, status: &str) -> Course {
        Course {
            id: id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            content: LESSON.to_string(),
            status: status.to_string(),
        }
    }

    pub fn seeded_store() -> Arc<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.add_course(&course("c1", "Basic Literacy", Some("Reading and writing"), "open")).unwrap();
        store.add_course(&course("c2", "Numeracy", None, "open")).unwrap();
        store.add_course(&course("c3", "Draft Course", Some("literacy draft"), "draft")).unwrap();
        store
    }

    pub fn state_on(config: AppConfig, store: Arc<dyn CourseStore>, user: Option<&str>) -> AppState {
        let identity = match user {
            Some(id) => StaticIdentity::new(id),
            None => StaticIdentity::anonymous(),
        };
        AppState::new(config, store, Arc::new(identity)).with_seed(Some(7))
    }

    /// 内存数据库 + 固定用户
    pub fn state_with(config: AppConfig, user: Option<&str>) -> (AppState, Arc<SqliteStore>) {
        let store = seeded_store();
        (state_on(config, store.clone(), user), store)
    }

    pub fn state() -> (AppState, Arc<SqliteStore>) {
        state_with(AppConfig::default(), Some("u1"))
    }
}
