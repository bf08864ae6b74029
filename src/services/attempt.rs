//! 测验作答流程
//! 在状态机之上注入存储与身份能力，测验结束时写入完成记录（每次作答至多一次）

use crate::error::SessionError;
use crate::models::{CourseProgress, Page, QuizQuestion};
use crate::services::quiz::QuizSynthesizer;
use crate::services::session::{Advance, QuizSession, QuizState};
use crate::services::store::{CourseStore, IdentityProvider};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// 一次测验作答
pub struct QuizAttempt {
    course_id: String,
    pages: Vec<Page>,
    session: QuizSession,
    rng: StdRng,
    store: Arc<dyn CourseStore>,
    identity: Arc<dyn IdentityProvider>,
    completion_marked: bool,
}

impl QuizAttempt {
    pub fn new(
        course_id: impl Into<String>,
        pages: Vec<Page>,
        synthesizer: QuizSynthesizer,
        store: Arc<dyn CourseStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            pages,
            session: QuizSession::new(synthesizer),
            rng: StdRng::from_os_rng(),
            store,
            identity,
            completion_marked: false,
        }
    }

    /// 使用固定种子，便于复现
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.session.current_question()
    }

    pub fn completion_marked(&self) -> bool {
        self.completion_marked
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.session.start(&self.pages, &mut self.rng)?;
        self.completion_marked = false;
        Ok(())
    }

    pub fn select_answer(&mut self, index: usize) -> Result<(), SessionError> {
        self.session.select_answer(index)
    }

    pub fn submit(&mut self) -> Result<bool, SessionError> {
        self.session.submit()
    }

    /// 进入下一题；最后一题后结束并记录完成
    pub async fn advance(&mut self) -> Result<Advance, SessionError> {
        let outcome = self.session.advance()?;
        if let Advance::Finished { score, .. } = outcome {
            self.mark_completed(score).await;
        }
        Ok(outcome)
    }

    pub fn retry(&mut self) -> Result<(), SessionError> {
        self.session.retry(&self.pages, &mut self.rng)?;
        self.completion_marked = false;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.session.state(), QuizState::Finished { .. })
    }

    /// 写入完成状态与最高分；失败只记录日志
    async fn mark_completed(&mut self, score: u32) {
        if self.completion_marked {
            return;
        }

        let user_id = match self.identity.current_user().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                log::error!("No user found, cannot mark course {} as completed", self.course_id);
                return;
            }
            Err(e) => {
                log::error!("Failed to resolve current user: {}", e);
                return;
            }
        };

        // 先读后写，并发作答时不保证原子性
        let previous_best = match self.store.fetch_progress(&user_id, &self.course_id).await {
            Ok(existing) => existing.map_or(0, |p| p.highest_quiz_score),
            Err(e) => {
                log::warn!("Failed to read previous progress for {}: {}", self.course_id, e);
                0
            }
        };
        let highest = previous_best.max(score);
        let total_pages = self.pages.len().max(1) as u32;

        let progress = CourseProgress::completed(&user_id, &self.course_id, total_pages, highest);
        match self.store.upsert_progress(&progress).await {
            Ok(()) => {
                log::info!(
                    "Course {} marked as completed with score {} (high score {})",
                    self.course_id,
                    score,
                    highest
                );
                self.completion_marked = true;
            }
            Err(e) => log::error!("Failed to mark course {} completed: {}", self.course_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Course, CourseSummary};
    use crate::services::database::SqliteStore;
    use crate::services::store::StaticIdentity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pages() -> Vec<Page> {
        vec![Page {
            page_number: 1,
            content: "Learners should develop strong reading comprehension through consistent practice. \
                Community facilitators organize weekly sessions for adult learners."
                .to_string(),
        }]
    }

    fn seeded_store() -> Arc<SqliteStore> {
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
        Arc::new(store)
    }

    fn attempt(store: Arc<dyn CourseStore>, identity: Arc<dyn IdentityProvider>) -> QuizAttempt {
        QuizAttempt::new("c1", pages(), QuizSynthesizer::new(3), store, identity).with_seed(99)
    }

    async fn finish(attempt: &mut QuizAttempt, correct: bool) -> u32 {
        loop {
            let q = attempt.current_question().unwrap();
            let pick = if correct { q.correct_answer } else { (q.correct_answer + 1) % 4 };
            attempt.select_answer(pick).unwrap();
            attempt.submit().unwrap();
            if let Advance::Finished { score, .. } = attempt.advance().await.unwrap() {
                return score;
            }
        }
    }

    /// 统计写入次数，可模拟写入失败
    struct CountingStore {
        inner: Arc<SqliteStore>,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    #[async_trait]
    impl CourseStore for CountingStore {
        async fn fetch_course(&self, course_id: &str) -> Result<Course, StoreError> {
            self.inner.fetch_course(course_id).await
        }
        async fn list_open_courses(&self) -> Result<Vec<CourseSummary>, StoreError> {
            self.inner.list_open_courses().await
        }
        async fn fetch_progress(&self, user_id: &str, course_id: &str) -> Result<Option<CourseProgress>, StoreError> {
            self.inner.fetch_progress(user_id, course_id).await
        }
        async fn list_progress(&self, user_id: &str) -> Result<Vec<CourseProgress>, StoreError> {
            self.inner.list_progress(user_id).await
        }
        async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StoreError::Status { status: 503, message: "unavailable".to_string() });
            }
            self.inner.upsert_progress(progress).await
        }
        async fn insert_progress_if_absent(&self, progress: &CourseProgress) -> Result<bool, StoreError> {
            self.inner.insert_progress_if_absent(progress).await
        }
    }

    #[tokio::test]
    async fn test_finish_marks_completed_once() {
        let store = Arc::new(CountingStore {
            inner: seeded_store(),
            writes: AtomicUsize::new(0),
            fail_writes: false,
        });
        let mut attempt = attempt(store.clone(), Arc::new(StaticIdentity::new("u1")));
        attempt.start().unwrap();

        assert_eq!(finish(&mut attempt, true).await, 3);
        assert!(attempt.is_finished());
        assert!(attempt.completion_marked());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        // 结束后不能再次 advance
        assert!(attempt.advance().await.is_err());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        let progress = store.fetch_progress("u1", "c1").await.unwrap().unwrap();
        assert!(progress.completed);
        assert_eq!(progress.percentage, 100);
        assert_eq!(progress.current_page, 1);
        assert_eq!(progress.highest_quiz_score, 3);
    }

    #[tokio::test]
    async fn test_highest_score_retained() {
        let store = seeded_store();
        let mut attempt = attempt(store.clone(), Arc::new(StaticIdentity::new("u1")));

        attempt.start().unwrap();
        finish(&mut attempt, true).await;

        attempt.retry().unwrap();
        assert!(!attempt.completion_marked());
        assert_eq!(finish(&mut attempt, false).await, 0);
        assert!(attempt.completion_marked());

        let progress = store.fetch_progress("u1", "c1").await.unwrap().unwrap();
        assert_eq!(progress.highest_quiz_score, 3);
    }

    #[tokio::test]
    async fn test_anonymous_user_skips_write() {
        let store = seeded_store();
        let mut attempt = attempt(store.clone(), Arc::new(StaticIdentity::anonymous()));
        attempt.start().unwrap();
        finish(&mut attempt, true).await;

        assert!(attempt.is_finished());
        assert!(!attempt.completion_marked());
        assert!(store.fetch_progress("u1", "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_is_dropped() {
        let store = Arc::new(CountingStore {
            inner: seeded_store(),
            writes: AtomicUsize::new(0),
            fail_writes: true,
        });
        let mut attempt = attempt(store.clone(), Arc::new(StaticIdentity::new("u1")));
        attempt.start().unwrap();

        assert_eq!(finish(&mut attempt, true).await, 3);
        assert!(attempt.is_finished());
        assert!(!attempt.completion_marked());
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_without_pages() {
        let mut attempt = QuizAttempt::new(
            "c1",
            Vec::new(),
            QuizSynthesizer::default(),
            seeded_store(),
            Arc::new(StaticIdentity::new("u1")),
        );
        assert_eq!(attempt.start().unwrap_err(), SessionError::NoPages);
    }
}
