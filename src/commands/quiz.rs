// 测验命令模块
// 开始、作答、翻题、重做与关闭测验，测验以 UUID 标识

use super::AppState;
use crate::models::QuizQuestion;
use crate::services::attempt::QuizAttempt;
use crate::services::session::{result_message, Advance, QuizState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 题目传输对象，提交前不含正确答案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDto {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<usize>,
}

/// 测验视图
#[derive(Debug, Clone, Serialize)]
pub struct QuizViewDto {
    pub quiz_id: String,
    pub course_id: String,
    pub state: QuizState,
    /// 从 1 开始
    pub question_number: Option<usize>,
    pub total_questions: usize,
    pub score: u32,
    pub question: Option<QuestionDto>,
    pub result_message: Option<String>,
}

/// 提交答案结果
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResultDto {
    pub correct: bool,
    pub correct_answer: usize,
    pub view: QuizViewDto,
}

fn question_to_dto(question: &QuizQuestion, reveal: bool) -> QuestionDto {
    QuestionDto {
        question: question.question.clone(),
        options: question.options.clone(),
        correct_answer: reveal.then_some(question.correct_answer),
    }
}

fn attempt_to_view(quiz_id: &Uuid, attempt: &QuizAttempt) -> QuizViewDto {
    let session = attempt.session();
    let total = session.questions().len();

    let (question_number, question) = match session.state() {
        QuizState::InProgress {
            question_index,
            answered,
            ..
        } => (
            Some(question_index + 1),
            attempt.current_question().map(|q| question_to_dto(q, *answered)),
        ),
        _ => (None, None),
    };

    let result = match session.state() {
        QuizState::Finished { score } => Some(result_message(*score, total).to_string()),
        _ => None,
    };

    QuizViewDto {
        quiz_id: quiz_id.to_string(),
        course_id: attempt.course_id().to_string(),
        state: session.state().clone(),
        question_number,
        total_questions: total,
        score: session.score(),
        question,
        result_message: result,
    }
}

fn parse_quiz_id(quiz_id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(quiz_id).map_err(|e| format!("Invalid quiz id {}: {}", quiz_id, e))
}

fn not_found(quiz_id: &Uuid) -> String {
    format!("Quiz not found: {}", quiz_id)
}

/// 为课程开始一次测验
pub async fn start_quiz(course_id: String, state: &AppState) -> Result<QuizViewDto, String> {
    let pages = state.course_pages(&course_id).await.map_err(|e| e.to_string())?;

    let mut attempt = state.new_attempt(&course_id, pages);
    attempt.start().map_err(|e| e.to_string())?;

    let id = Uuid::new_v4();
    let view = attempt_to_view(&id, &attempt);
    state.insert_attempt(id, attempt).await;

    log::info!("quiz {} started for course {}", id, course_id);
    Ok(view)
}

pub async fn get_quiz(quiz_id: String, state: &AppState) -> Result<QuizViewDto, String> {
    let id = parse_quiz_id(&quiz_id)?;
    let shared = state.attempt(&id).await.ok_or_else(|| not_found(&id))?;
    let attempt = shared.lock().await;
    Ok(attempt_to_view(&id, &attempt))
}

/// 选择选项，提交前可更改
pub async fn select_answer(
    quiz_id: String,
    option_index: usize,
    state: &AppState,
) -> Result<QuizViewDto, String> {
    let id = parse_quiz_id(&quiz_id)?;
    let shared = state.attempt(&id).await.ok_or_else(|| not_found(&id))?;
    let mut attempt = shared.lock().await;

    attempt.select_answer(option_index).map_err(|e| e.to_string())?;
    Ok(attempt_to_view(&id, &attempt))
}

/// 提交当前选择
pub async fn submit_answer(quiz_id: String, state: &AppState) -> Result<AnswerResultDto, String> {
    let id = parse_quiz_id(&quiz_id)?;
    let shared = state.attempt(&id).await.ok_or_else(|| not_found(&id))?;
    let mut attempt = shared.lock().await;

    let correct = attempt.submit().map_err(|e| e.to_string())?;
    let correct_answer = attempt
        .current_question()
        .map(|q| q.correct_answer)
        .ok_or_else(|| not_found(&id))?;

    Ok(AnswerResultDto {
        correct,
        correct_answer,
        view: attempt_to_view(&id, &attempt),
    })
}

/// 下一题；最后一题后结束并记录课程完成
///
/// 写入进度期间只锁住本测验，其它测验不受影响。
pub async fn next_question(quiz_id: String, state: &AppState) -> Result<QuizViewDto, String> {
    let id = parse_quiz_id(&quiz_id)?;
    let shared = state.attempt(&id).await.ok_or_else(|| not_found(&id))?;
    let mut attempt = shared.lock().await;

    match attempt.advance().await.map_err(|e| e.to_string())? {
        Advance::Finished { score, total } => {
            log::info!("quiz {} finished with {}/{}", id, score, total);
        }
        Advance::Next { question_index } => {
            log::debug!("quiz {} moved to question {}", id, question_index + 1);
        }
    }
    Ok(attempt_to_view(&id, &attempt))
}

/// 重新出题再做一次
pub async fn retry_quiz(quiz_id: String, state: &AppState) -> Result<QuizViewDto, String> {
    let id = parse_quiz_id(&quiz_id)?;
    let shared = state.attempt(&id).await.ok_or_else(|| not_found(&id))?;
    let mut attempt = shared.lock().await;

    attempt.retry().map_err(|e| e.to_string())?;
    Ok(attempt_to_view(&id, &attempt))
}

/// 关闭测验，返回是否存在
pub async fn close_quiz(quiz_id: String, state: &AppState) -> Result<bool, String> {
    let id = parse_quiz_id(&quiz_id)?;
    Ok(state.remove_attempt(&id).await)
}
