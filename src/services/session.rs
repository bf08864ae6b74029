//! 测验状态机
//! NotStarted → InProgress → Finished，非法操作返回错误且不改变状态

use crate::error::SessionError;
use crate::models::{Page, QuizQuestion};
use crate::services::quiz::QuizSynthesizer;
use rand::Rng;
use serde::Serialize;

/// 测验状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuizState {
    NotStarted,
    InProgress {
        question_index: usize,
        selected: Option<usize>,
        answered: bool,
    },
    Finished {
        score: u32,
    },
}

impl QuizState {
    fn name(&self) -> &'static str {
        match self {
            QuizState::NotStarted => "not started",
            QuizState::InProgress { answered: false, .. } => "answering",
            QuizState::InProgress { answered: true, .. } => "answered",
            QuizState::Finished { .. } => "finished",
        }
    }
}

/// `advance` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { question_index: usize },
    Finished { score: u32, total: usize },
}

/// 单次测验会话
#[derive(Debug, Clone)]
pub struct QuizSession {
    synthesizer: QuizSynthesizer,
    questions: Vec<QuizQuestion>,
    state: QuizState,
    score: u32,
}

impl QuizSession {
    pub fn new(synthesizer: QuizSynthesizer) -> Self {
        Self {
            synthesizer,
            questions: Vec::new(),
            state: QuizState::NotStarted,
            score: 0,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.state {
            QuizState::InProgress { question_index, .. } => self.questions.get(question_index),
            _ => None,
        }
    }

    pub fn start<R: Rng + ?Sized>(&mut self, pages: &[Page], rng: &mut R) -> Result<(), SessionError> {
        if self.state != QuizState::NotStarted {
            return Err(self.invalid("start"));
        }
        self.begin(pages, rng)
    }

    pub fn select_answer(&mut self, index: usize) -> Result<(), SessionError> {
        let count = self.current_question().map_or(0, |q| q.options.len());
        match &mut self.state {
            QuizState::InProgress { answered: true, .. } => Err(SessionError::AnswerLocked),
            QuizState::InProgress { selected, .. } => {
                if index >= count {
                    return Err(SessionError::InvalidOption { index, count });
                }
                *selected = Some(index);
                Ok(())
            }
            _ => Err(self.invalid("select an answer")),
        }
    }

    /// 提交当前选择，返回是否答对
    pub fn submit(&mut self) -> Result<bool, SessionError> {
        let QuizState::InProgress {
            question_index,
            selected,
            answered: false,
        } = self.state
        else {
            return Err(self.invalid("submit"));
        };
        let Some(choice) = selected else {
            return Err(SessionError::NoSelection);
        };

        let correct = self
            .questions
            .get(question_index)
            .is_some_and(|q| q.is_correct(choice));
        if correct {
            self.score += 1;
        }
        self.state = QuizState::InProgress {
            question_index,
            selected,
            answered: true,
        };
        Ok(correct)
    }

    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let QuizState::InProgress {
            question_index,
            answered: true,
            ..
        } = self.state
        else {
            return Err(self.invalid("advance"));
        };

        if question_index + 1 >= self.questions.len() {
            self.state = QuizState::Finished { score: self.score };
            return Ok(Advance::Finished {
                score: self.score,
                total: self.questions.len(),
            });
        }

        let next = question_index + 1;
        self.state = QuizState::InProgress {
            question_index: next,
            selected: None,
            answered: false,
        };
        Ok(Advance::Next { question_index: next })
    }

    /// 重新出题并从第一题开始
    pub fn retry<R: Rng + ?Sized>(&mut self, pages: &[Page], rng: &mut R) -> Result<(), SessionError> {
        if self.state == QuizState::NotStarted {
            return Err(self.invalid("retry"));
        }
        self.begin(pages, rng)
    }

    fn begin<R: Rng + ?Sized>(&mut self, pages: &[Page], rng: &mut R) -> Result<(), SessionError> {
        if pages.is_empty() {
            return Err(SessionError::NoPages);
        }
        let questions = self.synthesizer.generate(pages, rng);
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        self.questions = questions;
        self.score = 0;
        self.state = QuizState::InProgress {
            question_index: 0,
            selected: None,
            answered: false,
        };
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(QuizSynthesizer::default())
    }
}

/// 结果页提示语
pub fn result_message(score: u32, total: usize) -> &'static str {
    let score = score as usize;
    if score == total {
        "Perfect! You've mastered this material!"
    } else if score * 2 >= total {
        "Good job! Keep learning!"
    } else {
        "Keep practicing, you'll get there!"
    }
}
