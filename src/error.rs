// 错误类型
// 存储、测验会话与配置三类错误

use thiserror::Error;

/// 外部存储错误（数据库、网络、鉴权）
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Store lock poisoned: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 测验状态机错误，发生时状态不变
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("Quiz needs at least one page of content")]
    NoPages,

    #[error("No questions could be generated")]
    NoQuestions,

    #[error("Answer is already submitted for this question")]
    AnswerLocked,

    #[error("No answer selected")]
    NoSelection,

    #[error("Option {index} is out of range ({count} options)")]
    InvalidOption { index: usize, count: usize },
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
