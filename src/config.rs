// 应用配置
// 支持 JSON 配置文件，缺省字段使用默认值，日志级别可由环境变量覆盖

use crate::error::ConfigError;
use crate::services::paginator::{DEFAULT_PAGE_SIZE, DEFAULT_START_MARKER};
use crate::services::quiz::DEFAULT_QUESTION_COUNT;
use crate::utils::get_database_path;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 覆盖日志级别的环境变量
pub const LOG_ENV: &str = "COURSEQUIZ_LOG";

/// 托管数据服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub page_size: usize,
    pub quiz_question_count: usize,
    pub start_marker: Option<String>,
    pub strip_markdown: bool,
    pub database_path: PathBuf,
    pub log_level: String,
    pub remote: Option<RemoteConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            quiz_question_count: DEFAULT_QUESTION_COUNT,
            start_marker: Some(DEFAULT_START_MARKER.to_string()),
            strip_markdown: false,
            database_path: get_database_path(),
            log_level: "info".to_string(),
            remote: None,
        }
    }
}

impl AppConfig {
    /// 从文件加载；文件不存在时使用默认配置
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = fs::read_to_string(p)?;
                serde_json::from_str::<AppConfig>(&raw)?
            }
            Some(p) => {
                log::warn!("config file {} not found, using defaults", p.display());
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        if let Ok(level) = std::env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                config.log_level = level.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.quiz_question_count == 0 {
            return Err(ConfigError::Invalid {
                field: "quiz_question_count",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: format!("unknown level {:?}", self.log_level),
            });
        }
        if let Some(remote) = &self.remote {
            if remote.url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "remote.url",
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
