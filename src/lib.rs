pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use error::{ConfigError, SessionError, StoreError};
