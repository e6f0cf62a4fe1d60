//! Application configuration

mod app_config;

pub use app_config::{AppConfig, LoaderSettings, LogFormat, LoggingConfig, ScopeSettings};
