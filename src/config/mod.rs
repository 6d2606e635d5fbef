//! Application configuration: `config/default`, `config/local` and `APP__` environment variables

mod app_config;

pub use app_config::{
    AppConfig, EngineConfig, KnowledgeConfig, LlmConfig, LogFormat, LoggingConfig, PresetConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
