use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::llm::{DEFAULT_OPENAI_BASE_URL, EndpointPreset};
use crate::infrastructure::sandbox::SandboxLimits;

const PRESET_BASE_URL_PREFIX: &str = "PROXY_BASE_URL_";
const PRESET_API_KEY_PREFIX: &str = "PROXY_API_KEY_";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
    pub sandbox: SandboxLimits,
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for a whole run; unbounded when absent
    pub run_timeout_secs: Option<u64>,
    /// Model used by `llm` nodes that leave theirs blank
    pub default_model: String,
}

impl EngineConfig {
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Default endpoint for `llm` nodes plus named presets selected by `config_id`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub presets: HashMap<String, PresetConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub base_url: String,
    pub api_key: String,
}

impl LlmConfig {
    /// Merge `PROXY_BASE_URL_<ID>` / `PROXY_API_KEY_<ID>` pairs into the presets.
    /// A key without a matching base URL is ignored.
    pub fn merge_env_presets<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        for (name, base_url) in &vars {
            let Some(id) = name.strip_prefix(PRESET_BASE_URL_PREFIX) else {
                continue;
            };
            if id.is_empty() || base_url.is_empty() {
                continue;
            }

            let api_key = vars
                .get(&format!("{}{}", PRESET_API_KEY_PREFIX, id))
                .cloned()
                .unwrap_or_default();

            self.presets.insert(
                id.to_string(),
                PresetConfig {
                    base_url: base_url.clone(),
                    api_key,
                },
            );
        }
    }

    pub fn endpoint_presets(&self) -> HashMap<String, EndpointPreset> {
        self.presets
            .iter()
            .map(|(id, preset)| {
                (
                    id.clone(),
                    EndpointPreset {
                        base_url: preset.base_url.clone(),
                        api_key: preset.api_key.clone(),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// One JSON file per workflow when the backend is `file`
    pub workflows_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// JSON registry `{kb_id: {name, files: [...]}}`
    pub registry_path: Option<PathBuf>,
    /// Directory whose files are indexed for retrieval, by file name
    pub documents_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: None,
            default_model: crate::domain::workflow::DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            api_key: String::new(),
            presets: HashMap::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            workflows_dir: PathBuf::from("workflows"),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app: Self = config.try_deserialize()?;
        app.llm.merge_env_presets(std::env::vars());
        Ok(app)
    }
}
