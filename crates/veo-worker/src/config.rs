//! Worker configuration.

use std::path::PathBuf;

use veo_genai::GenAiConfig;
use veo_models::ApiKey;
use veo_queue::EngineConfig;

use crate::error::{WorkerError, WorkerResult};

/// Where state lives and how the engine and client are tuned.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue snapshot and preference slots
    pub data_dir: PathBuf,
    /// Default export folder
    pub output_dir: PathBuf,
    /// Preview downloads
    pub cache_dir: PathBuf,
    /// Session key that takes precedence over the stored one
    pub api_key: Option<ApiKey>,
    pub engine: EngineConfig,
    pub genai: GenAiConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            cache_dir: data_dir.join("previews"),
            data_dir,
            output_dir: default_output_dir(),
            api_key: None,
            engine: EngineConfig::default(),
            genai: GenAiConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let data_dir = env_path("VEO_DATA_DIR").unwrap_or(defaults.data_dir);
        let cache_dir = env_path("VEO_CACHE_DIR").unwrap_or_else(|| data_dir.join("previews"));
        let output_dir = env_path("VEO_OUTPUT_DIR").unwrap_or(defaults.output_dir);

        let api_key = match std::env::var("VEO_API_KEY") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                ApiKey::parse(&raw).map_err(|e| WorkerError::config(format!("VEO_API_KEY: {}", e)))?,
            ),
            _ => None,
        };

        Ok(Self {
            data_dir,
            output_dir,
            cache_dir,
            api_key,
            engine: EngineConfig::from_env(),
            genai: GenAiConfig::from_env(),
        })
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veo-batch")
}

fn default_output_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("VEO-Videos")
}
