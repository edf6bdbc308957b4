//! Configuration loading
//!
//! Layers, lowest to highest: built-in defaults, the TOML file, environment.

use super::types::AppConfig;
use crate::util::errors::{MentoraError, MentoraResult};
use log::{debug, info};
use std::path::{Path, PathBuf};

pub const ENV_BACKEND_URL: &str = "MENTORA_BACKEND_URL";
pub const ENV_BACKEND_URL_FALLBACK: &str = "BACKEND_URL";
pub const ENV_CHAT_URL: &str = "MENTORA_CHAT_URL";
pub const ENV_AGENT_ID: &str = "MENTORA_AGENT_ID";
pub const ENV_STORAGE_PATH: &str = "MENTORA_STORAGE_PATH";

/// `<config_dir>/mentora/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mentora").join("config.toml"))
}

pub fn load_from_str(content: &str, source_name: &str) -> MentoraResult<AppConfig> {
    toml::from_str(content)
        .map_err(|e| MentoraError::Config(format!("Parse error in {}: {}", source_name, e)))
}

pub fn load_from_file(path: &Path) -> MentoraResult<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MentoraError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    load_from_str(&content, &path.display().to_string())
}

/// Apply environment overrides through `lookup` (normally `std::env::var`)
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_BACKEND_URL).or_else(|| non_empty(ENV_BACKEND_URL_FALLBACK)) {
        debug!("Backend URL overridden from environment: url={}", url);
        config.backend_url = url;
    }
    if let Some(url) = non_empty(ENV_CHAT_URL) {
        config.chat.endpoint = url;
    }
    if let Some(agent_id) = non_empty(ENV_AGENT_ID) {
        config.chat.agent_id = Some(agent_id);
    }
    if let Some(path) = non_empty(ENV_STORAGE_PATH) {
        config.storage.path = Some(PathBuf::from(path));
    }
}

/// Load the effective configuration.
///
/// An explicit `path` must exist; otherwise the default location is used
/// when present.
pub fn load(path: Option<&Path>) -> MentoraResult<AppConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => match default_config_path().filter(|p| p.is_file()) {
            Some(default_path) => load_from_file(&default_path)?,
            None => AppConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    info!(
        "Configuration loaded: backend_url={}, chat_endpoint={}, direction={}",
        config.backend_url,
        config.chat.endpoint,
        config.layout.direction.as_str()
    );
    Ok(config)
}
