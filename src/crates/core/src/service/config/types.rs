//! Application configuration schema and validation

use crate::service::layout::{FitViewOptions, LayoutOptions};
use crate::util::errors::{MentoraError, MentoraResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_CHAT_ENDPOINT: &str = "http://localhost:3000/api/letta";
pub const DEFAULT_MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the skill-tree generation backend
    pub backend_url: String,
    pub chat: ChatConfig,
    pub skill_tree: SkillTreeConfig,
    pub layout: LayoutOptions,
    pub fit_view: FitViewOptions,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Streaming chat endpoint
    pub endpoint: String,
    pub agent_id: Option<String>,
    /// Per-chunk idle timeout; unset waits forever
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTreeConfig {
    pub max_depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON store file; unset uses the platform data directory
    pub path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            chat: ChatConfig::default(),
            skill_tree: SkillTreeConfig::default(),
            layout: LayoutOptions::default(),
            fit_view: FitViewOptions::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            agent_id: None,
            idle_timeout_secs: None,
        }
    }
}

impl Default for SkillTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ChatConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    pub fn skill_tree_endpoint(&self) -> String {
        format!("{}/generate-skill-tree", self.backend_url.trim_end_matches('/'))
    }

    /// Configured store path, else `<data_dir>/mentora/state.json`
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage
            .path
            .clone()
            .or_else(|| dirs::data_local_dir().map(|d| d.join("mentora").join("state.json")))
    }

    /// Check every constraint, reporting all violations at once
    pub fn validate(&self) -> MentoraResult<()> {
        let mut problems: Vec<String> = Vec::new();

        for (field, value) in [
            ("backend_url", &self.backend_url),
            ("chat.endpoint", &self.chat.endpoint),
        ] {
            if let Err(e) = Url::parse(value) {
                problems.push(format!("{}: invalid URL {:?}: {}", field, value, e));
            }
        }

        if let Some(agent_id) = &self.chat.agent_id {
            if agent_id.trim().is_empty() {
                problems.push("chat.agent_id: must not be blank when set".to_string());
            }
        }

        if self.chat.idle_timeout_secs == Some(0) {
            problems.push("chat.idle_timeout_secs: must be at least 1".to_string());
        }

        if self.skill_tree.max_depth == 0 {
            problems.push("skill_tree.max_depth: must be at least 1".to_string());
        }

        for (field, value) in [
            ("layout.node_width", self.layout.node_width),
            ("layout.node_height", self.layout.node_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                problems.push(format!("{}: must be positive, got {}", field, value));
            }
        }
        for (field, value) in [
            ("layout.nodesep", self.layout.nodesep),
            ("layout.ranksep", self.layout.ranksep),
            ("fit_view.padding", self.fit_view.padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                problems.push(format!("{}: must be non-negative, got {}", field, value));
            }
        }

        let fit = &self.fit_view;
        if !(fit.min_zoom > 0.0 && fit.min_zoom <= fit.max_zoom && fit.max_zoom.is_finite()) {
            problems.push(format!(
                "fit_view: need 0 < min_zoom <= max_zoom, got {}..{}",
                fit.min_zoom, fit.max_zoom
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MentoraError::Config(problems.join("; ")))
        }
    }
}
