use crate::infrastructure::ai::client::error_message_from_body;
use crate::util::errors::{MentoraError, MentoraResult};
use crate::util::types::SkillTree;
use log::{debug, error, warn};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// Client for the backend's `POST /generate-skill-tree`
#[derive(Debug, Clone)]
pub struct SkillTreeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SkillTreeClient {
    /// `endpoint` is the full generation URL, see
    /// [`AppConfig::skill_tree_endpoint`](crate::service::config::AppConfig::skill_tree_endpoint)
    pub fn new(endpoint: impl Into<String>) -> MentoraResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MentoraError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn generate(&self, prompt: &str) -> MentoraResult<SkillTree> {
        if prompt.trim().is_empty() {
            return Err(MentoraError::validation("Prompt is required"));
        }

        debug!(
            "Requesting skill tree: endpoint={}, prompt_len={}",
            self.endpoint,
            prompt.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message_from_body(&body)
                .unwrap_or_else(|| format!("Backend API error: {}", status.as_u16()));
            error!("Skill tree generation failed: status={}, message={}", status, message);
            return Err(MentoraError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let tree: SkillTree = serde_json::from_slice(&bytes)?;
        let tree = tree.normalize();

        let dangling = tree.dangling_edges().len();
        if dangling > 0 {
            warn!("Skill tree has dangling edges: title={}, count={}", tree.title, dangling);
        }
        let duplicates = tree.duplicate_node_ids();
        if !duplicates.is_empty() {
            warn!(
                "Skill tree has duplicate node ids: title={}, ids={:?}",
                tree.title, duplicates
            );
        }

        debug!(
            "Skill tree received: title={}, nodes={}, edges={}",
            tree.title,
            tree.nodes.len(),
            tree.edges.len()
        );
        Ok(tree)
    }
}
