use super::store::{KeyValueStore, StorageChange};
use crate::infrastructure::events::Observable;
use crate::util::errors::MentoraResult;
use crate::util::types::SkillTree;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

const TREE_KEY_PREFIX: &str = "skill-tree:";
const GOAL_KEY_PREFIX: &str = "goal:";
pub const SELECTED_PROMPT_KEY: &str = "selected-prompt";
pub const SELECTED_LEARNING_PATH_KEY: &str = "selected-learning-path";

pub fn tree_key(title: &str) -> String {
    format!("{}{}", TREE_KEY_PREFIX, title)
}

pub fn goal_key(goal_id: &str) -> String {
    format!("{}{}", GOAL_KEY_PREFIX, goal_id)
}

/// Typed view over a [`KeyValueStore`] for generated trees and UI selections.
///
/// The selected prompt is also kept in an [`Observable`] shared by all clones
/// of this handle, so views can follow prompt changes without polling.
#[derive(Clone)]
pub struct SkillTreeStore {
    store: Arc<dyn KeyValueStore>,
    prompt: Arc<Observable<Option<String>>>,
}

impl SkillTreeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            prompt: Arc::new(Observable::new(None)),
        }
    }

    /// Like [`SkillTreeStore::new`], seeding the prompt observable from `store`
    pub async fn load(store: Arc<dyn KeyValueStore>) -> MentoraResult<Self> {
        let this = Self::new(store);
        let prompt = this.selected_prompt().await?;
        debug!("Loaded selected prompt: present={}", prompt.is_some());
        this.prompt.set(prompt);
        Ok(this)
    }

    pub fn inner(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> MentoraResult<Option<T>> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> MentoraResult<()> {
        self.store.set(key, serde_json::to_value(value)?).await
    }

    pub async fn save_tree(&self, tree: &SkillTree) -> MentoraResult<()> {
        debug!(
            "Saving skill tree: title={}, nodes={}, edges={}",
            tree.title,
            tree.nodes.len(),
            tree.edges.len()
        );
        self.set_typed(&tree_key(&tree.title), tree).await
    }

    pub async fn load_tree(&self, title: &str) -> MentoraResult<Option<SkillTree>> {
        self.get_typed(&tree_key(title)).await
    }

    pub async fn save_goal(&self, goal_id: &str, tree: &SkillTree) -> MentoraResult<()> {
        self.set_typed(&goal_key(goal_id), tree).await
    }

    pub async fn load_goal(&self, goal_id: &str) -> MentoraResult<Option<SkillTree>> {
        self.get_typed(&goal_key(goal_id)).await
    }

    pub async fn remove_goal(&self, goal_id: &str) -> MentoraResult<()> {
        self.store.remove(&goal_key(goal_id)).await
    }

    pub async fn set_selected_prompt(&self, prompt: &str) -> MentoraResult<()> {
        self.store
            .set(SELECTED_PROMPT_KEY, Value::String(prompt.to_string()))
            .await?;
        self.prompt.set(Some(prompt.to_string()));
        Ok(())
    }

    pub async fn selected_prompt(&self) -> MentoraResult<Option<String>> {
        self.get_typed(SELECTED_PROMPT_KEY).await
    }

    pub async fn set_selected_learning_path(&self, name: &str) -> MentoraResult<()> {
        self.store
            .set(SELECTED_LEARNING_PATH_KEY, Value::String(name.to_string()))
            .await
    }

    pub async fn selected_learning_path(&self) -> MentoraResult<Option<String>> {
        self.get_typed(SELECTED_LEARNING_PATH_KEY).await
    }

    /// Last prompt set through this handle or its clones
    pub fn current_prompt(&self) -> Option<String> {
        self.prompt.get()
    }

    pub fn watch_selected_prompt(&self) -> watch::Receiver<Option<String>> {
        self.prompt.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.store.subscribe()
    }
}
