//! Configuration service

pub mod loader;
pub mod types;

pub use loader::{apply_env_overrides, default_config_path, load, load_from_file, load_from_str};
pub use types::{AppConfig, ChatConfig, SkillTreeConfig, StorageConfig};
