//! Storage system
//!
//! Injected key-value persistence with a change feed.

pub mod persistence;
pub mod skill_tree_store;
pub mod store;

pub use persistence::JsonFileStore;
pub use skill_tree_store::SkillTreeStore;
pub use store::{KeyValueStore, MemoryStore, StorageChange};
