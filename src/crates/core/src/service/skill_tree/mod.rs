//! Skill trees: generation client, local generator and the view controller

pub mod client;
pub mod generator;
pub mod view;

pub use client::SkillTreeClient;
pub use generator::{SkillTreeGenerator, TopicData};
pub use view::{SkillTreeView, ViewAction};
