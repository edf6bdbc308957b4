//! Service layer
//!
//! Configuration, skill-tree layout and generation, quizzes.

pub mod config;
pub mod layout;
pub mod quiz;
pub mod skill_tree;
