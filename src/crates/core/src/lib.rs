// Mentora Core Library - client core of the learning platform
// Four-layer architecture: Util -> Infrastructure -> Service -> Agentic

pub mod agentic; // Conversation with the mentor agent
pub mod infrastructure; // Chat streaming, storage, observable state
pub mod service; // Config, skill-tree layout and generation, quizzes
pub mod util; // Errors and shared types

// Export main types
pub use util::errors::*;
pub use util::types::*;

// Export infrastructure components
pub use infrastructure::ai::{
    ChatClient, ChatRequest, ChatStreamDecoder, ChatStreamEvent, ChatTransport,
};
pub use infrastructure::events::Observable;
pub use infrastructure::storage::{
    JsonFileStore, KeyValueStore, MemoryStore, SkillTreeStore, StorageChange,
};

// Export service layer components
pub use service::config::AppConfig;
pub use service::layout::{layout_elements, LayoutDirection, LayoutOptions};
pub use service::quiz::{QuizResults, QuizSession, QuizStep};
pub use service::skill_tree::{SkillTreeClient, SkillTreeGenerator, SkillTreeView};

// Export agentic components
pub use agentic::{ChatSession, Conversation};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CORE_NAME: &str = "Mentora Core";
