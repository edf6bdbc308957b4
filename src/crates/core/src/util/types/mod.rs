pub mod graph;
pub mod learning;
pub mod message;

pub use graph::*;
pub use learning::*;
pub use message::*;
