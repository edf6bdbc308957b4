//! Infrastructure layer
//!
//! Chat streaming, persistence and observable state.

pub mod ai;
pub mod events;
pub mod storage;
