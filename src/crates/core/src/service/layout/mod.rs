//! Skill-tree layout
//!
//! Layered graph layout, the adapter that applies it to tree elements, fit
//! view and the deferred action queue used to run fit view after render.

pub mod adapter;
pub mod layered;
pub mod scheduler;
pub mod viewport;

pub use adapter::{
    handle_positions, layout_elements, LayoutDirection, LayoutOptions, LayoutedElements,
    NODE_HEIGHT, NODE_WIDTH,
};
pub use layered::{LayeredGraph, LayeredGraphOptions, NodeBox, RankDir};
pub use scheduler::{DeferredQueue, INITIAL_FIT_DELAY, RELAYOUT_FIT_DELAY};
pub use viewport::{fit_bounds, fit_view, node_bounds, Bounds, FitViewOptions, Viewport};
