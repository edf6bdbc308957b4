//! Skill-tree view controller
//!
//! Owns the laid-out elements, the layout direction and the viewport. Every
//! replacement of the element set re-runs layout and queues a fit view that
//! the front end releases with [`SkillTreeView::commit_render`] once it has
//! drawn the new positions.

use crate::infrastructure::storage::SkillTreeStore;
use crate::service::layout::{
    fit_view, layout_elements, DeferredQueue, FitViewOptions, LayoutDirection, LayoutOptions,
    Viewport, INITIAL_FIT_DELAY, RELAYOUT_FIT_DELAY,
};
use crate::util::errors::{MentoraError, MentoraResult};
use crate::util::types::{GraphEdge, GraphNode, SkillTree};
use indexmap::IndexMap;
use log::{debug, info};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    FitView,
}

pub struct SkillTreeView {
    layout: LayoutOptions,
    fit: FitViewOptions,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    viewport: Viewport,
    screen: (f64, f64),
    deferred: DeferredQueue<ViewAction>,
    learning_paths: IndexMap<String, SkillTree>,
    selected_path: Option<String>,
    store: Option<SkillTreeStore>,
}

impl SkillTreeView {
    pub fn new(layout: LayoutOptions, fit: FitViewOptions, screen: (f64, f64)) -> Self {
        Self {
            layout,
            fit,
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            screen,
            deferred: DeferredQueue::new(),
            learning_paths: IndexMap::new(),
            selected_path: None,
            store: None,
        }
    }

    /// Persist the selected learning path through `store`
    pub fn with_store(mut self, store: SkillTreeStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn direction(&self) -> LayoutDirection {
        self.layout.direction
    }

    pub fn selected_learning_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    pub fn learning_path_names(&self) -> impl Iterator<Item = &str> {
        self.learning_paths.keys().map(|k| k.as_str())
    }

    pub fn has_pending_actions(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.deferred.next_due()
    }

    /// First layout of a freshly opened view; the fit waits for the first paint
    pub fn load_initial(&mut self, tree: &SkillTree, now: Instant) -> MentoraResult<()> {
        self.apply_elements(&tree.nodes, &tree.edges, INITIAL_FIT_DELAY, now)
    }

    /// Replace the whole element set
    pub fn replace_elements(
        &mut self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        now: Instant,
    ) -> MentoraResult<()> {
        self.apply_elements(nodes, edges, RELAYOUT_FIT_DELAY, now)
    }

    /// Re-run layout of the current elements in another direction
    pub fn set_direction(&mut self, direction: LayoutDirection, now: Instant) -> MentoraResult<()> {
        self.layout.direction = direction;
        let nodes = self.nodes.clone();
        let edges = self.edges.clone();
        self.apply_elements(&nodes, &edges, RELAYOUT_FIT_DELAY, now)
    }

    fn apply_elements(
        &mut self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
        fit_delay: Duration,
        now: Instant,
    ) -> MentoraResult<()> {
        let laid_out = layout_elements(nodes, edges, &self.layout)?;
        self.nodes = laid_out.nodes;
        self.edges = laid_out.edges;
        self.deferred.schedule(ViewAction::FitView, fit_delay, now);
        Ok(())
    }

    pub fn add_learning_path(&mut self, name: impl Into<String>, tree: SkillTree) {
        self.learning_paths.insert(name.into(), tree);
    }

    /// Show the named learning path and remember the choice
    pub async fn select_learning_path(&mut self, name: &str, now: Instant) -> MentoraResult<()> {
        let tree = self
            .learning_paths
            .get(name)
            .cloned()
            .ok_or_else(|| MentoraError::NotFound(format!("learning path '{}'", name)))?;

        self.replace_elements(&tree.nodes, &tree.edges, now)?;
        self.selected_path = Some(name.to_string());
        if let Some(store) = &self.store {
            store.set_selected_learning_path(name).await?;
        }

        info!(
            "Selected learning path: name={}, nodes={}",
            name,
            self.nodes.len()
        );
        Ok(())
    }

    /// Re-select the persisted learning path, if it is still known
    pub async fn restore_selection(&mut self, now: Instant) -> MentoraResult<Option<String>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let Some(name) = store.selected_learning_path().await? else {
            return Ok(None);
        };
        if !self.learning_paths.contains_key(&name) {
            debug!("Persisted learning path no longer available: name={}", name);
            return Ok(None);
        }
        self.select_learning_path(&name, now).await?;
        Ok(Some(name))
    }

    /// Add a user-drawn edge; positions are left as they are
    pub fn connect(&mut self, source: &str, target: &str) -> bool {
        let known = |id: &str| self.nodes.iter().any(|n| n.id == id);
        if !known(source) || !known(target) {
            return false;
        }
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return false;
        }
        self.edges.push(GraphEdge::new(source, target));
        true
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.screen = (width, height);
    }

    /// Called after the front end has drawn; runs every due deferred action
    pub fn commit_render(&mut self, now: Instant) -> usize {
        let due = self.deferred.drain_due(now);
        let count = due.len();
        for action in due {
            match action {
                ViewAction::FitView => self.fit_to_content(),
            }
        }
        count
    }

    fn fit_to_content(&mut self) {
        match fit_view(
            &self.nodes,
            self.layout.node_width,
            self.layout.node_height,
            self.screen,
            &self.fit,
        ) {
            Some(viewport) => {
                debug!(
                    "Fit view: zoom={:.3}, x={:.1}, y={:.1}",
                    viewport.zoom, viewport.x, viewport.y
                );
                self.viewport = viewport;
            }
            None => debug!("Fit view skipped: no nodes"),
        }
    }
}
