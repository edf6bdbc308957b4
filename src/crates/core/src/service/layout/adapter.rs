//! Skill-tree layout adapter
//!
//! Feeds tree nodes and edges into the layered engine and writes the results
//! back as top-left positions plus handle hints for the renderer.

use super::layered::{LayeredGraph, LayeredGraphOptions, RankDir};
use crate::util::errors::MentoraResult;
use crate::util::types::{GraphEdge, GraphNode, HandlePosition, Position};
use log::debug;
use serde::{Deserialize, Serialize};

pub const NODE_WIDTH: f64 = 172.0;
pub const NODE_HEIGHT: f64 = 36.0;

pub type LayoutDirection = RankDir;

/// Source and target handle sides for a direction, as `(source, target)`
pub fn handle_positions(direction: LayoutDirection) -> (HandlePosition, HandlePosition) {
    match direction {
        RankDir::TB | RankDir::BT => (HandlePosition::Bottom, HandlePosition::Top),
        RankDir::LR | RankDir::RL => (HandlePosition::Right, HandlePosition::Left),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    pub nodesep: f64,
    pub ranksep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TB,
            node_width: NODE_WIDTH,
            node_height: NODE_HEIGHT,
            nodesep: 50.0,
            ranksep: 50.0,
        }
    }
}

impl LayoutOptions {
    pub fn with_direction(direction: LayoutDirection) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutedElements {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Lay out `nodes`/`edges`, returning copies with positions and handles set.
///
/// Node and edge identity, order and count are preserved.
pub fn layout_elements(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    options: &LayoutOptions,
) -> MentoraResult<LayoutedElements> {
    let mut graph = LayeredGraph::new(LayeredGraphOptions {
        rankdir: options.direction,
        nodesep: options.nodesep,
        ranksep: options.ranksep,
        ..Default::default()
    });

    for node in nodes {
        graph.set_node(&node.id, options.node_width, options.node_height);
    }
    for edge in edges {
        graph.set_edge(&edge.source, &edge.target);
    }
    graph.layout()?;

    let (source_position, target_position) = handle_positions(options.direction);
    let laid_out = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(placed) = graph.node(&node.id) {
                node.position = Position::new(
                    placed.x - options.node_width / 2.0,
                    placed.y - options.node_height / 2.0,
                );
            }
            node.source_position = Some(source_position);
            node.target_position = Some(target_position);
            node
        })
        .collect();

    debug!(
        "Laid out skill tree: nodes={}, edges={}, direction={}",
        nodes.len(),
        edges.len(),
        options.direction.as_str()
    );

    Ok(LayoutedElements {
        nodes: laid_out,
        edges: edges.to_vec(),
    })
}
