use super::learning::{QuizQuestion, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Side of a node where an edge attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlePosition {
    Top,
    Bottom,
    Left,
    Right,
}

/// Payload carried by a skill-tree node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub quiz_questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub related_harder_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub data: NodeData,
    /// Top-left corner, written by the layout pass
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandlePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandlePosition>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            node_type: None,
            data: NodeData {
                topic: label.clone(),
                label,
                ..Default::default()
            },
            position: Position::default(),
            source_position: None,
            target_position: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.data.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: default_edge_id(&source, &target),
            source,
            target,
        }
    }
}

pub fn default_edge_id(source: &str, target: &str) -> String {
    format!("e{}-{}", source, target)
}

/// Generated learning roadmap as returned by the skill-tree endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillTree {
    #[serde(default)]
    pub title: String,
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl SkillTree {
    /// Fill in edge ids and a missing title after deserialization.
    pub fn normalize(mut self) -> Self {
        for edge in &mut self.edges {
            if edge.id.is_empty() {
                edge.id = default_edge_id(&edge.source, &edge.target);
            }
        }
        if self.title.trim().is_empty() {
            if let Some(root) = self.root() {
                self.title = root.label().to_string();
            }
        }
        self
    }

    /// First node with no incoming edge, falling back to the first node
    pub fn root(&self) -> Option<&GraphNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .find(|n| !targets.contains(n.id.as_str()))
            .or_else(|| self.nodes.first())
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose source or target is not a node of this tree
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }

    /// Ids that occur on more than one node
    pub fn duplicate_node_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) && !duplicates.contains(&node.id.as_str()) {
                duplicates.push(node.id.as_str());
            }
        }
        duplicates
    }
}
