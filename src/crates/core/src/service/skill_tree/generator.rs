//! Flattens a nested topic document into skill-tree nodes and edges

use crate::util::types::{GraphEdge, GraphNode, NodeData, Position, QuizQuestion, Resource, SkillTree};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const ROOT_NODE_TYPE: &str = "input";
pub const CHILD_NODE_TYPE: &str = "default";

/// One topic of the generated curriculum, with its subtopics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicData {
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
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TopicData>,
}

#[derive(Debug, Clone, Copy)]
pub struct SkillTreeGenerator {
    max_depth: usize,
}

impl Default for SkillTreeGenerator {
    fn default() -> Self {
        Self::new(crate::service::config::types::DEFAULT_MAX_DEPTH)
    }
}

#[derive(Default)]
struct Generation {
    next_id: usize,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    seen_topics: HashSet<String>,
}

impl Generation {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

impl SkillTreeGenerator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Node ids are "1", "2", ... in depth-first order; the root is "1"
    pub fn generate(&self, root: &TopicData) -> SkillTree {
        let mut generation = Generation::default();
        self.visit(root, None, 0, &mut generation);

        debug!(
            "Generated skill tree: topic={}, nodes={}, edges={}, max_depth={}",
            root.topic,
            generation.nodes.len(),
            generation.edges.len(),
            self.max_depth
        );

        SkillTree {
            title: root.topic.clone(),
            nodes: generation.nodes,
            edges: generation.edges,
        }
    }

    fn visit(
        &self,
        topic: &TopicData,
        parent_id: Option<&str>,
        depth: usize,
        generation: &mut Generation,
    ) -> Option<String> {
        if depth >= self.max_depth {
            return None;
        }
        // A topic reachable twice is only placed once
        if !generation.seen_topics.insert(topic.topic.clone()) {
            return None;
        }

        let node_id = generation.allocate_id();
        generation.nodes.push(GraphNode {
            id: node_id.clone(),
            node_type: Some(
                if parent_id.is_none() { ROOT_NODE_TYPE } else { CHILD_NODE_TYPE }.to_string(),
            ),
            data: NodeData {
                label: topic.topic.clone(),
                topic: topic.topic.clone(),
                resources: topic.resources.clone(),
                quiz_questions: topic.quiz_questions.clone(),
                related_harder_topics: topic.related_harder_topics.clone(),
                uuid: Some(
                    topic
                        .uuid
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                ),
                is_placeholder: false,
            },
            position: Position::default(),
            source_position: None,
            target_position: None,
        });
        if let Some(parent_id) = parent_id {
            generation.edges.push(GraphEdge::new(parent_id, node_id.as_str()));
        }

        if !topic.children.is_empty() {
            for child in &topic.children {
                self.visit(child, Some(&node_id), depth + 1, generation);
            }
        } else if depth + 1 < self.max_depth {
            for related in &topic.related_harder_topics {
                self.add_placeholder(&node_id, related, generation);
            }
        }

        Some(node_id)
    }

    fn add_placeholder(&self, parent_id: &str, topic: &str, generation: &mut Generation) {
        let placeholder_id = generation.allocate_id();
        generation.nodes.push(GraphNode {
            id: placeholder_id.clone(),
            node_type: Some(CHILD_NODE_TYPE.to_string()),
            data: NodeData {
                label: format!("{} (placeholder)", topic),
                topic: topic.to_string(),
                uuid: Some(uuid::Uuid::new_v4().to_string()),
                is_placeholder: true,
                ..Default::default()
            },
            position: Position::default(),
            source_position: None,
            target_position: None,
        });
        generation.edges.push(GraphEdge::new(parent_id, placeholder_id));
    }
}
