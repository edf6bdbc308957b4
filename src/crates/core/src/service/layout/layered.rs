//! Layered (Sugiyama-style) graph layout
//!
//! Same contract as the browser layout library the skill-tree view was built
//! on: register nodes with their box size, register edges, run [`LayeredGraph::layout`],
//! then read back the center coordinate of every node.
//!
//! Phases:
//! 1. break cycles by reversing DFS back edges
//! 2. rank by longest path from the roots
//! 3. split long edges with zero-size dummy nodes
//! 4. order each rank with barycenter sweeps, keeping the fewest crossings
//! 5. assign coordinates: stack ranks, separate nodes, relax toward neighbours

use crate::util::errors::{MentoraError, MentoraResult};
use indexmap::IndexMap;
use log::{debug, trace};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const ORDER_SWEEPS: usize = 24;
const COORDINATE_PASSES: usize = 8;

/// Flow direction of the ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RankDir {
    #[default]
    TB,
    BT,
    LR,
    RL,
}

impl RankDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TB" => Some(RankDir::TB),
            "BT" => Some(RankDir::BT),
            "LR" => Some(RankDir::LR),
            "RL" => Some(RankDir::RL),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RankDir::TB => "TB",
            RankDir::BT => "BT",
            RankDir::LR => "LR",
            RankDir::RL => "RL",
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, RankDir::LR | RankDir::RL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayeredGraphOptions {
    pub rankdir: RankDir,
    /// Gap between neighbouring nodes of one rank
    pub nodesep: f64,
    /// Gap next to dummy nodes of long edges
    pub edgesep: f64,
    /// Gap between ranks
    pub ranksep: f64,
    pub marginx: f64,
    pub marginy: f64,
}

impl Default for LayeredGraphOptions {
    fn default() -> Self {
        Self {
            rankdir: RankDir::TB,
            nodesep: 50.0,
            edgesep: 10.0,
            ranksep: 50.0,
            marginx: 0.0,
            marginy: 0.0,
        }
    }
}

/// Node box; `x`/`y` hold the center after layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub rank: usize,
}

impl NodeBox {
    fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            x: 0.0,
            y: 0.0,
            rank: 0,
        }
    }
}

/// Directed graph keyed by string id, laid out in ranks
#[derive(Debug, Clone, Default)]
pub struct LayeredGraph {
    options: LayeredGraphOptions,
    graph: DiGraph<NodeBox, ()>,
    index: IndexMap<String, NodeIndex>,
}

/// Working node of the ordering/coordinate phases (real or dummy)
#[derive(Debug, Clone, Copy)]
struct LayerNode {
    /// Extent across the rank axis
    breadth: f64,
    /// Extent along the rank axis
    depth: f64,
    rank: usize,
    dummy: bool,
}

impl LayeredGraph {
    pub fn new(options: LayeredGraphOptions) -> Self {
        Self {
            options,
            graph: DiGraph::new(),
            index: IndexMap::new(),
        }
    }

    pub fn options(&self) -> &LayeredGraphOptions {
        &self.options
    }

    /// Register a node, or resize it if it exists
    pub fn set_node(&mut self, id: &str, width: f64, height: f64) {
        match self.index.get(id) {
            Some(&idx) => {
                self.graph[idx] = NodeBox::sized(width, height);
            }
            None => {
                let idx = self.graph.add_node(NodeBox::sized(width, height));
                self.index.insert(id.to_string(), idx);
            }
        }
    }

    /// Register an edge. Unknown endpoints are added as zero-size nodes.
    pub fn set_edge(&mut self, source: &str, target: &str) {
        let source_idx = self.ensure_node(source);
        let target_idx = self.ensure_node(target);
        self.graph.update_edge(source_idx, target_idx, ());
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        trace!("Implicitly registering node referenced by edge: id={}", id);
        let idx = self.graph.add_node(NodeBox::sized(0.0, 0.0));
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn node(&self, id: &str) -> Option<&NodeBox> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node ids in registration order
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|k| k.as_str())
    }

    /// Compute ranks and center coordinates for every node
    pub fn layout(&mut self) -> MentoraResult<()> {
        let n = self.graph.node_count();
        if n == 0 {
            return Ok(());
        }

        let dag_edges = self.acyclic_edges();
        let ranks = longest_path_ranks(n, &dag_edges)?;

        let horizontal = self.options.rankdir.is_horizontal();
        let mut nodes: Vec<LayerNode> = self
            .graph
            .node_indices()
            .map(|idx| {
                let b = &self.graph[idx];
                let (breadth, depth) = if horizontal {
                    (b.height, b.width)
                } else {
                    (b.width, b.height)
                };
                LayerNode {
                    breadth,
                    depth,
                    rank: ranks[idx.index()],
                    dummy: false,
                }
            })
            .collect();

        let segments = split_long_edges(&mut nodes, &dag_edges);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        let mut succs: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for &(u, v) in &segments {
            succs[u].push(v);
            preds[v].push(u);
        }

        let layers = initial_order(&nodes, &succs);
        let layers = minimize_crossings(layers, &preds, &succs);
        let cross = assign_cross_axis(&nodes, &layers, &preds, &succs, &self.options);
        let along = assign_rank_axis(&nodes, &layers, &self.options);

        let (along_min, along_max) = extent(&nodes, &along, |node| node.depth);
        let mirrored = matches!(self.options.rankdir, RankDir::BT | RankDir::RL);

        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            let i = idx.index();
            let c = cross[i];
            let a = if mirrored {
                along_min + along_max - along[i]
            } else {
                along[i]
            };

            let node = &mut self.graph[idx];
            node.rank = ranks[i];
            if horizontal {
                node.x = a;
                node.y = c;
            } else {
                node.x = c;
                node.y = a;
            }
        }

        debug!(
            "Layered layout finished: nodes={}, edges={}, ranks={}, rankdir={}",
            n,
            self.graph.edge_count(),
            layers.len(),
            self.options.rankdir.as_str()
        );
        Ok(())
    }

    /// Edge list with DFS back edges reversed and self-loops dropped
    fn acyclic_edges(&self) -> Vec<(usize, usize)> {
        let n = self.graph.node_count();
        let mut out: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in self.graph.edge_references() {
            let (u, v) = (edge.source().index(), edge.target().index());
            if u != v {
                out[u].push(v);
            }
        }

        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state = vec![0u8; n];
        let mut reversed: HashSet<(usize, usize)> = HashSet::new();
        for start in 0..n {
            if state[start] != 0 {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            state[start] = 1;
            while let Some(top) = stack.last_mut() {
                let u = top.0;
                if top.1 < out[u].len() {
                    let v = out[u][top.1];
                    top.1 += 1;
                    match state[v] {
                        0 => {
                            state[v] = 1;
                            stack.push((v, 0));
                        }
                        1 => {
                            reversed.insert((u, v));
                        }
                        _ => {}
                    }
                } else {
                    state[u] = 2;
                    stack.pop();
                }
            }
        }

        if !reversed.is_empty() {
            debug!("Reversing {} edge(s) to break cycles", reversed.len());
        }

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for (u, targets) in out.iter().enumerate() {
            for &v in targets {
                let edge = if reversed.contains(&(u, v)) { (v, u) } else { (u, v) };
                if seen.insert(edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }
}

fn longest_path_ranks(n: usize, edges: &[(usize, usize)]) -> MentoraResult<Vec<usize>> {
    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(n, edges.len());
    for _ in 0..n {
        dag.add_node(());
    }
    for &(u, v) in edges {
        dag.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
    }

    let order = toposort(&dag, None).map_err(|cycle| {
        MentoraError::Layout(format!(
            "cycle remained at node index {}",
            cycle.node_id().index()
        ))
    })?;

    let mut ranks = vec![0usize; n];
    for idx in order {
        let rank = ranks[idx.index()];
        for succ in dag.neighbors(idx) {
            let r = &mut ranks[succ.index()];
            *r = (*r).max(rank + 1);
        }
    }
    Ok(ranks)
}

/// Replace edges spanning several ranks by chains through dummy nodes
fn split_long_edges(nodes: &mut Vec<LayerNode>, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut segments = Vec::with_capacity(edges.len());
    for &(u, v) in edges {
        let (ru, rv) = (nodes[u].rank, nodes[v].rank);
        let mut prev = u;
        for rank in (ru + 1)..rv {
            nodes.push(LayerNode {
                breadth: 0.0,
                depth: 0.0,
                rank,
                dummy: true,
            });
            let dummy = nodes.len() - 1;
            segments.push((prev, dummy));
            prev = dummy;
        }
        segments.push((prev, v));
    }
    segments
}

/// Order ranks by DFS discovery so siblings start next to each other
fn initial_order(nodes: &[LayerNode], succs: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let max_rank = nodes.iter().map(|n| n.rank).max().unwrap_or(0);
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
    let mut visited = vec![false; nodes.len()];

    let mut starts: Vec<usize> = (0..nodes.len()).collect();
    starts.sort_by_key(|&i| (nodes[i].rank, i));

    for start in starts {
        if visited[start] {
            continue;
        }
        let mut stack = vec![start];
        while let Some(u) = stack.pop() {
            if visited[u] {
                continue;
            }
            visited[u] = true;
            layers[nodes[u].rank].push(u);
            for &v in succs[u].iter().rev() {
                if !visited[v] {
                    stack.push(v);
                }
            }
        }
    }
    layers
}

fn positions(layers: &[Vec<usize>], node_count: usize) -> Vec<usize> {
    let mut pos = vec![0usize; node_count];
    for layer in layers {
        for (i, &v) in layer.iter().enumerate() {
            pos[v] = i;
        }
    }
    pos
}

fn count_crossings(layers: &[Vec<usize>], succs: &[Vec<usize>], node_count: usize) -> usize {
    let pos = positions(layers, node_count);
    let mut crossings = 0;
    for layer in layers.iter().take(layers.len().saturating_sub(1)) {
        let segments: Vec<(usize, usize)> = layer
            .iter()
            .flat_map(|&u| succs[u].iter().map(move |&v| (u, v)))
            .map(|(u, v)| (pos[u], pos[v]))
            .collect();
        for (i, a) in segments.iter().enumerate() {
            for b in &segments[i + 1..] {
                if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

fn barycenter_sweep(layers: &mut [Vec<usize>], neighbours: &[Vec<usize>], downward: bool, node_count: usize) {
    let rank_count = layers.len();
    let ranks: Vec<usize> = if downward {
        (1..rank_count).collect()
    } else {
        (0..rank_count.saturating_sub(1)).rev().collect()
    };

    for r in ranks {
        let pos = positions(layers, node_count);
        let mut keyed: Vec<(f64, usize)> = layers[r]
            .iter()
            .map(|&v| {
                let adjacent = &neighbours[v];
                let key = if adjacent.is_empty() {
                    pos[v] as f64
                } else {
                    adjacent.iter().map(|&u| pos[u] as f64).sum::<f64>() / adjacent.len() as f64
                };
                (key, v)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        layers[r] = keyed.into_iter().map(|(_, v)| v).collect();
    }
}

fn minimize_crossings(
    mut layers: Vec<Vec<usize>>,
    preds: &[Vec<usize>],
    succs: &[Vec<usize>],
) -> Vec<Vec<usize>> {
    let node_count = preds.len();
    let mut best = layers.clone();
    let mut best_crossings = count_crossings(&layers, succs, node_count);

    for sweep in 0..ORDER_SWEEPS {
        if best_crossings == 0 {
            break;
        }
        if sweep % 2 == 0 {
            barycenter_sweep(&mut layers, preds, true, node_count);
        } else {
            barycenter_sweep(&mut layers, succs, false, node_count);
        }
        let crossings = count_crossings(&layers, succs, node_count);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = layers.clone();
        }
    }

    trace!("Crossing minimization done: crossings={}", best_crossings);
    best
}

fn min_separation(a: &LayerNode, b: &LayerNode, options: &LayeredGraphOptions) -> f64 {
    let gap = if a.dummy || b.dummy {
        options.edgesep
    } else {
        options.nodesep
    };
    (a.breadth + b.breadth) / 2.0 + gap
}

/// Positions across the rank axis (x for TB layouts)
fn assign_cross_axis(
    nodes: &[LayerNode],
    layers: &[Vec<usize>],
    preds: &[Vec<usize>],
    succs: &[Vec<usize>],
    options: &LayeredGraphOptions,
) -> Vec<f64> {
    let mut coord = vec![0.0f64; nodes.len()];

    for layer in layers {
        let mut cursor = 0.0;
        for (i, &v) in layer.iter().enumerate() {
            if i == 0 {
                cursor = nodes[v].breadth / 2.0;
            } else {
                cursor += min_separation(&nodes[layer[i - 1]], &nodes[v], options);
            }
            coord[v] = cursor;
        }
    }

    for pass in 0..COORDINATE_PASSES {
        let (neighbours, order): (&[Vec<usize>], Vec<usize>) = if pass % 2 == 0 {
            (succs, (0..layers.len()).rev().collect())
        } else {
            (preds, (0..layers.len()).collect())
        };

        for r in order {
            let layer = &layers[r];
            if layer.is_empty() {
                continue;
            }
            let desired: Vec<f64> = layer
                .iter()
                .map(|&v| {
                    let adjacent = &neighbours[v];
                    if adjacent.is_empty() {
                        coord[v]
                    } else {
                        adjacent.iter().map(|&u| coord[u]).sum::<f64>() / adjacent.len() as f64
                    }
                })
                .collect();

            // Two feasible placements (pushed right, pushed left); their mean
            // keeps every separation constraint.
            let mut left = desired.clone();
            for i in 1..layer.len() {
                let sep = min_separation(&nodes[layer[i - 1]], &nodes[layer[i]], options);
                left[i] = left[i].max(left[i - 1] + sep);
            }
            let mut right = desired;
            for i in (0..layer.len().saturating_sub(1)).rev() {
                let sep = min_separation(&nodes[layer[i]], &nodes[layer[i + 1]], options);
                right[i] = right[i].min(right[i + 1] - sep);
            }
            for (i, &v) in layer.iter().enumerate() {
                coord[v] = (left[i] + right[i]) / 2.0;
            }
        }
    }

    let min_edge = nodes
        .iter()
        .zip(&coord)
        .map(|(node, c)| c - node.breadth / 2.0)
        .fold(f64::INFINITY, f64::min);
    let shift = options.marginx - if min_edge.is_finite() { min_edge } else { 0.0 };
    coord.iter_mut().for_each(|c| *c += shift);
    coord
}

/// Positions along the rank axis (y for TB layouts)
fn assign_rank_axis(nodes: &[LayerNode], layers: &[Vec<usize>], options: &LayeredGraphOptions) -> Vec<f64> {
    let mut coord = vec![0.0f64; nodes.len()];
    let mut offset = options.marginy;
    for layer in layers {
        let depth = layer.iter().map(|&v| nodes[v].depth).fold(0.0, f64::max);
        for &v in layer {
            coord[v] = offset + depth / 2.0;
        }
        offset += depth + options.ranksep;
    }
    coord
}

fn extent<F>(nodes: &[LayerNode], coord: &[f64], size: F) -> (f64, f64)
where
    F: Fn(&LayerNode) -> f64,
{
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (node, &c) in nodes.iter().zip(coord) {
        min = min.min(c - size(node) / 2.0);
        max = max.max(c + size(node) / 2.0);
    }
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 0.0)
    }
}
