//! Fit-view computation
//!
//! A viewport maps world coordinates to the screen as
//! `screen = world * zoom + (x, y)`.

use crate::util::types::GraphNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitViewOptions {
    /// Extra room around the content, as a fraction of its size
    pub padding: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for FitViewOptions {
    fn default() -> Self {
        Self {
            padding: 0.2,
            min_zoom: 0.5,
            max_zoom: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Bounding box of node rectangles whose top-left is `position`
pub fn node_bounds(nodes: &[GraphNode], node_width: f64, node_height: f64) -> Option<Bounds> {
    if nodes.is_empty() {
        return None;
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for node in nodes {
        min_x = min_x.min(node.position.x);
        min_y = min_y.min(node.position.y);
        max_x = max_x.max(node.position.x + node_width);
        max_y = max_y.max(node.position.y + node_height);
    }
    Some(Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

/// Viewport framing `bounds` inside a `width` x `height` screen
pub fn fit_bounds(bounds: Bounds, width: f64, height: f64, options: &FitViewOptions) -> Viewport {
    let scale = 1.0 + options.padding;
    let zoom_x = width / (bounds.width * scale);
    let zoom_y = height / (bounds.height * scale);
    let zoom = zoom_x.min(zoom_y);
    let zoom = if zoom.is_nan() {
        options.max_zoom
    } else {
        zoom.clamp(options.min_zoom, options.max_zoom)
    };

    let (cx, cy) = bounds.center();
    Viewport {
        x: width / 2.0 - cx * zoom,
        y: height / 2.0 - cy * zoom,
        zoom,
    }
}

/// Fit all nodes; `None` for an empty graph so the caller keeps its viewport
pub fn fit_view(
    nodes: &[GraphNode],
    node_width: f64,
    node_height: f64,
    screen: (f64, f64),
    options: &FitViewOptions,
) -> Option<Viewport> {
    node_bounds(nodes, node_width, node_height)
        .map(|bounds| fit_bounds(bounds, screen.0, screen.1, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::types::Position;

    fn node_at(id: &str, x: f64, y: f64) -> GraphNode {
        let mut node = GraphNode::new(id, id);
        node.position = Position::new(x, y);
        node
    }

    #[test]
    fn bounds_cover_every_rectangle() {
        let nodes = vec![node_at("a", 0.0, 0.0), node_at("b", 300.0, 100.0)];
        let bounds = node_bounds(&nodes, 172.0, 36.0).unwrap();
        assert_eq!(bounds, Bounds { x: 0.0, y: 0.0, width: 472.0, height: 136.0 });
    }

    #[test]
    fn zoom_uses_the_tighter_axis_and_centers_content() {
        let bounds = Bounds { x: 0.0, y: 0.0, width: 1000.0, height: 100.0 };
        let viewport = fit_bounds(bounds, 1200.0, 800.0, &FitViewOptions::default());

        assert!((viewport.zoom - 1.0).abs() < 1e-9);
        assert!((viewport.x - 100.0).abs() < 1e-9);
        assert!((viewport.y - 350.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_is_clamped() {
        let options = FitViewOptions::default();
        let tiny = Bounds { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        assert_eq!(fit_bounds(tiny, 1000.0, 1000.0, &options).zoom, 2.0);

        let huge = Bounds { x: 0.0, y: 0.0, width: 100_000.0, height: 100_000.0 };
        assert_eq!(fit_bounds(huge, 1000.0, 1000.0, &options).zoom, 0.5);

        let point = Bounds { x: 5.0, y: 5.0, width: 0.0, height: 0.0 };
        assert_eq!(fit_bounds(point, 0.0, 0.0, &options).zoom, 2.0);
    }

    #[test]
    fn empty_graph_has_no_fit() {
        assert!(fit_view(&[], 172.0, 36.0, (800.0, 600.0), &FitViewOptions::default()).is_none());
    }
}
