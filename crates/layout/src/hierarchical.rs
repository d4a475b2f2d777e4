//! Layered (Sugiyama style) initial placement.
//!
//! The layering itself is delegated to a [`LayeredLayout`] strategy; [`layout_in_place`]
//! is the adapter the graph engine calls. It validates the input, runs the strategy and
//! writes a pinned position back to every node, defaulting unplaced nodes to the origin.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{LayoutError, LayoutInput, LayoutNode, PlacedNode, Position, Result};

/// Direction in which successive layers are stacked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    #[default]
    LeftToRight,
    TopToBottom,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchicalLayoutConfig {
    pub direction: LayoutDirection,
    /// Gap between nodes, between layers and between edges.
    pub spacing: f64,
}

impl Default for HierarchicalLayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::LeftToRight,
            spacing: 80.0,
        }
    }
}

/// An external layered-graph layout algorithm.
///
/// `links` hold node ids; links whose ends are unknown are ignored. The result may omit
/// nodes the algorithm could not place.
pub trait LayeredLayout {
    fn compute(&self, nodes: &[LayoutInput], links: &[(String, String)]) -> Result<Vec<PlacedNode>>;
}

/// Runs `layout` and pins every node to its computed position.
pub fn layout_in_place<N: LayoutNode>(
    nodes: &mut [N],
    links: &[(String, String)],
    layout: &dyn LayeredLayout,
) -> Result<()> {
    let inputs: Vec<LayoutInput> = nodes
        .iter()
        .map(|n| LayoutInput {
            id: n.id().to_string(),
            size: n.size(),
            hint: n.fixed_position(),
        })
        .collect();

    let placed = place(&inputs, links, layout)?;
    let by_id: HashMap<&str, Position> = placed
        .iter()
        .map(|p| (p.id.as_str(), Position::new(p.fx, p.fy)))
        .collect();

    for node in nodes.iter_mut() {
        let pos = by_id.get(node.id()).copied().unwrap_or_default();
        node.set_fixed_position(pos);
    }
    Ok(())
}

/// Like [`layout_in_place`] but on plain inputs; every input id is present in the output.
pub fn place(
    inputs: &[LayoutInput],
    links: &[(String, String)],
    layout: &dyn LayeredLayout,
) -> Result<Vec<PlacedNode>> {
    if inputs.is_empty() {
        return Err(LayoutError::EmptyGraph);
    }
    let placed = layout.compute(inputs, links)?;
    let by_id: HashMap<&str, &PlacedNode> = placed.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut missing = 0usize;
    let out = inputs
        .iter()
        .map(|input| match by_id.get(input.id.as_str()) {
            Some(p) => (*p).clone(),
            None => {
                missing += 1;
                PlacedNode {
                    id: input.id.clone(),
                    fx: 0.0,
                    fy: 0.0,
                }
            }
        })
        .collect();
    if missing > 0 {
        warn!(missing, "layered layout left nodes unplaced, pinning them at the origin");
    }
    Ok(out)
}

/// Layered layout backed by `dagre-rs`.
///
/// Connected components are not separated: dagre ranks every component into the same
/// layers, so disconnected subgraphs interleave instead of being packed side by side.
#[derive(Clone, Debug, Default)]
pub struct DagreLayered {
    pub config: HierarchicalLayoutConfig,
}

impl DagreLayered {
    pub fn new(config: HierarchicalLayoutConfig) -> Self {
        Self { config }
    }
}

impl LayeredLayout for DagreLayered {
    fn compute(&self, nodes: &[LayoutInput], links: &[(String, String)]) -> Result<Vec<PlacedNode>> {
        use dagre_rs::{DagreLayout, LayoutOptions, RankDir};
        use petgraph::Graph as PetGraph;

        if nodes.is_empty() {
            return Err(LayoutError::EmptyGraph);
        }
        let transpose = self.config.direction == LayoutDirection::LeftToRight;

        // Hinted nodes go first, ordered along the in-layer axis, so the initial layer
        // order follows the previous arrangement.
        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by(|&a, &b| {
            let key = |i: usize| {
                nodes[i]
                    .hint
                    .map(|h| if transpose { h.y } else { h.x })
                    .unwrap_or(f64::INFINITY)
            };
            key(a).total_cmp(&key(b))
        });

        let mut pg: PetGraph<usize, ()> = PetGraph::new();
        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for &i in &order {
            let idx = pg.add_node(i);
            index_by_id.insert(nodes[i].id.as_str(), idx);
        }
        let mut edge_count = 0usize;
        for (source, target) in links {
            if let (Some(&s), Some(&t)) = (
                index_by_id.get(source.as_str()),
                index_by_id.get(target.as_str()),
            ) {
                pg.add_edge(s, t, ());
                edge_count += 1;
            }
        }

        let max_width = nodes.iter().map(|n| n.size.width).fold(0.0f64, f64::max);
        let max_height = nodes.iter().map(|n| n.size.height).fold(0.0f64, f64::max);
        let spacing = self.config.spacing;
        // Layers run along dagre's y axis; for left-to-right the axes are swapped after.
        let (node_sep, rank_sep) = if transpose {
            (max_height + spacing, max_width + spacing)
        } else {
            (max_width + spacing, max_height + spacing)
        };

        let options = LayoutOptions {
            rank_dir: RankDir::TopToBottom,
            node_sep: node_sep as f32,
            rank_sep: rank_sep as f32,
            ..Default::default()
        };
        debug!(
            nodes = nodes.len(),
            edges = edge_count,
            node_sep,
            rank_sep,
            "running dagre layout"
        );
        let result = DagreLayout::with_options(options).compute(&pg);
        if result.node_positions.is_empty() {
            return Err(LayoutError::LayoutFailure(format!(
                "dagre returned no positions for {} nodes",
                nodes.len()
            )));
        }

        let mut placed = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(idx) = index_by_id.get(node.id.as_str()) else {
                continue;
            };
            if let Some(&(x, y)) = result.node_positions.get(idx) {
                let (x, y) = (x as f64, y as f64);
                let (fx, fy) = if transpose { (y, x) } else { (x, y) };
                placed.push(PlacedNode {
                    id: node.id.clone(),
                    fx,
                    fy,
                });
            }
        }

        // Anchor the drawing at the origin
        let min_x = placed.iter().map(|p| p.fx).fold(f64::INFINITY, f64::min);
        let min_y = placed.iter().map(|p| p.fy).fold(f64::INFINITY, f64::min);
        for p in &mut placed {
            p.fx -= min_x;
            p.fy -= min_y;
        }
        Ok(placed)
    }
}
