use rustc_hash::FxHashMap;
use schemaviz_layout::{Position, Size};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A graph node and its simulation state.
///
/// `x`/`y`/`vx`/`vy` are owned by the simulation once the node is handed to the engine.
/// A pinned node (`fx`/`fy` set) is held at that position instead of being integrated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
    #[serde(default)]
    pub fx: Option<f64>,
    #[serde(default)]
    pub fy: Option<f64>,
    /// Seed position used the first time the node enters the engine
    #[serde(default)]
    pub initial_x: Option<f64>,
    #[serde(default)]
    pub initial_y: Option<f64>,
    /// Box size reported by the auto-layout sizing callback
    #[serde(skip)]
    pub size: Option<Size>,
}

impl Node {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            fx: None,
            fy: None,
            initial_x: None,
            initial_y: None,
            size: None,
        }
    }

    pub fn with_initial_position(mut self, x: f64, y: f64) -> Self {
        self.initial_x = Some(x);
        self.initial_y = Some(y);
        self
    }

    pub fn with_fixed_position(mut self, fx: f64, fy: f64) -> Self {
        self.fx = Some(fx);
        self.fy = Some(fy);
        self
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Both coordinates pinned
    pub fn is_fixed(&self) -> bool {
        self.fx.is_some() && self.fy.is_some()
    }

    pub fn pin(&mut self, pos: Position) {
        self.fx = Some(pos.x);
        self.fy = Some(pos.y);
    }

    pub fn pin_here(&mut self) {
        self.fx = Some(self.x);
        self.fy = Some(self.y);
    }
}

/// Nodes in insertion order with O(1) lookup by id.
#[derive(Clone, Debug, Default)]
pub struct NodeSet {
    nodes: Vec<Node>,
    index: FxHashMap<String, usize>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from `nodes`; repeated ids keep their first occurrence.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut set = Self::new();
        for node in nodes {
            if set.index.contains_key(&node.id) {
                warn!(id = %node.id, "dropping node with duplicate id");
                continue;
            }
            set.index.insert(node.id.clone(), set.nodes.len());
            set.nodes.push(node);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index_of(id).map(|i| &mut self.nodes[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn as_mut_slice(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }
}

impl std::ops::Index<usize> for NodeSet {
    type Output = Node;

    fn index(&self, index: usize) -> &Node {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
