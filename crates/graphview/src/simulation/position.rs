use crate::link::ResolvedLink;
use crate::node::Node;

use super::{Force, Jiggle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Weak pull of every node toward `target` along one axis
#[derive(Debug)]
pub struct PositionForce {
    axis: Axis,
    target: f64,
    strength: f64,
}

impl PositionForce {
    pub fn new(axis: Axis, target: f64, strength: f64) -> Self {
        Self {
            axis,
            target,
            strength,
        }
    }
}

impl Force for PositionForce {
    fn initialize(&mut self, _nodes: &[Node], _links: &[ResolvedLink]) {}

    fn apply(&mut self, nodes: &mut [Node], alpha: f64, _jiggle: &mut Jiggle) {
        let k = self.strength * alpha;
        for node in nodes {
            match self.axis {
                Axis::X => node.vx += (self.target - node.x) * k,
                Axis::Y => node.vy += (self.target - node.y) * k,
            }
        }
    }
}
