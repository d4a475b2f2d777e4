use rustc_hash::FxHashMap;

use crate::link::ResolvedLink;
use crate::node::Node;

use super::{Force, Jiggle};

const DISTANCE_MIN2: f64 = 1.0;

/// Pairwise charge between all nodes. Positive strength attracts, negative repels.
///
/// With `distance_max` set, nodes are binned into cells of that size and only the 3x3
/// neighbourhood is visited.
#[derive(Debug)]
pub struct ManyBodyForce {
    strength: f64,
    distance_max: Option<f64>,
}

impl ManyBodyForce {
    pub fn new(strength: f64, distance_max: Option<f64>) -> Self {
        Self {
            strength,
            distance_max: distance_max.filter(|d| d.is_finite() && *d > 0.0),
        }
    }

    fn accumulate(&self, nodes: &mut [Node], i: usize, j: usize, alpha: f64, jiggle: &mut Jiggle) {
        let mut x = nodes[j].x - nodes[i].x;
        let mut y = nodes[j].y - nodes[i].y;
        let mut l = x * x + y * y;
        if self.distance_max.is_some_and(|max| l >= max * max) {
            return;
        }
        if x == 0.0 {
            x = jiggle.next();
            l += x * x;
        }
        if y == 0.0 {
            y = jiggle.next();
            l += y * y;
        }
        if l < DISTANCE_MIN2 {
            l = (DISTANCE_MIN2 * l).sqrt();
        }
        let w = self.strength * alpha / l;
        nodes[i].vx += x * w;
        nodes[i].vy += y * w;
    }
}

impl Force for ManyBodyForce {
    fn initialize(&mut self, _nodes: &[Node], _links: &[ResolvedLink]) {}

    fn apply(&mut self, nodes: &mut [Node], alpha: f64, jiggle: &mut Jiggle) {
        let n = nodes.len();
        let Some(cell) = self.distance_max else {
            for i in 0..n {
                for j in 0..n {
                    if i != j {
                        self.accumulate(nodes, i, j, alpha, jiggle);
                    }
                }
            }
            return;
        };

        let bin = |node: &Node| ((node.x / cell).floor() as i64, (node.y / cell).floor() as i64);
        let mut bins: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
        for (i, node) in nodes.iter().enumerate() {
            bins.entry(bin(node)).or_default().push(i);
        }
        for i in 0..n {
            let (gx, gy) = bin(&nodes[i]);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(neighbours) = bins.get(&(gx + dx, gy + dy)) else {
                        continue;
                    };
                    for &j in neighbours {
                        if i != j {
                            self.accumulate(nodes, i, j, alpha, jiggle);
                        }
                    }
                }
            }
        }
    }
}
