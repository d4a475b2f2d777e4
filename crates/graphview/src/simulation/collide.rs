use crate::config::CollideRadius;
use crate::link::ResolvedLink;
use crate::node::Node;

use super::{Force, Jiggle};

const FALLBACK_RADIUS: f64 = 120.0;

/// Keeps node circles from overlapping, looking one tick ahead (`x + vx`).
#[derive(Debug)]
pub struct CollideForce {
    policy: CollideRadius,
    radii: Vec<f64>,
    strength: f64,
}

impl CollideForce {
    pub fn new(policy: CollideRadius) -> Self {
        Self {
            policy,
            radii: Vec::new(),
            strength: 1.0,
        }
    }

    fn radius(&self, node: &Node) -> f64 {
        match self.policy {
            CollideRadius::Fixed(r) => r,
            CollideRadius::FromSize { padding } => node
                .size
                .map(|s| s.width.hypot(s.height) / 2.0 + padding)
                .unwrap_or(FALLBACK_RADIUS),
        }
    }
}

impl Force for CollideForce {
    fn initialize(&mut self, nodes: &[Node], _links: &[ResolvedLink]) {
        self.radii = nodes.iter().map(|n| self.radius(n)).collect();
    }

    fn apply(&mut self, nodes: &mut [Node], _alpha: f64, jiggle: &mut Jiggle) {
        // nodes added since the last initialize get a radius on the fly
        while self.radii.len() < nodes.len() {
            let r = self.radius(&nodes[self.radii.len()]);
            self.radii.push(r);
        }
        for i in 0..nodes.len() {
            let ri = self.radii[i];
            let ri2 = ri * ri;
            let xi = nodes[i].x + nodes[i].vx;
            let yi = nodes[i].y + nodes[i].vy;
            for j in (i + 1)..nodes.len() {
                let rj = self.radii[j];
                let r = ri + rj;
                let mut x = xi - nodes[j].x - nodes[j].vx;
                let mut y = yi - nodes[j].y - nodes[j].vy;
                let mut l = x * x + y * y;
                if l >= r * r {
                    continue;
                }
                if x == 0.0 {
                    x = jiggle.next();
                    l += x * x;
                }
                if y == 0.0 {
                    y = jiggle.next();
                    l += y * y;
                }
                let len = l.sqrt();
                let push = (r - len) / len * self.strength;
                x *= push;
                y *= push;
                let rj2 = rj * rj;
                let share = rj2 / (ri2 + rj2);
                nodes[i].vx += x * share;
                nodes[i].vy += y * share;
                nodes[j].vx -= x * (1.0 - share);
                nodes[j].vy -= y * (1.0 - share);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use schemaviz_layout::Size;

    use super::*;

    #[test]
    fn test_overlapping_nodes_are_pushed_apart() {
        let mut a = Node::new("a", "A");
        let mut b = Node::new("b", "B");
        a.x = 0.0;
        b.x = 10.0;
        let mut nodes = vec![a, b];
        let mut force = CollideForce::new(CollideRadius::Fixed(20.0));
        force.initialize(&nodes, &[]);
        force.apply(&mut nodes, 1.0, &mut Jiggle::new(0));
        assert!(nodes[0].vx < 0.0);
        assert!(nodes[1].vx > 0.0);
    }

    #[test]
    fn test_radius_from_size() {
        let mut node = Node::new("a", "A");
        node.size = Some(Size::new(30.0, 40.0));
        let force = CollideForce::new(CollideRadius::FromSize { padding: 5.0 });
        assert_eq!(force.radius(&node), 30.0);
        assert_eq!(force.radius(&Node::new("b", "B")), FALLBACK_RADIUS);
    }
}
