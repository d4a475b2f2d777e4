use crate::link::ResolvedLink;
use crate::node::Node;

use super::{Force, Jiggle};

/// Spring pulling linked nodes toward `distance` apart.
///
/// Each link is weighted by the inverse degree of its less connected end, and the
/// correction is split between the ends in proportion to their degrees.
#[derive(Debug)]
pub struct LinkForce {
    distance: f64,
    links: Vec<(usize, usize)>,
    strengths: Vec<f64>,
    biases: Vec<f64>,
}

impl LinkForce {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            links: Vec::new(),
            strengths: Vec::new(),
            biases: Vec::new(),
        }
    }
}

impl Force for LinkForce {
    fn initialize(&mut self, nodes: &[Node], links: &[ResolvedLink]) {
        let mut count = vec![0usize; nodes.len()];
        self.links = links
            .iter()
            .filter(|l| l.source < nodes.len() && l.target < nodes.len())
            .map(|l| (l.source, l.target))
            .collect();
        for &(s, t) in &self.links {
            count[s] += 1;
            count[t] += 1;
        }
        self.biases = self
            .links
            .iter()
            .map(|&(s, t)| count[s] as f64 / (count[s] + count[t]) as f64)
            .collect();
        self.strengths = self
            .links
            .iter()
            .map(|&(s, t)| 1.0 / count[s].min(count[t]) as f64)
            .collect();
    }

    fn apply(&mut self, nodes: &mut [Node], alpha: f64, jiggle: &mut Jiggle) {
        for (i, &(s, t)) in self.links.iter().enumerate() {
            let (source, target) = (&nodes[s], &nodes[t]);
            let mut x = target.x + target.vx - source.x - source.vx;
            if x == 0.0 {
                x = jiggle.next();
            }
            let mut y = target.y + target.vy - source.y - source.vy;
            if y == 0.0 {
                y = jiggle.next();
            }
            let len = x.hypot(y);
            let l = (len - self.distance) / len * alpha * self.strengths[i];
            let (x, y) = (x * l, y * l);

            let b = self.biases[i];
            nodes[t].vx -= x * b;
            nodes[t].vy -= y * b;
            nodes[s].vx += x * (1.0 - b);
            nodes[s].vy += y * (1.0 - b);
        }
    }
}
