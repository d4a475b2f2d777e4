//! Force-directed node simulation.
//!
//! Velocity Verlet style integration with an alpha "temperature": every tick moves alpha
//! toward `alpha_target` by `alpha_decay`, applies each force in registration order (link,
//! charge, collide, centering) and then integrates. Pinned coordinates replace integration.

mod collide;
mod link;
mod many_body;
mod position;

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

pub use collide::CollideForce;
pub use link::LinkForce;
pub use many_body::ManyBodyForce;
pub use position::{Axis, PositionForce};

use crate::config::SimulationConfig;
use crate::link::ResolvedLink;
use crate::node::Node;

const INITIAL_RADIUS: f64 = 10.0;

/// Tiny random offsets used to separate coincident nodes
#[derive(Debug)]
pub struct Jiggle {
    rng: StdRng,
}

impl Jiggle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next(&mut self) -> f64 {
        (self.rng.random::<f64>() - 0.5) * 1e-6
    }
}

pub trait Force {
    /// Called whenever the node or link set changes.
    fn initialize(&mut self, nodes: &[Node], links: &[ResolvedLink]);
    /// Adds this force's contribution to the node velocities.
    fn apply(&mut self, nodes: &mut [Node], alpha: f64, jiggle: &mut Jiggle);
}

/// What a call to [`Simulation::step`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Not running
    Idle,
    Ticked,
    /// Ticked and alpha fell below `alpha_min`; the simulation stopped
    Settled,
}

pub struct Simulation {
    config: SimulationConfig,
    alpha: f64,
    alpha_target: f64,
    running: bool,
    forces: Vec<Box<dyn Force>>,
    jiggle: Jiggle,
}

impl Simulation {
    /// A stopped simulation with the default force set for `config`.
    pub fn new(config: SimulationConfig) -> Self {
        let mut forces: Vec<Box<dyn Force>> = vec![
            Box::new(LinkForce::new(config.link_distance)),
            Box::new(ManyBodyForce::new(
                config.charge_strength,
                config.charge_distance_max,
            )),
            Box::new(CollideForce::new(config.collide_radius)),
        ];
        if let Some(strength) = config.center_strength {
            forces.push(Box::new(PositionForce::new(Axis::X, 0.0, strength)));
            forces.push(Box::new(PositionForce::new(Axis::Y, 0.0, strength)));
        }
        Self::with_forces(config, forces)
    }

    pub fn with_forces(config: SimulationConfig, forces: Vec<Box<dyn Force>>) -> Self {
        let jiggle = Jiggle::new(config.seed);
        Self {
            config,
            alpha: 1.0,
            alpha_target: 0.0,
            running: false,
            forces,
            jiggle,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn initialize(&mut self, nodes: &[Node], links: &[ResolvedLink]) {
        for force in &mut self.forces {
            force.initialize(nodes, links);
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Alpha is above the animating threshold
    pub fn is_animating(&self) -> bool {
        self.alpha > self.config.animating_limit
    }

    pub fn restart(&mut self) {
        if !self.running {
            debug!(alpha = self.alpha, "simulation started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(alpha = self.alpha, "simulation stopped");
        }
        self.running = false;
    }

    /// One scheduled tick; stops once alpha drops below `alpha_min`.
    pub fn step(&mut self, nodes: &mut [Node]) -> Step {
        if !self.running {
            return Step::Idle;
        }
        self.tick(nodes, 1);
        if self.alpha < self.config.alpha_min {
            self.stop();
            Step::Settled
        } else {
            Step::Ticked
        }
    }

    /// Runs `iterations` ticks synchronously, regardless of the running state.
    pub fn tick(&mut self, nodes: &mut [Node], iterations: usize) {
        let retain = 1.0 - self.config.velocity_decay;
        for _ in 0..iterations {
            self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
            for force in &mut self.forces {
                force.apply(nodes, self.alpha, &mut self.jiggle);
            }
            for node in nodes.iter_mut() {
                match node.fx {
                    Some(fx) => {
                        node.x = fx;
                        node.vx = 0.0;
                    }
                    None => {
                        node.vx *= retain;
                        node.x += node.vx;
                    }
                }
                match node.fy {
                    Some(fy) => {
                        node.y = fy;
                        node.vy = 0.0;
                    }
                    None => {
                        node.vy *= retain;
                        node.y += node.vy;
                    }
                }
            }
        }
        trace!(iterations, alpha = self.alpha, "simulation ticked");
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("alpha", &self.alpha)
            .field("alpha_target", &self.alpha_target)
            .field("running", &self.running)
            .field("forces", &self.forces.len())
            .finish()
    }
}

/// Position of the `index`-th unseeded node on a phyllotaxis spiral around the origin.
pub fn phyllotaxis(index: usize) -> (f64, f64) {
    let angle = PI * (3.0 - 5f64.sqrt());
    let i = index as f64;
    let radius = INITIAL_RADIUS * (0.5 + i).sqrt();
    let a = i * angle;
    (radius * a.cos(), radius * a.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64) -> Node {
        let mut n = Node::new(id, id);
        n.x = x;
        n.y = y;
        n
    }

    #[test]
    fn test_stopped_simulation_does_not_tick() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let mut nodes = vec![node("a", 5.0, 5.0)];
        sim.initialize(&nodes, &[]);
        assert_eq!(sim.step(&mut nodes), Step::Idle);
        assert_eq!(nodes[0].x, 5.0);
    }

    #[test]
    fn test_alpha_decays_until_settled() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let mut nodes = vec![node("a", 0.0, 0.0), node("b", 50.0, 0.0)];
        sim.initialize(&nodes, &[]);
        sim.restart();
        let mut ticks = 0;
        while sim.step(&mut nodes) != Step::Settled {
            ticks += 1;
            assert!(ticks < 1000);
        }
        // (1 - decay)^300 == alpha_min
        assert!((298..=302).contains(&(ticks + 1)), "settled after {ticks} ticks");
        assert!(!sim.is_running());
        assert!(!sim.is_animating());
    }

    #[test]
    fn test_alpha_target_keeps_simulation_warm() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let mut nodes = vec![node("a", 0.0, 0.0)];
        sim.initialize(&nodes, &[]);
        sim.set_alpha_target(0.1);
        sim.restart();
        for _ in 0..2000 {
            assert_ne!(sim.step(&mut nodes), Step::Settled);
        }
        assert!((sim.alpha() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_pinned_node_is_held() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let mut nodes = vec![node("a", 0.0, 0.0).with_fixed_position(30.0, -10.0), node("b", 1.0, 1.0)];
        sim.initialize(&nodes, &[]);
        sim.tick(&mut nodes, 25);
        assert_eq!((nodes[0].x, nodes[0].y), (30.0, -10.0));
        assert_eq!((nodes[0].vx, nodes[0].vy), (0.0, 0.0));
    }

    #[test]
    fn test_phyllotaxis_positions_are_distinct() {
        let points: Vec<_> = (0..50).map(phyllotaxis).collect();
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!((a.0 - b.0).hypot(a.1 - b.1) > 1.0);
            }
        }
    }
}
