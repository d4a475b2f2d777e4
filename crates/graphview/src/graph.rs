use schemaviz_layout::{
    DagreLayered, LayeredLayout, LayoutError, LayoutInput, NodeBox, PlacedNode, Position, Size,
    Transform, fit_content, place,
};
use tracing::{debug, info, trace, warn};

use crate::cache::{LayoutPositionCache, PinnedPosition, PositionMap, nodes_key};
use crate::config::{DEFAULT_KEY, GraphConfig};
use crate::error::{GraphError, Result};
use crate::link::{Link, ResolvedLink, resolve_links};
use crate::node::{Node, NodeSet};
use crate::render::{Frame, Measure, ScreenTransformRenderer, Viewport};
use crate::simulation::{Simulation, phyllotaxis};

pub type SizingFn = Box<dyn Fn(&Node) -> Size>;

/// Whether node positions come from a layered layout or from the free simulation
#[derive(Default)]
pub enum AutoLayout {
    /// Free force-directed placement
    #[default]
    Off,
    /// Layered placement using the box size reported for each node
    Sizing(SizingFn),
}

impl AutoLayout {
    pub fn sizing(f: impl Fn(&Node) -> Size + 'static) -> Self {
        AutoLayout::Sizing(Box::new(f))
    }

    pub fn is_on(&self) -> bool {
        matches!(self, AutoLayout::Sizing(_))
    }
}

impl std::fmt::Debug for AutoLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoLayout::Off => f.write_str("Off"),
            AutoLayout::Sizing(_) => f.write_str("Sizing(..)"),
        }
    }
}

/// Snapshot handed to a layered layout, matched back by `generation`.
#[derive(Clone, Debug)]
pub struct LayoutRequest {
    pub generation: u64,
    pub inputs: Vec<LayoutInput>,
    pub links: Vec<(String, String)>,
}

impl LayoutRequest {
    pub fn run(&self, layout: &dyn LayeredLayout) -> std::result::Result<Vec<PlacedNode>, LayoutError> {
        place(&self.inputs, &self.links, layout)
    }
}

/// Pointer events on a link, forwarded to the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEventKind {
    MouseOver,
    MouseOut,
    Click,
}

type TickListener = Box<dyn FnMut(&Frame)>;
type LoadingListener = Box<dyn FnMut(bool)>;
type LinkListener = Box<dyn FnMut(LinkEventKind, &Link)>;

/// Interactive graph view state.
///
/// The host feeds node/link lists, pointer events and one `frame` call per displayed frame;
/// the engine owns node positions and hands back screen geometry.
pub struct GraphEngine {
    config: GraphConfig,
    auto_layout: AutoLayout,
    layout: Box<dyn LayeredLayout>,
    cache: LayoutPositionCache,
    simulation: Simulation,
    renderer: ScreenTransformRenderer,
    nodes: NodeSet,
    links: Vec<Link>,
    resolved: Vec<ResolvedLink>,
    transform: Transform,
    viewport: Option<Viewport>,
    /// Bumped on every node-set change; stale layout results are discarded
    generation: u64,
    layout_pending: bool,
    auto_layouting: bool,
    fitting: bool,
    loading: bool,
    tick_listeners: Vec<TickListener>,
    loading_listeners: Vec<LoadingListener>,
    link_listeners: Vec<LinkListener>,
    disposed: bool,
}

impl GraphEngine {
    /// Fails when `config` has unusable zoom bounds.
    pub fn new(config: GraphConfig, cache: LayoutPositionCache) -> Result<Self> {
        config.validate()?;
        let simulation = Simulation::new(config.simulation.clone());
        let renderer =
            ScreenTransformRenderer::new(config.use_curve, config.offsets, config.full_render_limit);
        Ok(Self {
            config,
            auto_layout: AutoLayout::Off,
            layout: Box::new(DagreLayered::default()),
            cache,
            simulation,
            renderer,
            nodes: NodeSet::new(),
            links: Vec::new(),
            resolved: Vec::new(),
            transform: Transform::IDENTITY,
            viewport: None,
            generation: 0,
            layout_pending: false,
            auto_layouting: false,
            fitting: false,
            loading: false,
            tick_listeners: Vec::new(),
            loading_listeners: Vec::new(),
            link_listeners: Vec::new(),
            disposed: false,
        })
    }

    pub fn with_layout(mut self, layout: Box<dyn LayeredLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_auto_layout(mut self, mode: AutoLayout) -> Self {
        self.auto_layout = mode;
        self.transform = self.initial_transform();
        self
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(GraphError::Disposed);
        }
        Ok(())
    }

    fn initial_transform(&self) -> Transform {
        match (&self.auto_layout, self.viewport) {
            (AutoLayout::Off, Some(v)) => Transform::new(v.width / 2.0, v.height / 2.0, 1.0),
            _ => Transform::IDENTITY,
        }
    }

    fn cache_key(&self) -> String {
        if self.auto_layout.is_on() {
            nodes_key(self.nodes.ids())
        } else {
            DEFAULT_KEY.to_string()
        }
    }

    /// Sets the viewport size and resets the transform to the mode's initial one.
    pub fn attach_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_live()?;
        self.viewport = Some(viewport);
        self.transform = self.initial_transform();
        Ok(())
    }

    /// Updates the viewport size, keeping the current transform.
    pub fn resize_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_live()?;
        self.viewport = Some(viewport);
        Ok(())
    }

    pub fn set_auto_layout(&mut self, mode: AutoLayout) -> Result<()> {
        self.ensure_live()?;
        self.auto_layout = mode;
        self.generation += 1;
        self.auto_layouting = false;
        self.transform = self.initial_transform();
        self.schedule_placement();
        self.update_loading();
        Ok(())
    }

    /// Replaces the node and link lists, merging node state by id.
    pub fn set_graph(&mut self, nodes: Vec<Node>, links: Vec<Link>) -> Result<()> {
        self.ensure_live()?;
        let incoming = NodeSet::from_nodes(nodes);
        let key = if self.auto_layout.is_on() {
            nodes_key(incoming.ids())
        } else {
            DEFAULT_KEY.to_string()
        };
        let cached: PositionMap = if self.config.use_cache {
            self.cache.load(&key).cloned().unwrap_or_default()
        } else {
            PositionMap::new()
        };
        let shares_ids = incoming.ids().any(|id| self.nodes.contains(id));

        let mut unseeded = 0usize;
        let mut restored = 0usize;
        let merged = incoming.iter().map(|node| {
            let mut node = node.clone();
            if let Some(current) = self.nodes.get(&node.id) {
                node.x = current.x;
                node.y = current.y;
                node.vx = current.vx;
                node.vy = current.vy;
                node.fx = current.fx;
                node.fy = current.fy;
                node.size = node.size.or(current.size);
                return node;
            }
            node.vx = 0.0;
            node.vy = 0.0;
            if let (None, None, Some(pin)) = (node.fx, node.fy, cached.get(&node.id)) {
                node.fx = Some(pin.fx);
                node.fy = Some(pin.fy);
                restored += 1;
            }
            match (node.initial_x, node.initial_y, node.fx, node.fy) {
                (Some(x), Some(y), _, _) => {
                    node.x = x;
                    node.y = y;
                }
                (_, _, Some(fx), Some(fy)) => {
                    node.x = fx;
                    node.y = fy;
                }
                _ => {
                    let (x, y) = phyllotaxis(unseeded);
                    node.x = x;
                    node.y = y;
                    unseeded += 1;
                }
            }
            node
        });
        let merged = NodeSet::from_nodes(merged.collect::<Vec<_>>());
        debug!(
            nodes = merged.len(),
            links = links.len(),
            restored,
            unseeded,
            shares_ids,
            "node set changed"
        );

        self.nodes = merged;
        self.links = links;
        self.resolved = resolve_links(&self.links, &self.nodes);
        self.generation += 1;
        self.auto_layouting = false;
        self.simulation.initialize(self.nodes.as_slice(), &self.resolved);

        if self.auto_layout.is_on() {
            self.transform = Transform::IDENTITY;
        } else if !self.nodes.is_empty() {
            if shares_ids {
                self.simulation.set_alpha(self.config.simulation.reheat_alpha);
            } else {
                let ticks = self.config.simulation.fast_forward_ticks(self.nodes.len());
                debug!(ticks, "fast-forwarding new node set");
                self.simulation.tick(self.nodes.as_mut_slice(), ticks);
                self.simulation.set_alpha(1.0);
            }
            self.simulation.restart();
        }
        self.schedule_placement();
        self.update_loading();
        Ok(())
    }

    /// In auto-layout mode: stop the simulation and queue a layout or a fit.
    fn schedule_placement(&mut self) {
        self.layout_pending = false;
        self.fitting = false;
        if !self.auto_layout.is_on() {
            return;
        }
        self.simulation.set_alpha_target(0.0);
        self.simulation.stop();
        if self.nodes.is_empty() {
            return;
        }
        if self.nodes.iter().any(|n| !n.is_fixed()) {
            self.layout_pending = true;
        } else {
            self.fitting = true;
        }
    }

    /// Snapshots the nodes for a layered layout run. `None` when auto-layout is off.
    ///
    /// While the request is outstanding the simulation does not tick.
    pub fn begin_auto_layout(&mut self) -> Result<Option<LayoutRequest>> {
        self.ensure_live()?;
        let AutoLayout::Sizing(sizing) = &self.auto_layout else {
            return Ok(None);
        };
        for node in self.nodes.iter_mut() {
            node.size = Some(sizing(node));
        }
        let inputs = self
            .nodes
            .iter()
            .map(|n| LayoutInput {
                id: n.id.clone(),
                size: n.size.unwrap_or_default(),
                hint: n.fx.zip(n.fy).map(|(x, y)| Position::new(x, y)),
            })
            .collect();
        let links = self
            .links
            .iter()
            .map(|l| (l.source.clone(), l.target.clone()))
            .collect();
        self.simulation.initialize(self.nodes.as_slice(), &self.resolved);
        self.simulation.stop();
        self.layout_pending = false;
        self.auto_layouting = true;
        self.update_loading();
        trace!(generation = self.generation, "auto layout requested");
        Ok(Some(LayoutRequest {
            generation: self.generation,
            inputs,
            links,
        }))
    }

    /// Applies a layout result. Returns `Ok(false)` when the node set changed since
    /// the request was taken.
    ///
    /// A failed layout leaves nodes at their seed positions and is returned as an error.
    pub fn complete_auto_layout(
        &mut self,
        generation: u64,
        result: std::result::Result<Vec<PlacedNode>, LayoutError>,
    ) -> Result<bool> {
        self.ensure_live()?;
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale layout result");
            return Ok(false);
        }
        self.auto_layouting = false;
        let placed = match result {
            Ok(placed) => placed,
            Err(e) => {
                self.fitting = true;
                self.update_loading();
                return Err(e.into());
            }
        };

        let mut applied = 0usize;
        for p in &placed {
            if let Some(node) = self.nodes.get_mut(&p.id) {
                node.pin(Position::new(p.fx, p.fy));
                node.x = p.fx;
                node.y = p.fy;
                node.vx = 0.0;
                node.vy = 0.0;
                applied += 1;
            }
        }
        info!(nodes = applied, "auto layout applied");
        self.save_cache();
        self.fitting = true;
        self.update_loading();
        Ok(true)
    }

    /// Runs a layered layout synchronously with the configured strategy.
    pub fn auto_layout(&mut self) -> Result<()> {
        let Some(request) = self.begin_auto_layout()? else {
            return Ok(());
        };
        let result = request.run(self.layout.as_ref());
        self.complete_auto_layout(request.generation, result)?;
        Ok(())
    }

    /// Queues a fit for the next frame.
    pub fn request_fit(&mut self) -> Result<()> {
        self.ensure_live()?;
        if !self.nodes.is_empty() {
            self.fitting = true;
            self.update_loading();
        }
        Ok(())
    }

    /// Frames all measured nodes. Unmeasured content or a too small viewport leaves the
    /// fit pending for the next frame.
    pub fn fit_content(&mut self, measure: &dyn Measure) -> Result<()> {
        self.ensure_live()?;
        let Some(viewport) = self.viewport else {
            self.fitting = !self.nodes.is_empty();
            return Ok(());
        };
        let boxes: Vec<NodeBox> = self
            .nodes
            .iter()
            .filter_map(|n| {
                measure.measure(n).map(|size| NodeBox {
                    x: n.x,
                    y: n.y,
                    width: size.width,
                    height: size.height,
                })
            })
            .collect();
        match fit_content(&boxes, viewport.size(), &self.config.zoom_range()) {
            Ok(transform) => {
                debug!(?transform, "fitted content");
                self.transform = transform;
                self.fitting = false;
            }
            Err(e) => {
                debug!(error = %e, "skipping fit");
                self.fitting = !self.nodes.is_empty();
            }
        }
        self.update_loading();
        Ok(())
    }

    /// Advances the engine by one displayed frame and returns the screen geometry.
    pub fn frame(&mut self, measure: &dyn Measure) -> Result<Frame> {
        self.ensure_live()?;
        if self.layout_pending {
            if let Err(e) = self.auto_layout() {
                warn!(error = %e, "auto layout failed, keeping seed positions");
            }
        }
        if self.fitting {
            self.fit_content(measure)?;
        }
        if !self.auto_layouting {
            self.simulation.step(self.nodes.as_mut_slice());
        }
        self.update_loading();
        Ok(self.publish(measure))
    }

    /// Re-projects the current positions without advancing the simulation.
    pub fn force_rerender(&mut self, measure: &dyn Measure) -> Result<Frame> {
        self.ensure_live()?;
        Ok(self.publish(measure))
    }

    /// Projection of the current state, without notifying subscribers
    pub fn render(&self, measure: &dyn Measure) -> Frame {
        self.renderer.project(
            self.transform,
            self.viewport.unwrap_or_default(),
            &self.nodes,
            &self.links,
            &self.resolved,
            measure,
        )
    }

    fn publish(&mut self, measure: &dyn Measure) -> Frame {
        let frame = self.render(measure);
        for listener in &mut self.tick_listeners {
            listener(&frame);
        }
        frame
    }

    /// Runs `ticks` simulation ticks synchronously.
    pub fn run_ticks(&mut self, ticks: usize) -> Result<()> {
        self.ensure_live()?;
        self.simulation.tick(self.nodes.as_mut_slice(), ticks);
        Ok(())
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    pub fn drag_start(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        self.node_mut(id)?.pin_here();
        self.simulation
            .set_alpha_target(self.config.simulation.animating_limit);
        self.simulation.restart();
        trace!(id, "drag started");
        Ok(())
    }

    /// Moves the pinned position by a screen-space delta.
    pub fn drag(&mut self, id: &str, dx: f64, dy: f64) -> Result<()> {
        self.ensure_live()?;
        let k = self.transform.k;
        let node = self.node_mut(id)?;
        node.fx = Some(node.fx.unwrap_or(node.x) + dx / k);
        node.fy = Some(node.fy.unwrap_or(node.y) + dy / k);
        Ok(())
    }

    /// Keeps the node at its dragged pin and persists the layout.
    pub fn drag_end(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        let node = self.node_mut(id)?;
        let at = Position::new(node.fx.unwrap_or(node.x), node.fy.unwrap_or(node.y));
        node.pin(at);
        node.x = at.x;
        node.y = at.y;
        self.simulation.set_alpha_target(0.0);
        trace!(id, "drag ended");
        self.save_cache();
        Ok(())
    }

    pub fn click(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        self.node_mut(id)?;
        self.save_cache();
        Ok(())
    }

    fn save_cache(&mut self) {
        if !self.config.use_cache {
            return;
        }
        let positions: PositionMap = self
            .nodes
            .iter()
            .filter_map(|n| {
                let (fx, fy) = n.fx.zip(n.fy)?;
                Some((n.id.clone(), PinnedPosition { fx, fy }))
            })
            .collect();
        let key = self.cache_key();
        if let Err(e) = self.cache.save(&key, positions) {
            warn!(error = %e, "failed to persist layout positions");
        }
    }

    /// Factors that are not finite and positive fall back to `zoom_step`.
    pub fn zoom_in(&mut self, factor: Option<f64>) -> Result<Transform> {
        self.ensure_live()?;
        let k = self.transform.k * self.zoom_factor(factor);
        self.zoom_to(k)
    }

    pub fn zoom_out(&mut self, factor: Option<f64>) -> Result<Transform> {
        self.ensure_live()?;
        let k = self.transform.k / self.zoom_factor(factor);
        self.zoom_to(k)
    }

    fn zoom_factor(&self, factor: Option<f64>) -> f64 {
        factor
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(self.config.zoom_step)
    }

    fn zoom_to(&mut self, k: f64) -> Result<Transform> {
        self.transform = Transform { k, ..self.transform }.clamped(&self.config.zoom_range());
        Ok(self.transform)
    }

    /// Pan/zoom from the host's gesture handling; zoom is clamped.
    pub fn set_transform(&mut self, transform: Transform) -> Result<()> {
        self.ensure_live()?;
        self.transform = transform.clamped(&self.config.zoom_range());
        Ok(())
    }

    pub fn on_tick(&mut self, listener: impl FnMut(&Frame) + 'static) -> Result<()> {
        self.ensure_live()?;
        self.tick_listeners.push(Box::new(listener));
        Ok(())
    }

    /// `listener` receives `true` while the view is busy; called only on change.
    pub fn on_loading_status(&mut self, listener: impl FnMut(bool) + 'static) -> Result<()> {
        self.ensure_live()?;
        self.loading_listeners.push(Box::new(listener));
        Ok(())
    }

    pub fn on_link_event(
        &mut self,
        listener: impl FnMut(LinkEventKind, &Link) + 'static,
    ) -> Result<()> {
        self.ensure_live()?;
        self.link_listeners.push(Box::new(listener));
        Ok(())
    }

    /// Forwards a pointer event on the link with id `link_id` to the link listeners.
    pub fn link_event(&mut self, link_id: &str, kind: LinkEventKind) -> Result<()> {
        self.ensure_live()?;
        let link = self
            .links
            .iter()
            .find(|l| l.link_id() == link_id)
            .ok_or_else(|| GraphError::UnknownLink(link_id.to_string()))?;
        trace!(link_id, ?kind, "link event");
        for listener in &mut self.link_listeners {
            listener(kind, link);
        }
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        if self.auto_layout.is_on() {
            self.fitting || self.auto_layouting || self.layout_pending
        } else {
            self.simulation.is_running() && self.simulation.is_animating()
        }
    }

    fn update_loading(&mut self) {
        let loading = self.is_loading();
        if loading == self.loading {
            return;
        }
        self.loading = loading;
        debug!(loading, "loading status changed");
        for listener in &mut self.loading_listeners {
            listener(loading);
        }
    }

    /// Stops the simulation and drops every subscriber.
    pub fn dispose(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.simulation.stop();
        self.tick_listeners.clear();
        self.loading_listeners.clear();
        self.link_listeners.clear();
        self.disposed = true;
        info!(nodes = self.nodes.len(), "graph engine disposed");
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn resolved_links(&self) -> &[ResolvedLink] {
        &self.resolved
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn auto_layout_mode(&self) -> &AutoLayout {
        &self.auto_layout
    }

    pub fn is_auto_layouting(&self) -> bool {
        self.auto_layouting
    }

    pub fn is_fitting(&self) -> bool {
        self.fitting
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn cache(&self) -> &LayoutPositionCache {
        &self.cache
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("auto_layout", &self.auto_layout)
            .field("nodes", &self.nodes.len())
            .field("links", &self.resolved.len())
            .field("transform", &self.transform)
            .field("simulation", &self.simulation)
            .field("disposed", &self.disposed)
            .finish()
    }
}
