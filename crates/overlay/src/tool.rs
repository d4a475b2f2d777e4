//! Screen-space overlays anchored to 3D positions.
//!
//! Every scene render re-projects each attached element, hides the ones outside the camera's
//! depth range or behind a clipping plane, and optionally replaces elements overlapping in
//! screen space with one composite element per cluster. Composites are rebuilt from scratch
//! on every update.

use indexmap::IndexMap;
use nalgebra::Point3;
use schemaviz_layout::{BucketGrid, Bounds, Position, Size};
use tracing::{debug, info, trace};

use crate::camera::{Camera, is_point_visible_by_planes};
use crate::error::{OverlayError, Result};
use crate::host::{ElementStyle, OverlayHost, Visibility};

const CLUSTER_GRID: [usize; 2] = [10, 10];

/// Called with the element, its projected position, its anchor, the distance to the camera
/// and the user data, on every update.
pub type PositionUpdated<E, U> = Box<dyn FnMut(&E, Position, Point3<f64>, f64, Option<&U>)>;

/// Builds the composite element standing in for a cluster.
pub type CreateClusterElement<E, U> = Box<dyn FnMut(&[ClusterMember<'_, E, U>]) -> E>;

pub struct ClusterMember<'a, E, U> {
    pub element: &'a E,
    pub user_data: Option<&'a U>,
}

pub struct OverlayOptions<E, U> {
    pub position_updated: Option<PositionUpdated<E, U>>,
    pub user_data: Option<U>,
}

impl<E, U> Default for OverlayOptions<E, U> {
    fn default() -> Self {
        Self {
            position_updated: None,
            user_data: None,
        }
    }
}

impl<E, U> OverlayOptions<E, U> {
    pub fn with_user_data(mut self, user_data: U) -> Self {
        self.user_data = Some(user_data);
        self
    }

    pub fn on_position_updated(
        mut self,
        f: impl FnMut(&E, Position, Point3<f64>, f64, Option<&U>) + 'static,
    ) -> Self {
        self.position_updated = Some(Box::new(f));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusteringMode {
    /// Elements whose screen boxes overlap are merged
    OverlapInScreenSpace,
}

pub struct ClusteringOptions<E, U> {
    pub mode: ClusteringMode,
    pub create_cluster_element: CreateClusterElement<E, U>,
}

impl<E, U> ClusteringOptions<E, U> {
    pub fn overlap_in_screen_space(f: impl FnMut(&[ClusterMember<'_, E, U>]) -> E + 'static) -> Self {
        Self {
            mode: ClusteringMode::OverlapInScreenSpace,
            create_cluster_element: Box::new(f),
        }
    }
}

pub struct OverlayToolOptions<E, U> {
    pub clustering: Option<ClusteringOptions<E, U>>,
}

impl<E, U> Default for OverlayToolOptions<E, U> {
    fn default() -> Self {
        Self { clustering: None }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct OverlayState {
    visible: bool,
    position: Position,
    /// Measured once, on the first update after the element was added
    size: Option<Size>,
}

impl OverlayState {
    fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(self.position, self.size.unwrap_or_default())
    }
}

struct OverlayEntry<E, U> {
    anchor: Point3<f64>,
    options: OverlayOptions<E, U>,
    state: OverlayState,
}

type Overlays<E, U> = IndexMap<E, OverlayEntry<E, U>>;

pub struct HtmlOverlayTool<H: OverlayHost, U = ()> {
    host: H,
    options: OverlayToolOptions<H::Element, U>,
    overlays: Overlays<H::Element, U>,
    composites: Vec<H::Element>,
    visible: bool,
    update_scheduled: bool,
    disposed: bool,
}

impl<H: OverlayHost, U> HtmlOverlayTool<H, U> {
    pub fn new(host: H, options: OverlayToolOptions<H::Element, U>) -> Self {
        info!(
            tool = "HtmlOverlayTool",
            clustering = options.clustering.is_some(),
            "overlay tool created"
        );
        Self {
            host,
            options,
            overlays: IndexMap::new(),
            composites: Vec::new(),
            visible: true,
            update_scheduled: false,
            disposed: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(OverlayError::Disposed);
        }
        Ok(())
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Attached elements with their anchors, in insertion order.
    pub fn elements(&self) -> Vec<(&H::Element, Point3<f64>)> {
        self.overlays.iter().map(|(e, entry)| (e, entry.anchor)).collect()
    }

    pub fn composites(&self) -> &[H::Element] {
        &self.composites
    }

    /// Whether the last update left `element` shown
    pub fn is_element_visible(&self, element: &H::Element) -> Option<bool> {
        self.overlays.get(element).map(|e| e.state.visible)
    }

    pub fn screen_position(&self, element: &H::Element) -> Option<Position> {
        self.overlays.get(element).map(|e| e.state.position)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Attaches `element` at `anchor`. The element starts hidden and is positioned by the
    /// next update.
    pub fn add(
        &mut self,
        element: H::Element,
        anchor: Point3<f64>,
        options: OverlayOptions<H::Element, U>,
    ) -> Result<()> {
        self.ensure_live()?;
        if self.host.contains(&element) {
            return Err(OverlayError::AlreadyAttached);
        }
        self.host.set_style(&element, ElementStyle::HIDDEN);
        self.host.append(&element);
        if !self.host.is_absolutely_positioned(&element) {
            self.host.remove_child(&element);
            return Err(OverlayError::NotAbsolutelyPositioned);
        }
        self.overlays.insert(
            element,
            OverlayEntry {
                anchor,
                options,
                state: OverlayState {
                    visible: true,
                    position: Position::default(),
                    size: None,
                },
            },
        );
        self.update_scheduled = true;
        Ok(())
    }

    pub fn remove(&mut self, element: &H::Element) -> Result<()> {
        self.ensure_live()?;
        if !self.host.contains(element) || !self.overlays.contains_key(element) {
            return Err(OverlayError::NotAttached);
        }
        self.host.remove_child(element);
        self.overlays.shift_remove(element);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        let elements: Vec<H::Element> = self.overlays.keys().cloned().collect();
        for element in &elements {
            self.remove(element)?;
        }
        self.force_update(None)
    }

    /// Shows or hides every overlay. Nothing is updated while hidden.
    pub fn visible(&mut self, enable: bool) -> Result<()> {
        self.ensure_live()?;
        self.visible = enable;
        let style = if enable {
            ElementStyle::SHOWN
        } else {
            ElementStyle::HIDDEN
        };
        for element in self.overlays.keys().chain(&self.composites) {
            self.host.set_style(element, style);
        }
        self.force_update(None)
    }

    /// Runs the update queued by `add`, if any.
    pub fn run_scheduled_update(&mut self) -> Result<bool> {
        if !self.update_scheduled {
            return Ok(false);
        }
        self.force_update(None)?;
        Ok(true)
    }

    pub fn on_scene_rendered(&mut self, camera: &Camera) -> Result<()> {
        self.force_update(Some(camera))
    }

    pub fn on_viewer_disposed(&mut self) -> Result<()> {
        self.dispose()
    }

    /// Recomputes positions and visibility of every overlay, using the host camera unless
    /// `camera` is given.
    pub fn force_update(&mut self, camera: Option<&Camera>) -> Result<()> {
        if !self.visible {
            return Ok(());
        }
        self.ensure_live()?;
        self.update_scheduled = false;
        self.cleanup_cluster_elements();
        if self.overlays.is_empty() {
            return Ok(());
        }
        self.update_new_element_sizes();

        let camera = match camera {
            Some(camera) => camera.clone(),
            None => self.host.camera(),
        };
        let canvas = self.host.canvas_size();
        let clipping = self.host.clipping_planes();
        let (near, far) = camera.depth_planes();

        for (element, entry) in self.overlays.iter_mut() {
            let OverlayEntry {
                anchor,
                options,
                state,
            } = entry;
            let inside_camera_planes =
                near.distance_to_point(anchor) >= 0.0 && far.distance_to_point(anchor) <= 0.0;
            let inside_clipping_planes = is_point_visible_by_planes(&clipping, anchor);
            let screen = camera.world_to_viewport(anchor, canvas);
            if inside_camera_planes && inside_clipping_planes {
                state.position = screen;
                state.visible = true;
            } else {
                state.visible = false;
            }
            if let Some(callback) = options.position_updated.as_mut() {
                callback(
                    element,
                    screen,
                    *anchor,
                    camera.distance_to(anchor),
                    options.user_data.as_ref(),
                );
            }
        }

        self.cluster_elements()?;
        self.commit_changes();
        trace!(
            overlays = self.overlays.len(),
            composites = self.composites.len(),
            "overlays updated"
        );
        Ok(())
    }

    fn update_new_element_sizes(&mut self) {
        for (element, entry) in self.overlays.iter_mut() {
            if entry.state.size.is_none() {
                entry.state.size = Some(self.host.measure(element));
            }
        }
    }

    fn cleanup_cluster_elements(&mut self) {
        for composite in self.composites.drain(..) {
            self.host.remove_child(&composite);
        }
    }

    fn cluster_elements(&mut self) -> Result<()> {
        let Some(clustering) = self.options.clustering.as_mut() else {
            return Ok(());
        };
        match clustering.mode {
            ClusteringMode::OverlapInScreenSpace => cluster_by_overlap_in_screen_space(
                &mut self.host,
                &mut self.overlays,
                &mut self.composites,
                &mut clustering.create_cluster_element,
            ),
        }
    }

    fn commit_changes(&mut self) {
        let offset = self.host.canvas_offset();
        for (element, entry) in &self.overlays {
            let state = &entry.state;
            self.host.set_position(
                element,
                state.position.x + offset.x,
                state.position.y + offset.y,
            );
            let current = self.host.visibility(element);
            if state.visible && current != Some(Visibility::Visible) {
                self.host.set_style(element, ElementStyle::FADE_IN);
            } else if !state.visible && current != Some(Visibility::Hidden) {
                self.host.set_style(element, ElementStyle::FADE_OUT);
            }
        }
        for composite in &self.composites {
            self.host.append(composite);
        }
    }

    /// Detaches from the host and removes every overlay.
    pub fn dispose(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.host.unsubscribe();
        self.clear()?;
        self.cleanup_cluster_elements();
        self.disposed = true;
        info!(tool = "HtmlOverlayTool", "overlay tool disposed");
        Ok(())
    }
}

fn cluster_by_overlap_in_screen_space<H: OverlayHost, U>(
    host: &mut H,
    overlays: &mut Overlays<H::Element, U>,
    composites: &mut Vec<H::Element>,
    create: &mut CreateClusterElement<H::Element, U>,
) -> Result<()> {
    let canvas = Bounds::from_origin_size(Position::default(), host.canvas_size());
    let mut grid = BucketGrid::new(canvas, CLUSTER_GRID);
    for (element, entry) in overlays.iter() {
        let bounds = entry.state.bounds();
        if !entry.state.visible || !bounds.intersects(&canvas) || host.is_hidden(element) {
            continue;
        }
        grid.insert(bounds, element.clone())?;
    }

    let offset = host.canvas_offset();
    for index in 0..overlays.len() {
        let Some((_, entry)) = overlays.get_index(index) else {
            continue;
        };
        let bounds = entry.state.bounds();
        // elements hidden by an earlier cluster are skipped
        if !entry.state.visible || !bounds.intersects(&canvas) {
            continue;
        }
        let cluster: Vec<H::Element> = grid.remove_overlapping_elements(&bounds).cloned().collect();
        if cluster.len() < 2 {
            continue;
        }

        let members: Vec<(&H::Element, &OverlayEntry<H::Element, U>)> = cluster
            .iter()
            .filter_map(|e| overlays.get(e).map(|entry| (e, entry)))
            .collect();
        let count = members.len() as f64;
        let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(x, y), (_, entry)| {
            (x + entry.state.position.x, y + entry.state.position.y)
        });
        let midpoint = Position::new(sum_x / count, sum_y / count);
        let members: Vec<ClusterMember<'_, H::Element, U>> = members
            .into_iter()
            .map(|(element, entry)| ClusterMember {
                element,
                user_data: entry.options.user_data.as_ref(),
            })
            .collect();
        let composite = create(&members);
        debug!(elements = members.len(), "clustered overlays");

        for element in &cluster {
            if let Some(entry) = overlays.get_mut(element) {
                entry.state.visible = false;
            }
        }
        host.set_style(&composite, ElementStyle::SHOWN);
        host.set_position(&composite, midpoint.x + offset.x, midpoint.y + offset.y);
        composites.push(composite);
    }
    Ok(())
}
