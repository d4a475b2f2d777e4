//! Projection of simulation coordinates into screen space.
//!
//! Zoom is split in two: below 1 the whole container is scaled down (`wrapper_scale`),
//! above 1 the distances between nodes grow (`node_scale`) while nodes keep their size.

use schemaviz_layout::{Position, Size, Transform};
use serde::Serialize;

use crate::config::Offsets;
use crate::link::{Link, ResolvedLink};
use crate::node::{Node, NodeSet};

/// Host capability reporting rendered geometry.
pub trait Measure {
    /// Rendered box of `node`, `None` while it has not been laid out by the host.
    fn measure(&self, node: &Node) -> Option<Size>;

    /// Anchor offsets added to the projected link ends
    fn link_offset(&self, _link: &Link) -> LinkEndOffset {
        LinkEndOffset::default()
    }
}

impl<F> Measure for F
where
    F: Fn(&Node) -> Option<Size>,
{
    fn measure(&self, node: &Node) -> Option<Size> {
        self(node)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LinkEndOffset {
    pub source: Position,
    pub target: Position,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeFrame {
    pub id: String,
    /// Screen position of the top left corner
    pub x: f64,
    pub y: f64,
    pub size: Size,
    pub visible: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkPath {
    Line {
        source: Position,
        target: Position,
    },
    /// Two quadratic segments through the midpoint, leaving and entering horizontally
    Curve {
        source: Position,
        mid: Position,
        target: Position,
    },
}

impl LinkPath {
    pub fn source(&self) -> Position {
        match self {
            LinkPath::Line { source, .. } | LinkPath::Curve { source, .. } => *source,
        }
    }

    pub fn target(&self) -> Position {
        match self {
            LinkPath::Line { target, .. } | LinkPath::Curve { target, .. } => *target,
        }
    }

    /// SVG path data
    pub fn to_svg_d(&self) -> String {
        match self {
            LinkPath::Line { source, target } => {
                format!("M {}, {} L {}, {}", source.x, source.y, target.x, target.y)
            }
            LinkPath::Curve {
                source,
                mid,
                target,
            } => format!(
                "M {} {} Q {} {} {} {} Q {} {} {} {}",
                target.x, target.y, mid.x, target.y, mid.x, mid.y, mid.x, source.y, source.x, source.y
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LinkFrame {
    pub id: String,
    pub source: String,
    pub target: String,
    pub path: LinkPath,
    pub visible: bool,
}

/// Scale of the node container around the viewport centre
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ContainerTransform {
    pub center: Position,
    pub scale: f64,
}

impl ContainerTransform {
    pub fn to_css(&self) -> String {
        format!(
            "translate(-{}px,-{}px) scale({}) translate({}px,{}px)",
            self.center.x, self.center.y, self.scale, self.center.x, self.center.y
        )
    }
}

/// Everything the host needs to draw one tick
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub transform: Transform,
    pub node_scale: f64,
    pub wrapper_scale: f64,
    /// Zoomed in far enough to render node details
    pub full_detail: bool,
    pub container: ContainerTransform,
    pub nodes: Vec<NodeFrame>,
    pub links: Vec<LinkFrame>,
}

impl Frame {
    pub fn node(&self, id: &str) -> Option<&NodeFrame> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&LinkFrame> {
        self.links.iter().find(|l| l.id == id)
    }
}

/// Canvas rectangle in container coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
struct CanvasBounds {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ScreenTransformRenderer {
    pub use_curve: bool,
    pub offsets: Offsets,
    pub full_render_limit: f64,
}

impl ScreenTransformRenderer {
    pub fn new(use_curve: bool, offsets: Offsets, full_render_limit: f64) -> Self {
        Self {
            use_curve,
            offsets,
            full_render_limit,
        }
    }

    pub fn project(
        &self,
        transform: Transform,
        viewport: Viewport,
        nodes: &NodeSet,
        links: &[Link],
        resolved: &[ResolvedLink],
        measure: &dyn Measure,
    ) -> Frame {
        let node_scale = transform.k.max(1.0);
        let wrapper_scale = transform.k.min(1.0);
        let origin = Position::new(transform.x / wrapper_scale, transform.y / wrapper_scale);
        let to_screen =
            |x: f64, y: f64| Position::new(origin.x + node_scale * x, origin.y + node_scale * y);

        let canvas = CanvasBounds {
            left: -self.offsets.left / wrapper_scale,
            top: -self.offsets.top / wrapper_scale,
            right: (viewport.width + self.offsets.right) / wrapper_scale,
            bottom: (viewport.height + self.offsets.bottom) / wrapper_scale,
        };

        let node_frames: Vec<NodeFrame> = nodes
            .iter()
            .map(|node| {
                let at = to_screen(node.x, node.y);
                let size = measure.measure(node).unwrap_or_default();
                let visible = at.x + size.width * node_scale > canvas.left
                    && at.x < canvas.right
                    && at.y + size.height * node_scale > canvas.top
                    && at.y < canvas.bottom;
                NodeFrame {
                    id: node.id.clone(),
                    x: at.x,
                    y: at.y,
                    size,
                    visible,
                }
            })
            .collect();

        let link_frames = resolved
            .iter()
            .filter_map(|r| {
                let link = links.get(r.link)?;
                let (s, t) = (&nodes[r.source], &nodes[r.target]);
                let offset = measure.link_offset(link);
                let source = to_screen(s.x, s.y);
                let source = Position::new(source.x + offset.source.x, source.y + offset.source.y);
                let target = to_screen(t.x, t.y);
                let target = Position::new(target.x + offset.target.x, target.y + offset.target.y);
                let path = if self.use_curve {
                    LinkPath::Curve {
                        source,
                        mid: target.midpoint(&source),
                        target,
                    }
                } else {
                    LinkPath::Line { source, target }
                };
                Some(LinkFrame {
                    id: r.id.clone(),
                    source: s.id.clone(),
                    target: t.id.clone(),
                    path,
                    visible: is_link_visible(&node_frames[r.source], &node_frames[r.target], &canvas),
                })
            })
            .collect();

        let center = Position::new(viewport.width / 2.0, viewport.height / 2.0);
        Frame {
            transform,
            node_scale,
            wrapper_scale,
            full_detail: transform.k > self.full_render_limit,
            container: ContainerTransform {
                center,
                scale: wrapper_scale,
            },
            nodes: node_frames,
            links: link_frames,
        }
    }
}

/// Shown when an end is visible, hidden when both ends lie past the same canvas edge.
fn is_link_visible(source: &NodeFrame, target: &NodeFrame, canvas: &CanvasBounds) -> bool {
    if source.visible || target.visible {
        return true;
    }
    let (min_x, max_x) = (source.x.min(target.x), source.x.max(target.x));
    let (min_y, max_y) = (source.y.min(target.y), source.y.max(target.y));
    let beyond_one_edge = max_x < canvas.left
        || min_x > canvas.right
        || max_y < canvas.top
        || min_y > canvas.bottom;
    !beyond_one_edge
}
