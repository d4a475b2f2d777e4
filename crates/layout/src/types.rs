use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(&self, other: &Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Axis-aligned box. Edges are inclusive, so boxes that only touch still intersect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Position,
    pub max: Position,
}

impl Bounds {
    pub fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    pub fn from_origin_size(origin: Position, size: Size) -> Self {
        Self {
            min: origin,
            max: Position::new(origin.x + size.width, origin.y + size.height),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y)
    }

    pub fn contains_point(&self, p: &Position) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("cannot lay out a graph without nodes")]
    EmptyGraph,
    #[error("layered layout produced no result: {0}")]
    LayoutFailure(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitContentError {
    #[error("no node with a measured box to fit")]
    NoFittableContent,
    #[error("viewport {width}x{height} is too small to fit content")]
    DegenerateViewport { width: f64, height: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("bounds {0:?} do not intersect the grid region")]
    OutsideRegion(Bounds),
    #[error("element was already removed from the grid and cannot be inserted again")]
    AlreadyRemoved,
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;

/// Trait for nodes that can be handed to a layered layout
pub trait LayoutNode {
    fn id(&self) -> &str;
    fn size(&self) -> Size;
    /// Existing pinned position, passed on as a hint.
    fn fixed_position(&self) -> Option<Position>;
    fn set_fixed_position(&mut self, pos: Position);
}

/// Plain layout input, used when the caller owns no `LayoutNode` type.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInput {
    pub id: String,
    pub size: Size,
    pub hint: Option<Position>,
}

impl LayoutNode for LayoutInput {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> Size {
        self.size
    }

    fn fixed_position(&self) -> Option<Position> {
        self.hint
    }

    fn set_fixed_position(&mut self, pos: Position) {
        self.hint = Some(pos);
    }
}

/// A node placed by a layered layout, matched back to its input by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedNode {
    pub id: String,
    pub fx: f64,
    pub fy: f64,
}
