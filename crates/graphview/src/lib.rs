//! Headless interactive graph view: force simulation, position cache and screen projection.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod link;
pub mod node;
pub mod render;
pub mod simulation;

pub use cache::{FileStore, KeyValueStore, LayoutPositionCache, MemoryStore, PinnedPosition, nodes_key};
pub use config::{
    ALPHA_ANIMATING_LIMIT, CacheConfig, CollideRadius, DEFAULT_KEY, FULL_RENDER_LIMIT, GraphConfig,
    MAX_ZOOM, MIN_ZOOM, Offsets, SimulationConfig,
};
pub use error::{GraphError, Result};
pub use graph::{AutoLayout, GraphEngine, LayoutRequest, LinkEventKind};
pub use link::{Link, ResolvedLink};
pub use node::{Node, NodeSet};
pub use render::{
    ContainerTransform, Frame, LinkEndOffset, LinkFrame, LinkPath, Measure, NodeFrame, Viewport,
};
pub use schemaviz_layout::{Position, Size, Transform};
