//! 2D overlay elements pinned to 3D anchors, with optional screen-space clustering.

pub mod camera;
pub mod error;
pub mod host;
pub mod tool;

pub use camera::{Camera, Plane, is_point_visible_by_planes};
pub use error::{OverlayError, Result};
pub use host::{ElementStyle, OverlayHost, Visibility};
pub use nalgebra::{Point3, Vector3};
pub use tool::{
    ClusterMember, ClusteringMode, ClusteringOptions, CreateClusterElement, HtmlOverlayTool,
    OverlayOptions, OverlayToolOptions, PositionUpdated,
};
