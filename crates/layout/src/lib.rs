//! Layout building blocks for the schema graph view: geometry types, a uniform bucket grid
//! for overlap queries, the layered initial placement and viewport fitting.

pub mod bucket_grid;
pub mod fit;
pub mod hierarchical;
pub mod types;

pub use bucket_grid::BucketGrid;
pub use fit::{NodeBox, Transform, fit_content};
pub use hierarchical::{
    DagreLayered, HierarchicalLayoutConfig, LayeredLayout, LayoutDirection, layout_in_place, place,
};
pub use types::*;
