use schemaviz_layout::{FitContentError, LayoutError};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph engine used after dispose")]
    Disposed,
    #[error("unknown node id: {0}")]
    UnknownNode(String),
    #[error("unknown link id: {0}")]
    UnknownLink(String),
    #[error("invalid graph config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    FitContent(#[from] FitContentError),
    #[error("position cache storage failed: {0}")]
    Storage(#[from] std::io::Error),
    #[error("position cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
