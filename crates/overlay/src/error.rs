use schemaviz_layout::GridError;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("overlay tool used after dispose")]
    Disposed,
    #[error("element is already attached to the viewer")]
    AlreadyAttached,
    #[error("element is not attached to the viewer")]
    NotAttached,
    #[error("overlay elements must be absolutely positioned")]
    NotAbsolutelyPositioned,
    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
