use std::fmt::Debug;
use std::hash::Hash;

use schemaviz_layout::{Position, Size};

use crate::camera::{Camera, Plane};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Style applied to an overlay element when it is shown or hidden.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementStyle {
    pub visibility: Visibility,
    pub opacity: Option<f64>,
    pub transition: Option<&'static str>,
}

impl ElementStyle {
    pub const SHOWN: ElementStyle = ElementStyle {
        visibility: Visibility::Visible,
        opacity: None,
        transition: None,
    };

    pub const HIDDEN: ElementStyle = ElementStyle {
        visibility: Visibility::Hidden,
        opacity: None,
        transition: None,
    };

    pub const FADE_IN: ElementStyle = ElementStyle {
        visibility: Visibility::Visible,
        opacity: Some(1.0),
        transition: Some("opacity 0.2s linear"),
    };

    /// Visibility flips after the opacity transition so the fade stays visible.
    pub const FADE_OUT: ElementStyle = ElementStyle {
        visibility: Visibility::Hidden,
        opacity: Some(0.0),
        transition: Some("visibility 0s 0.2s, opacity 0.2s linear"),
    };
}

/// The viewer an overlay tool is attached to: its DOM container, canvas and camera.
pub trait OverlayHost {
    type Element: Clone + Eq + Hash + Debug;

    /// The element is a child of the viewer container.
    fn contains(&self, element: &Self::Element) -> bool;
    fn append(&mut self, element: &Self::Element);
    fn remove_child(&mut self, element: &Self::Element);

    fn is_absolutely_positioned(&self, element: &Self::Element) -> bool;
    /// Hidden by the host itself, independent of the tool's styling
    fn is_hidden(&self, _element: &Self::Element) -> bool {
        false
    }
    fn measure(&self, element: &Self::Element) -> Size;
    fn visibility(&self, element: &Self::Element) -> Option<Visibility>;
    fn set_style(&mut self, element: &Self::Element, style: ElementStyle);
    fn set_position(&mut self, element: &Self::Element, left: f64, top: f64);

    fn canvas_size(&self) -> Size;
    /// Canvas offset inside the viewer container
    fn canvas_offset(&self) -> Position;
    fn camera(&self) -> Camera;
    fn clipping_planes(&self) -> Vec<Plane> {
        Vec::new()
    }

    /// Stop delivering scene-rendered and disposed events to the tool.
    fn unsubscribe(&mut self);
}
