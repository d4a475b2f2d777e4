use std::ops::RangeInclusive;

use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::types::{FitContentError, Size};

/// Pan offset and uniform zoom of the graph view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        k: 1.0,
    };

    pub fn new(x: f64, y: f64, k: f64) -> Self {
        Self { x, y, k }
    }

    /// Same pan with `k` clamped to `zoom`.
    pub fn clamped(self, zoom: &RangeInclusive<f64>) -> Self {
        Self {
            k: self.k.clamp(*zoom.start(), *zoom.end()),
            ..self
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A rendered node box in simulation space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBox {
    fn is_fittable(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Computes the transform framing `boxes` inside a `container`.
///
/// The spread between the extreme node origins is divided by the container extent minus
/// the size of the outermost node; the tighter axis decides the zoom.
pub fn fit_content(
    boxes: &[NodeBox],
    container: Size,
    zoom: &RangeInclusive<f64>,
) -> Result<Transform, FitContentError> {
    let boxes: Vec<&NodeBox> = boxes.iter().filter(|b| b.is_fittable()).collect();
    let (min_x, max_x) = match boxes.iter().minmax_by(|a, b| a.x.total_cmp(&b.x)) {
        MinMaxResult::NoElements => return Err(FitContentError::NoFittableContent),
        MinMaxResult::OneElement(_) => return Ok(Transform::IDENTITY),
        MinMaxResult::MinMax(min, max) => (*min, *max),
    };
    let (min_y, max_y) = match boxes.iter().minmax_by(|a, b| a.y.total_cmp(&b.y)) {
        MinMaxResult::MinMax(min, max) => (*min, *max),
        _ => return Ok(Transform::IDENTITY),
    };

    let free_width = container.width - max_x.width;
    let free_height = container.height - max_y.height;
    if free_width <= 0.0 || free_height <= 0.0 {
        return Err(FitContentError::DegenerateViewport {
            width: container.width,
            height: container.height,
        });
    }

    let scale_x = (max_x.x - min_x.x) / free_width;
    let scale_y = (max_y.y - min_y.y) / free_height;
    let scale_k = scale_x.max(scale_y);
    let k = if scale_k > 0.0 { 1.0 / scale_k } else { 1.0 };
    let k = k.clamp(*zoom.start(), *zoom.end());

    Ok(Transform {
        x: -min_x.x * k,
        y: -min_y.y * k,
        k,
    })
}
