use nalgebra::{Isometry3, Perspective3, Point3, Unit, Vector3};
use schemaviz_layout::{Position, Size};

/// A plane `normal . p + constant = 0`; the normal side is positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Unit<Vector3<f64>>,
    pub constant: f64,
}

impl Plane {
    pub fn new(normal: Unit<Vector3<f64>>, constant: f64) -> Self {
        Self { normal, constant }
    }

    pub fn from_normal_and_coplanar_point(normal: Unit<Vector3<f64>>, point: &Point3<f64>) -> Self {
        Self {
            normal,
            constant: -normal.dot(&point.coords),
        }
    }

    /// Signed distance, positive on the normal side
    pub fn distance_to_point(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.constant
    }
}

/// True when `point` is on the positive side of (or on) every plane.
pub fn is_point_visible_by_planes(planes: &[Plane], point: &Point3<f64>) -> bool {
    planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
}

/// Perspective camera
#[derive(Clone, Debug)]
pub struct Camera {
    position: Point3<f64>,
    direction: Unit<Vector3<f64>>,
    view: Isometry3<f64>,
    projection: Perspective3<f64>,
}

impl Camera {
    /// `fov_y` in radians.
    pub fn look_at(
        eye: Point3<f64>,
        target: Point3<f64>,
        up: Vector3<f64>,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        Self {
            position: eye,
            direction: Unit::new_normalize(target - eye),
            view: Isometry3::look_at_rh(&eye, &target, &up),
            projection: Perspective3::new(aspect, fov_y, near, far),
        }
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn direction(&self) -> Unit<Vector3<f64>> {
        self.direction
    }

    pub fn near(&self) -> f64 {
        self.projection.znear()
    }

    pub fn far(&self) -> f64 {
        self.projection.zfar()
    }

    /// Planes at the near and far distance along the view direction, both facing forward.
    ///
    /// Points between them have a non-negative distance to the near plane and a
    /// non-positive distance to the far plane. The side walls of the frustum are not tested.
    pub fn depth_planes(&self) -> (Plane, Plane) {
        let near_point = self.position + self.direction.into_inner() * self.near();
        let far_point = self.position + self.direction.into_inner() * self.far();
        (
            Plane::from_normal_and_coplanar_point(self.direction, &near_point),
            Plane::from_normal_and_coplanar_point(self.direction, &far_point),
        )
    }

    pub fn is_within_depth_range(&self, point: &Point3<f64>) -> bool {
        let (near, far) = self.depth_planes();
        near.distance_to_point(point) >= 0.0 && far.distance_to_point(point) <= 0.0
    }

    /// Pixel position of `point` on a canvas of `size`, origin top left.
    pub fn world_to_viewport(&self, point: &Point3<f64>, size: Size) -> Position {
        let ndc = self
            .projection
            .project_point(&self.view.transform_point(point));
        Position::new(
            (ndc.x + 1.0) / 2.0 * size.width,
            (1.0 - ndc.y) / 2.0 * size.height,
        )
    }

    pub fn distance_to(&self, point: &Point3<f64>) -> f64 {
        nalgebra::distance(&self.position, point)
    }
}
