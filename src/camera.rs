//! Calibrated pinhole cameras of the input views.
//!
//! Camera space looks down `-z` with `+y` up. [`CameraData::orientation`]
//! rotates camera space into world space.

use std::fmt;

use crate::{
    bounding::{Real, TVec3},
    checker::{check_finite, check_positive},
    TreeError,
};

/// Rotation quaternion `w + xi + yj + zk`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion<R: Real> {
    pub w: R,
    pub x: R,
    pub y: R,
    pub z: R,
}

impl<R: Real> Default for Quaternion<R> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<R: Real> fmt::Display for Quaternion<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.w, self.x, self.y, self.z)
    }
}

impl<R: Real> Quaternion<R> {
    pub fn new(w: R, x: R, y: R, z: R) -> Self {
        Quaternion { w, x, y, z }
    }

    pub fn identity() -> Self {
        Quaternion::new(R::one(), R::zero(), R::zero(), R::zero())
    }

    /// Rotation by `angle` radians around `axis`.
    pub fn from_axis_angle(axis: TVec3<R>, angle: R) -> Result<Self, TreeError> {
        let axis = axis.normalize().ok_or_else(|| {
            TreeError::InvalidGeometry(format!("Rotation axis should be non zero: {axis}"))
        })?;
        check_finite("Rotation angle", angle)?;

        let (sin, cos) = (angle * R::half()).sin_cos();
        Ok(Quaternion::new(cos, axis.x * sin, axis.y * sin, axis.z * sin))
    }

    /// Shortest rotation turning direction `from` into direction `to`.
    pub fn from_rotation_arc(from: TVec3<R>, to: TVec3<R>) -> Result<Self, TreeError> {
        let invalid =
            || TreeError::InvalidGeometry(format!("Rotation arc needs two directions: {from}, {to}"));
        let from = from.normalize().ok_or_else(invalid)?;
        let to = to.normalize().ok_or_else(invalid)?;

        let cos = from.dot(to);
        if cos < R::lit(-1.0 + 1e-6) {
            // opposite directions, any perpendicular axis does
            let other = if from.x.abs() < R::lit(0.9) {
                TVec3::unit_x()
            } else {
                TVec3::unit_y()
            };
            return Quaternion::from_axis_angle(from.cross(other), R::lit(std::f64::consts::PI));
        }

        let axis = from.cross(to);
        Quaternion::new(R::one() + cos, axis.x, axis.y, axis.z).normalize()
    }

    #[inline]
    fn vector(&self) -> TVec3<R> {
        TVec3::new(self.x, self.y, self.z)
    }

    pub fn norm(&self) -> R {
        (self.w * self.w + self.vector().length_squared()).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.vector().is_finite()
    }

    /// Unit length copy. Fails for zero or non finite quaternions.
    pub fn normalize(&self) -> Result<Self, TreeError> {
        let norm = self.norm();
        if !(norm > R::zero() && norm.is_finite()) {
            return Err(TreeError::InvalidGeometry(format!(
                "Quaternion cannot be normalized: {self}"
            )));
        }
        Ok(Quaternion::new(
            self.w / norm,
            self.x / norm,
            self.y / norm,
            self.z / norm,
        ))
    }

    /// Inverse rotation of a unit quaternion.
    pub fn conjugate(&self) -> Self {
        Quaternion::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotates `v`. Expects a unit quaternion.
    pub fn rotate(&self, v: TVec3<R>) -> TVec3<R> {
        let u = self.vector();
        let t = u.cross(v) * R::two();
        v + t * self.w + u.cross(t)
    }
}

/// Pinhole camera of one input view.
///
/// Projections are in normalised image coordinates: the focal length is
/// relative to the image size and the principal point lies in `[0, 1]²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData<R: Real> {
    pub orientation: Quaternion<R>,
    pub position: TVec3<R>,
    pub principal_point: [R; 2],
    /// Radial distortion coefficients `k1`, `k2`.
    pub distortion: [R; 2],
    pub focal_length: R,
    /// Pixel height over pixel width.
    pub aspect_ratio: R,
    pub view_id: u32,
}

impl<R: Real> CameraData<R> {
    /// Undistorted camera with its principal point at the image center.
    pub fn new(
        view_id: u32,
        position: TVec3<R>,
        orientation: Quaternion<R>,
        focal_length: R,
    ) -> Result<Self, TreeError> {
        if !position.is_finite() {
            return Err(TreeError::InvalidGeometry(format!(
                "Camera position should be finite: {position}"
            )));
        }
        Ok(CameraData {
            orientation: orientation.normalize()?,
            position,
            principal_point: [R::half(), R::half()],
            distortion: [R::zero(), R::zero()],
            focal_length: check_positive("Focal length", focal_length)?,
            aspect_ratio: R::one(),
            view_id,
        })
    }

    /// Camera at `position` looking at `target`.
    pub fn looking_at(
        view_id: u32,
        position: TVec3<R>,
        target: TVec3<R>,
        focal_length: R,
    ) -> Result<Self, TreeError> {
        let orientation = Quaternion::from_rotation_arc(-TVec3::unit_z(), target - position)?;
        CameraData::new(view_id, position, orientation, focal_length)
    }

    pub fn with_principal_point(mut self, principal_point: [R; 2]) -> Result<Self, TreeError> {
        check_finite("Principal point x", principal_point[0])?;
        check_finite("Principal point y", principal_point[1])?;
        self.principal_point = principal_point;
        Ok(self)
    }

    pub fn with_distortion(mut self, distortion: [R; 2]) -> Result<Self, TreeError> {
        check_finite("Distortion k1", distortion[0])?;
        check_finite("Distortion k2", distortion[1])?;
        self.distortion = distortion;
        Ok(self)
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: R) -> Result<Self, TreeError> {
        self.aspect_ratio = check_positive("Aspect ratio", aspect_ratio)?;
        Ok(self)
    }

    /// Viewing direction in world space.
    pub fn view_direction(&self) -> TVec3<R> {
        self.orientation.rotate(-TVec3::unit_z())
    }

    pub fn world_to_camera(&self, point: TVec3<R>) -> TVec3<R> {
        self.orientation.conjugate().rotate(point - self.position)
    }

    pub fn camera_to_world(&self, point: TVec3<R>) -> TVec3<R> {
        self.orientation.rotate(point) + self.position
    }

    /// Whether `point` lies strictly in front of the camera.
    pub fn sees(&self, point: TVec3<R>) -> bool {
        self.world_to_camera(point).z < R::zero()
    }

    /// Distorted normalised image coordinates of `point`.
    ///
    /// `None` for points on or behind the camera plane.
    pub fn project(&self, point: TVec3<R>) -> Option<[R; 2]> {
        let p = self.world_to_camera(point);
        if !(p.z < R::zero()) {
            return None;
        }

        let x = p.x / -p.z;
        let y = p.y / -p.z;
        let r2 = x * x + y * y;
        let [k1, k2] = self.distortion;
        let d = R::one() + k1 * r2 + k2 * r2 * r2;

        Some([
            self.focal_length * d * x + self.principal_point[0],
            self.focal_length * self.aspect_ratio * d * y + self.principal_point[1],
        ])
    }

    /// World space size of one pixel at `distance` from the camera, for an
    /// image `image_size` pixels across.
    pub fn pixel_footprint(&self, distance: R, image_size: u32) -> R {
        let pixels = R::from_u32(image_size.max(1)).unwrap_or_else(R::one);
        distance / (self.focal_length * pixels)
    }
}
