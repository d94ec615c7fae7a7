use crate::{
    bounding::{Aabb, Real, TVec3},
    scope::Scope,
    TreeError,
};

use super::{
    check_finite, check_positive,
    gjk::{self, Support},
    ignores, GeometricTest, NodesChecker,
};

/// Smallest accepted cosine between the cone axis and the end disc normal.
const MIN_DISC_TILT: f64 = 1e-3;

/// Nodes checker testing tree nodes for overlap with an oblique circular cone.
///
/// The cone is the convex hull of its apex and a circular end disc. The
/// disc lies `length` away from the apex along the axis pointing towards the
/// given end center, and is either perpendicular to that axis or tilted by an
/// explicit end normal. With `length` shorter than the apex to end center
/// distance the cone stops before reaching the end center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeNodesChecker<R: Real> {
    apex: TVec3<R>,
    axis: TVec3<R>,
    end_center: TVec3<R>,
    end_normal: TVec3<R>,
    end_radius: R,
    length: R,
    max_depth: u32,
    bounds: Aabb<R>,
    sphere_center: TVec3<R>,
    sphere_radius: R,
}

impl<R: Real> ConeNodesChecker<R> {
    /// Cone with its end disc perpendicular to the axis from `apex` towards
    /// `end_center`.
    pub fn new(
        apex: TVec3<R>,
        end_center: TVec3<R>,
        end_radius: R,
        length: R,
        max_depth: u32,
    ) -> Result<Self, TreeError> {
        let axis = Self::axis(apex, end_center)?;
        Self::build(apex, axis, axis, end_radius, length, max_depth)
    }

    /// Defines the cone which is then used for overlap tests against node boxes.
    ///
    /// * `apex` - where the cone originates, its sharp end.
    /// * `end_outside_normal` - orientation of the end disc, pointing outside
    ///   at the cone end. Only the disc plane matters, so either sign works.
    /// * `end_center` - the main axis runs from `apex` towards this point.
    /// * `end_radius` - radius of the end disc, the widest disc of the cone.
    /// * `length` - distance from the apex to the end disc along the axis.
    pub fn with_end_normal(
        apex: TVec3<R>,
        end_outside_normal: TVec3<R>,
        end_center: TVec3<R>,
        end_radius: R,
        length: R,
        max_depth: u32,
    ) -> Result<Self, TreeError> {
        let axis = Self::axis(apex, end_center)?;
        let mut normal = end_outside_normal.normalize().ok_or_else(|| {
            TreeError::InvalidGeometry(format!(
                "Cone end normal should be finite and non zero: {end_outside_normal}"
            ))
        })?;

        let tilt = normal.dot(axis);
        if tilt.abs() < R::lit(MIN_DISC_TILT) {
            return Err(TreeError::InvalidGeometry(format!(
                "Cone end disc is parallel to the axis. Normal: {normal}, axis: {axis}"
            )));
        }
        if tilt < R::zero() {
            normal = -normal;
        }

        Self::build(apex, axis, normal, end_radius, length, max_depth)
    }

    fn axis(apex: TVec3<R>, end_center: TVec3<R>) -> Result<TVec3<R>, TreeError> {
        if !apex.is_finite() || !end_center.is_finite() {
            return Err(TreeError::InvalidGeometry(format!(
                "Cone points should be finite. Apex: {apex}, end center: {end_center}"
            )));
        }
        (end_center - apex).normalize().ok_or_else(|| {
            TreeError::InvalidGeometry(format!("Cone apex equals its end center: {apex}"))
        })
    }

    fn build(
        apex: TVec3<R>,
        axis: TVec3<R>,
        end_normal: TVec3<R>,
        end_radius: R,
        length: R,
        max_depth: u32,
    ) -> Result<Self, TreeError> {
        check_positive("Cone end radius", end_radius)?;
        check_positive("Cone length", length)?;
        let end_center = apex + axis * length;
        check_finite("Cone end center", end_center.length_squared())?;

        // extent of a disc along coordinate axis i is r * sqrt(1 - n_i^2)
        let extent = |n: R| end_radius * (R::one() - n * n).max(R::zero()).sqrt();
        let disc = TVec3::new(
            extent(end_normal.x),
            extent(end_normal.y),
            extent(end_normal.z),
        );
        let mut bounds = Aabb::from_min_max(end_center - disc, end_center + disc);
        bounds.expand(apex);

        let sphere_center = (apex + end_center) * R::half();
        let sphere_radius = length * R::half() + end_radius;

        Ok(ConeNodesChecker {
            apex,
            axis,
            end_center,
            end_normal,
            end_radius,
            length,
            max_depth,
            bounds,
            sphere_center,
            sphere_radius,
        })
    }

    pub fn apex(&self) -> TVec3<R> {
        self.apex
    }

    /// Unit vector from the apex towards the end center.
    pub fn axis_direction(&self) -> TVec3<R> {
        self.axis
    }

    pub fn end_center(&self) -> TVec3<R> {
        self.end_center
    }

    /// Unit normal of the end disc, pointing away from the apex.
    pub fn end_normal(&self) -> TVec3<R> {
        self.end_normal
    }

    pub fn end_radius(&self) -> R {
        self.end_radius
    }

    pub fn length(&self) -> R {
        self.length
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Tight axis aligned box around the cone.
    pub fn bounds(&self) -> &Aabb<R> {
        &self.bounds
    }
}

/// The cone moved so its apex is the origin.
struct LocalCone<R: Real> {
    end_center: TVec3<R>,
    end_normal: TVec3<R>,
    end_radius: R,
}

impl<R: Real> Support<R> for LocalCone<R> {
    fn support(&self, direction: TVec3<R>) -> TVec3<R> {
        // projected twice so rounding noise along the normal stays in the disc plane
        let n = self.end_normal;
        let radial = direction - n * direction.dot(n);
        let radial = radial - n * radial.dot(n);
        let rim = match radial.normalize() {
            Some(u) => self.end_center + u * self.end_radius,
            None => self.end_center,
        };

        if rim.dot(direction) >= R::zero() {
            rim
        } else {
            TVec3::zero()
        }
    }
}

impl<R: Real> GeometricTest<R> for ConeNodesChecker<R> {
    fn overlaps(&self, aabb: &Aabb<R>) -> bool {
        if !self.bounds.overlaps(aabb) {
            return false;
        }
        if aabb.distance_squared(self.sphere_center) > self.sphere_radius * self.sphere_radius {
            return false;
        }
        if aabb.contains(self.apex) || aabb.contains(self.end_center) {
            return true;
        }

        let local_box = Aabb::from_min_max(aabb.min - self.apex, aabb.max - self.apex);
        let cone = LocalCone {
            end_center: self.end_center - self.apex,
            end_normal: self.end_normal,
            end_radius: self.end_radius,
        };
        let scale = self.length + self.end_radius + aabb.size().max_element();
        let tolerance = scale * R::epsilon() * R::lit(1024.0);
        let direction = local_box.center() - cone.end_center * R::half();

        gjk::intersects(&local_box, &cone, direction, tolerance)
    }
}

impl<R: Real> NodesChecker<R> for ConeNodesChecker<R> {
    /// Tests whether a node overlaps with the volume of this cone.
    fn is_ignored(&self, scope: &Scope<R>, _is_leaf: bool, depth: u32) -> bool {
        ignores(self, scope, depth, self.max_depth)
    }
}
