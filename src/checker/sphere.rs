use crate::{
    bounding::{Aabb, Real, TVec3},
    scope::Scope,
    TreeError,
};

use super::{check_finite, check_positive, ignores, GeometricTest, NodesChecker};

/// Nodes checker testing tree nodes for overlap with a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereNodesChecker<R: Real> {
    center: TVec3<R>,
    radius: R,
    max_depth: u32,
}

impl<R: Real> SphereNodesChecker<R> {
    /// Fails with [`TreeError::InvalidGeometry`] for a non positive radius
    /// or non finite parameters.
    pub fn new(center: TVec3<R>, radius: R, max_depth: u32) -> Result<Self, TreeError> {
        check_finite("Sphere center x", center.x)?;
        check_finite("Sphere center y", center.y)?;
        check_finite("Sphere center z", center.z)?;
        check_positive("Sphere radius", radius)?;

        Ok(SphereNodesChecker {
            center,
            radius,
            max_depth,
        })
    }

    pub fn center(&self) -> TVec3<R> {
        self.center
    }

    pub fn radius(&self) -> R {
        self.radius
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl<R: Real> GeometricTest<R> for SphereNodesChecker<R> {
    #[inline]
    fn overlaps(&self, aabb: &Aabb<R>) -> bool {
        aabb.distance_squared(self.center) <= self.radius * self.radius
    }
}

impl<R: Real> NodesChecker<R> for SphereNodesChecker<R> {
    fn is_ignored(&self, scope: &Scope<R>, _is_leaf: bool, depth: u32) -> bool {
        ignores(self, scope, depth, self.max_depth)
    }
}
