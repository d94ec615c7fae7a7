//! [Bevy](https://docs.rs/bevy/) game engine integrations.
//!
//! Adds the [Bevy](https://docs.rs/bevy/) game engine as a dependency.
//!
//! - conversions of [`Aabb`], [`Scope`] and [`TVec3`] into engine types,
//! - [`BoundingSphere`] and [`Aabb3d`] used directly as [`NodesChecker`]s,
//! - [ray](RayCast3d) [queries](Tree::ray_cast) of classified leaves.
//!
//! ```ignore
//! let ray = RayCast3d::new(Vec3A::new(4.5, 4.5, 20.0), Dir3A::NEG_Z, 30.0);
//! let hit = tree.ray_cast(&ray, &states, NodeFlags::OCCUPANCY)?;
//! ```

use bevy::math::{
    bounding::{Aabb3d, BoundingSphere, IntersectsVolume, RayCast3d},
    Vec3, Vec3A,
};

use crate::{
    bounding::{Aabb, TVec3},
    checker::NodesChecker,
    flags::{NodeFlags, NodeStates},
    node::NodeType,
    scope::Scope,
    tree::Tree,
    NodeId, TreeError,
};

impl Tree<f32> {
    /// Closest leaf hit by `ray` among the leaves carrying all of `required`.
    ///
    /// Branches whose flags lack `required` are skipped as a whole. Fails with
    /// [`TreeError::IndexOutOfRange`] when `states` belongs to another build.
    pub fn ray_cast(
        &self,
        ray: &RayCast3d,
        states: &NodeStates,
        required: NodeFlags,
    ) -> Result<HitResult, TreeError> {
        self.check_states(states)?;
        let mut hit = HitResult::default();
        self.recursive_ray_cast(self.root, ray, states, required, &mut hit);
        Ok(hit)
    }

    fn recursive_ray_cast(
        &self,
        node: NodeId,
        ray: &RayCast3d,
        states: &NodeStates,
        required: NodeFlags,
        hit: &mut HitResult,
    ) {
        if !states.contains(node, required).unwrap_or(false) {
            return;
        }

        let n = &self.nodes[node];
        let aabb: Aabb3d = (&n.scope).into();
        let Some(distance) = ray.aabb_intersection_at(&aabb) else {
            return;
        };
        if hit.node.is_some() && distance > hit.distance {
            return;
        }

        match &n.ntype {
            NodeType::Branch(branch) => {
                for child in branch.children {
                    self.recursive_ray_cast(child, ray, states, required, hit);
                }
            }
            NodeType::Leaf(_) => {
                if hit.node.is_none() || distance < hit.distance {
                    hit.node = Some(node);
                    hit.distance = distance;
                }
            }
        }
    }
}

/// Ray cast result.
///
/// Contains `Some(`[NodeId]`)` of the hit leaf, [None] otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub node: Option<NodeId>,
    pub distance: f32,
}

impl From<TVec3<f32>> for Vec3A {
    fn from(value: TVec3<f32>) -> Self {
        Vec3A::new(value.x, value.y, value.z)
    }
}

impl From<TVec3<f32>> for Vec3 {
    fn from(value: TVec3<f32>) -> Self {
        Vec3::new(value.x, value.y, value.z)
    }
}

impl From<Vec3> for TVec3<f32> {
    fn from(value: Vec3) -> Self {
        TVec3::new(value.x, value.y, value.z)
    }
}

impl From<Aabb<f32>> for Aabb3d {
    fn from(value: Aabb<f32>) -> Self {
        Aabb3d {
            min: value.min.into(),
            max: value.max.into(),
        }
    }
}

impl From<&Scope<f32>> for Aabb3d {
    fn from(value: &Scope<f32>) -> Self {
        value.aabb().into()
    }
}

/// Ignores nodes outside of the sphere.
impl NodesChecker<f32> for BoundingSphere {
    fn is_ignored(&self, scope: &Scope<f32>, _is_leaf: bool, _depth: u32) -> bool {
        !self.intersects(&Aabb3d::from(scope))
    }
}

/// Ignores nodes outside of the box.
impl NodesChecker<f32> for Aabb3d {
    fn is_ignored(&self, scope: &Scope<f32>, _is_leaf: bool, _depth: u32) -> bool {
        !self.intersects(&Aabb3d::from(scope))
    }
}
