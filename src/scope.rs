//! [`Scope`]: the spatial extent of one tree node.

use std::{array::from_fn, fmt};

use crate::{
    bounding::{Aabb, Real, TVec3},
    NodeId,
};

/// Cubic cell of the scene tree.
///
/// Identifies the node it belongs to, its center, half size and depth
/// (`0` for the root). Never changes once the tree created it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scope<R: Real> {
    node: NodeId,
    center: TVec3<R>,
    half_size: R,
    depth: u32,
}

impl<R: Real> Scope<R> {
    pub fn new(node: NodeId, center: TVec3<R>, half_size: R, depth: u32) -> Self {
        Scope {
            node,
            center,
            half_size,
            depth,
        }
    }

    /// Root scope covering `aabb`'s bounding cube.
    pub fn root(aabb: &Aabb<R>) -> Self {
        let cube = aabb.bounding_cube();
        Scope::new(NodeId(0), cube.center(), cube.half_extent().x, 0)
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn center(&self) -> TVec3<R> {
        self.center
    }

    #[inline]
    pub fn half_size(&self) -> R {
        self.half_size
    }

    #[inline]
    pub fn size(&self) -> R {
        self.half_size * R::two()
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn min(&self) -> TVec3<R> {
        self.center - TVec3::splat(self.half_size)
    }

    #[inline]
    pub fn max(&self) -> TVec3<R> {
        self.center + TVec3::splat(self.half_size)
    }

    #[inline]
    pub fn aabb(&self) -> Aabb<R> {
        Aabb::from_min_max(self.min(), self.max())
    }

    /// Octant of `position` relative to the center, in child order.
    #[inline]
    pub fn octant_of(&self, position: TVec3<R>) -> usize {
        let x = usize::from(position.x >= self.center.x);
        let y = usize::from(position.y >= self.center.y);
        let z = usize::from(position.z >= self.center.z);
        x | y << 1 | z << 2
    }

    /// Child scopes in octant order, bit 0 = +x, bit 1 = +y, bit 2 = +z.
    ///
    /// `ids` gives the node id of each child.
    pub fn children(&self, ids: [NodeId; 8]) -> [Scope<R>; 8] {
        let quarter = self.half_size * R::half();
        from_fn(|i| {
            let offset = TVec3::new(
                if i & 0b1 != 0 { quarter } else { -quarter },
                if i & 0b10 != 0 { quarter } else { -quarter },
                if i & 0b100 != 0 { quarter } else { -quarter },
            );
            Scope::new(ids[i], self.center + offset, quarter, self.depth + 1)
        })
    }
}

impl<R: Real> fmt::Display for Scope<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scope({}, depth: {}, center: {}, half size: {})",
            self.node, self.depth, self.center, self.half_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_contained() {
        let root = Scope::new(NodeId(0), TVec3::splat(4.0f64), 4.0, 0);
        let ids = from_fn(|i| NodeId(i as u32 + 1));
        let children = root.children(ids);

        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.depth(), 1);
            assert_eq!(child.node(), NodeId(i as u32 + 1));
            assert_eq!(child.half_size(), 2.0);
            assert!(root.aabb().encloses(&child.aabb()));
            assert_eq!(root.aabb().octant(i), child.aabb());
            assert_eq!(root.octant_of(child.center()), i);
        }
    }

    #[test]
    fn test_root_from_box() {
        let aabb = Aabb::from_min_max(TVec3::new(0.0, 0.0, 0.0), TVec3::new(4.0, 2.0, 1.0f32));
        let root = Scope::root(&aabb);
        assert_eq!(root.center(), TVec3::new(2.0, 1.0, 0.5));
        assert_eq!(root.half_size(), 2.0);
        assert!(root.aabb().encloses(&aabb));
    }
}
