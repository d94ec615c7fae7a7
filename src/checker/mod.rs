//! Node checkers: predicates deciding which tree nodes a traversal skips.
//!
//! A [`NodesChecker`] answers a single question for a node's [`Scope`]:
//! should it be ignored? Internal nodes that are ignored are pruned together
//! with their whole subtree, ignored leaves are simply not visited.
//!
//! Geometric checkers ([`SphereNodesChecker`], [`ConeNodesChecker`],
//! [`BoxNodesChecker`]) implement [`GeometricTest`] and ignore a node when its
//! box does not overlap their volume or when the node lies deeper than their
//! maximum depth. Volumes are closed: a box touching the surface overlaps.
//!
//! Because every test volume is convex and a child box lies within its parent
//! box, a pruned parent never hides a child that would have been visited.
//!
//! ```rust
//! use scopetree::prelude::*;
//!
//! let checker = SphereNodesChecker::new(TVec3::splat(4.0), 1.0, 3).unwrap();
//! let scope = Scope::new(NodeId(0), TVec3::splat(8.0), 1.0, 3);
//! assert!(checker.is_ignored(&scope, true, 3));
//! ```

mod cone;
mod gjk;
mod sphere;

pub use cone::ConeNodesChecker;
pub use sphere::SphereNodesChecker;

use crate::{
    bounding::{Aabb, Real},
    flags::{NodeFlags, NodeStates},
    scope::Scope,
    tree::Tree,
    TreeError,
};

/// Decides whether a node is excluded from a traversal.
pub trait NodesChecker<R: Real> {
    /// Returns `true` when the node described by `scope` must be skipped.
    ///
    /// `is_leaf` tells whether the node has children, `depth` is the node's
    /// depth in the tree (`0` for the root).
    fn is_ignored(&self, scope: &Scope<R>, is_leaf: bool, depth: u32) -> bool;

    /// Restricts this checker to nodes of `tree` already carrying all of
    /// `required` in `states`.
    fn requiring<'s>(
        self,
        tree: &Tree<R>,
        states: &'s NodeStates,
        required: NodeFlags,
    ) -> Result<FlagFilter<'s, Self>, TreeError>
    where
        Self: Sized,
    {
        FlagFilter::new(self, tree, states, required)
    }
}

impl<R: Real, C: NodesChecker<R> + ?Sized> NodesChecker<R> for &C {
    #[inline]
    fn is_ignored(&self, scope: &Scope<R>, is_leaf: bool, depth: u32) -> bool {
        (**self).is_ignored(scope, is_leaf, depth)
    }
}

impl<R: Real, C: NodesChecker<R> + ?Sized> NodesChecker<R> for Box<C> {
    #[inline]
    fn is_ignored(&self, scope: &Scope<R>, is_leaf: bool, depth: u32) -> bool {
        (**self).is_ignored(scope, is_leaf, depth)
    }
}

/// Overlap of a closed convex volume with a box.
pub trait GeometricTest<R: Real> {
    fn overlaps(&self, aabb: &Aabb<R>) -> bool;
}

/// Shared `is_ignored` of geometric checkers.
#[inline]
pub(crate) fn ignores<R: Real, G: GeometricTest<R>>(
    test: &G,
    scope: &Scope<R>,
    depth: u32,
    max_depth: u32,
) -> bool {
    depth > max_depth || !test.overlaps(&scope.aabb())
}

pub(crate) fn check_finite<R: Real>(what: &str, value: R) -> Result<R, TreeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TreeError::InvalidGeometry(format!(
            "{what} should be finite: {value}"
        )))
    }
}

pub(crate) fn check_positive<R: Real>(what: &str, value: R) -> Result<R, TreeError> {
    if check_finite(what, value)? > R::zero() {
        Ok(value)
    } else {
        Err(TreeError::InvalidGeometry(format!(
            "{what} should be positive: {value}"
        )))
    }
}

/// Checker testing overlap with an axis aligned box.
///
/// Used to enumerate the leaves within a sub volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxNodesChecker<R: Real> {
    aabb: Aabb<R>,
    max_depth: u32,
}

impl<R: Real> BoxNodesChecker<R> {
    pub fn new(aabb: Aabb<R>, max_depth: u32) -> Result<Self, TreeError> {
        if !aabb.min.is_finite() || !aabb.max.is_finite() || !aabb.min.le(aabb.max).all() {
            return Err(TreeError::InvalidGeometry(format!("Malformed {aabb}")));
        }
        Ok(BoxNodesChecker { aabb, max_depth })
    }

    pub fn aabb(&self) -> &Aabb<R> {
        &self.aabb
    }
}

impl<R: Real> GeometricTest<R> for BoxNodesChecker<R> {
    fn overlaps(&self, aabb: &Aabb<R>) -> bool {
        self.aabb.overlaps(aabb)
    }
}

impl<R: Real> NodesChecker<R> for BoxNodesChecker<R> {
    fn is_ignored(&self, scope: &Scope<R>, _is_leaf: bool, depth: u32) -> bool {
        ignores(self, scope, depth, self.max_depth)
    }
}

/// Wraps a checker and additionally ignores nodes whose recorded flags miss
/// any of the required ones.
///
/// Internal nodes hold the union of their descendants' flags, so a branch
/// lacking a required flag can be pruned as a whole. Flags only reach a
/// [`NodeStates`] through [`Tree::classify`] and [`Tree::mark_with_ancestors`],
/// which keep that union.
#[derive(Debug)]
pub struct FlagFilter<'s, C> {
    inner: C,
    states: &'s NodeStates,
    required: NodeFlags,
}

impl<'s, C> FlagFilter<'s, C> {
    /// Fails with [`TreeError::IndexOutOfRange`] when `states` does not
    /// belong to the current build of `tree`.
    pub fn new<R: Real>(
        inner: C,
        tree: &Tree<R>,
        states: &'s NodeStates,
        required: NodeFlags,
    ) -> Result<Self, TreeError> {
        tree.check_states(states)?;
        Ok(FlagFilter {
            inner,
            states,
            required,
        })
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn required(&self) -> NodeFlags {
        self.required
    }
}

impl<R: Real, C: NodesChecker<R>> NodesChecker<R> for FlagFilter<'_, C> {
    fn is_ignored(&self, scope: &Scope<R>, is_leaf: bool, depth: u32) -> bool {
        let missing = !self
            .states
            .contains(scope.node(), self.required)
            .unwrap_or(false);
        missing || self.inner.is_ignored(scope, is_leaf, depth)
    }
}
