//! Spatial classification engine for multi-view surface reconstruction.
//!
//! A scene [`tree`](tree::Tree) subdivides the reconstruction volume into
//! cubic cells ([`Scope`](scope::Scope)s). Pluggable
//! [`node checkers`](checker::NodesChecker) decide which cells a traversal
//! visits, and the traversal records per cell [`flags`](flags::NodeFlags):
//!
//! - `EMPTINESS`: a camera looked through the cell before reaching a sample,
//! - `OCCUPANCY`: the cell lies right behind an observed surface,
//! - `SAMPLENESS`: the cell directly contains a sample point.
//!
//! Flags are only ever added with atomic `OR`s, so classification passes can
//! run in any order and in parallel; the result is their union.
//!
//! ## Available checkers:
//!
//! - [`Sphere`](checker::SphereNodesChecker)
//! - [`Oblique truncated cone`](checker::ConeNodesChecker)
//! - [`Axis aligned box`](checker::BoxNodesChecker)
//! - [`Flag filter`](checker::FlagFilter) over any of the above
//!
//! ## Optimizations:
//!
//! - Tree structure is a flat [`Pool`](pool::Pool) addressed by [`NodeId`].
//! - Subtrees disjoint from a checker's volume are pruned as a whole.
//! - Traversal uses a [`heapless`] stack, leaves keep samples in [`smallvec`]s.
//! - Exact box against cone test via GJK, after cheap box and sphere rejects.
//!
//! ## Example
//!
//! ```rust
//! use scopetree::prelude::*;
//!
//! fn main() -> Result<(), TreeError> {
//!     let bounds = Aabb::new(TVec3::splat(4.0), 4.0)?;
//!     let tree = Tree::uniform(bounds, 3)?;
//!     let states = tree.states();
//!
//!     let sphere = SphereNodesChecker::new(TVec3::splat(4.0), 1.0, tree.max_depth())?;
//!     let marked = tree.classify(&sphere, &states, NodeFlags::OCCUPANCY)?;
//!     assert_eq!(marked, 32);
//!
//!     // restrict a second pass to cells the first one marked
//!     let cone = ConeNodesChecker::new(
//!         TVec3::new(4.0, 4.0, 20.0),
//!         TVec3::splat(4.0),
//!         0.5,
//!         16.0,
//!         tree.max_depth(),
//!     )?;
//!     let filtered = cone.requiring(&tree, &states, NodeFlags::OCCUPANCY)?;
//!     tree.classify(&filtered, &states, NodeFlags::EMPTINESS)?;
//!
//!     for (leaf, _) in tree.leaves() {
//!         let flags = states.get(leaf)?;
//!         assert!(!flags.contains(NodeFlags::EMPTINESS) || flags.contains(NodeFlags::OCCUPANCY));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Run the carving demo:
//!
//! ```sh
//! cargo run --release --example carve
//! ```
//!
//! ## Check yourself list:
//!
//! - tests
//!
//!   ```sh
//!   cargo test --all-targets --all-features --release
//!   ```
//!
//! - benchmark
//!
//!   ```sh
//!   cargo bench
//!   ```

#[cfg(feature = "bevy")]
pub mod bevy_integration;
pub mod bounding;
pub mod camera;
pub mod carving;
pub mod checker;
pub mod config;
pub mod flags;
pub mod node;
pub mod pool;
pub mod prelude;
pub mod sample;
pub mod scope;
mod traverse;
pub mod tree;

use std::fmt;

use thiserror::Error;

/// Index [`tree.nodes`](pool::Pool) and [`node states`](flags::NodeStates) with it.
///
/// Stable for the lifetime of a tree build.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        value.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        NodeId(value as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId {}", self.0)
    }
}

/// Index of a sample point stored in a [`tree`](tree::Tree).
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SampleId(pub u32);

impl From<SampleId> for usize {
    fn from(value: SampleId) -> Self {
        value.0 as usize
    }
}

impl From<usize> for SampleId {
    fn from(value: usize) -> Self {
        SampleId(value as u32)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleId: {}", self.0)
    }
}

/// Enum of all possible errors of the tree's operations.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// Degenerate or non finite checker, camera or bounds parameters.
    #[error("Invalid geometry. {0}")]
    InvalidGeometry(String),

    /// Node id unknown to the tree or to a state array, usually after a rebuild.
    #[error("Index out of range. {0}")]
    IndexOutOfRange(String),

    /// Point is out of bounds of the tree's root scope.
    #[error("Out of tree bounds. {0}")]
    OutOfTreeBounds(String),

    /// Attempt to treat a [`Node`](node::Node) of different type
    /// as a [`Branch`](node::NodeType::Branch).
    #[error("Node is not a Branch. {0}")]
    NotBranch(String),

    /// Attempt to treat a [`Node`](node::Node) of different type
    /// as a [`Leaf`](node::NodeType::Leaf).
    #[error("Node is not a Leaf. {0}")]
    NotLeaf(String),

    /// Configuration values out of their allowed range.
    #[error("Invalid configuration. {0}")]
    InvalidConfig(String),
}
