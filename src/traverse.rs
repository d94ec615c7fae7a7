//! Pruned traversals of the [`Tree`] driven by a [`NodesChecker`].

use heapless::Vec as HVec;
use log::trace;

use crate::{
    bounding::{Aabb, Real},
    checker::{BoxNodesChecker, NodesChecker},
    flags::{NodeFlags, NodeStates},
    node::{Node, NodeType},
    tree::Tree,
    NodeId, TreeError,
};

const STACK_SIZE: usize = 32;

impl<R: Real> Tree<R> {
    /// Calls `visit` for every leaf the checker does not ignore.
    ///
    /// A branch ignored by the checker is skipped together with its whole
    /// subtree. Leaves are reported in depth first order.
    ///
    /// ```rust
    /// use scopetree::prelude::*;
    ///
    /// let tree = Tree::uniform(Aabb::new(TVec3::splat(2.0), 2.0).unwrap(), 2).unwrap();
    /// let sphere = SphereNodesChecker::new(TVec3::splat(0.5), 0.25, 2).unwrap();
    ///
    /// let mut leaves = Vec::new();
    /// tree.traverse(&sphere, |leaf| leaves.push(leaf.scope.node()));
    /// assert_eq!(leaves.len(), 1);
    /// ```
    pub fn traverse<C, F>(&self, checker: &C, mut visit: F)
    where
        C: NodesChecker<R> + ?Sized,
        F: FnMut(&Node<R>),
    {
        self.rtraverse(self.root, checker, &mut visit);
    }

    fn rtraverse<C, F>(&self, node: NodeId, checker: &C, visit: &mut F)
    where
        C: NodesChecker<R> + ?Sized,
        F: FnMut(&Node<R>),
    {
        // Heapless stack first, recursion once it is full.
        let mut stack = HVec::<NodeId, STACK_SIZE>::new();
        let mut next = Some(node);
        while let Some(node) = next.take().or_else(|| stack.pop()) {
            let n = &self.nodes[node];
            let is_leaf = n.is_leaf();
            if checker.is_ignored(&n.scope, is_leaf, n.scope.depth()) {
                continue;
            }

            match &n.ntype {
                NodeType::Leaf(_) => visit(n),
                NodeType::Branch(branch) => {
                    let mut iter = branch.children.iter();
                    while let Some(child) = iter.next() {
                        if stack.push(*child).is_err() {
                            self.rtraverse(*child, checker, visit);
                            for child in iter.by_ref() {
                                self.rtraverse(*child, checker, visit);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Marks `flags` on every leaf the checker does not ignore.
    ///
    /// Ancestors of a marked leaf receive the same flags, so an internal node
    /// always holds the union of its descendants' flags. Marking only adds
    /// bits: repeating a pass changes nothing, and passes may run in any order
    /// or concurrently on the same `states`.
    ///
    /// Returns the number of leaves visited. Fails with
    /// [`TreeError::IndexOutOfRange`] when `states` belongs to another build.
    pub fn classify<C>(
        &self,
        checker: &C,
        states: &NodeStates,
        flags: NodeFlags,
    ) -> Result<usize, TreeError>
    where
        C: NodesChecker<R> + ?Sized,
    {
        self.check_states(states)?;

        let mut visited = 0;
        let mut failure = None;
        self.traverse(checker, |leaf| {
            visited += 1;
            if let Err(err) = self.mark_with_ancestors(leaf.scope.node(), states, flags) {
                failure.get_or_insert(err);
            }
        });

        match failure {
            Some(err) => Err(err),
            None => {
                trace!("Classified {visited} leaves as {flags:?}");
                Ok(visited)
            }
        }
    }

    /// Marks `flags` on `node` and on its ancestors.
    ///
    /// Stops at the first ancestor which already had all of them, since its
    /// own ancestors do too.
    pub fn mark_with_ancestors(
        &self,
        node: NodeId,
        states: &NodeStates,
        flags: NodeFlags,
    ) -> Result<(), TreeError> {
        let mut current = Some(node);
        while let Some(node) = current {
            if states.mark(node, flags)?.contains(flags) {
                break;
            }
            current = self.node(node)?.parent;
        }
        Ok(())
    }

    /// Leaves overlapping `aabb`, sorted by id.
    pub fn leaves_in(&self, aabb: &Aabb<R>) -> Result<Vec<NodeId>, TreeError> {
        let checker = BoxNodesChecker::new(*aabb, self.max_depth())?;
        let mut leaves = Vec::new();
        self.traverse(&checker, |leaf| leaves.push(leaf.scope.node()));
        leaves.sort_unstable();
        Ok(leaves)
    }
}
