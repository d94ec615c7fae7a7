//! [`Pool`] implementation.
//!
//! Flat arena of tree nodes. A node keeps its index for the whole life of
//! the pool; indices are only reused after [`Pool::clear_with_scope`].

use std::{
    iter::Enumerate,
    ops::{Index, IndexMut},
};

use crate::{
    bounding::Real,
    node::{Branch, Node, NodeType},
    scope::Scope,
    NodeId,
};

/// [`Pool`] data structure.
#[derive(Clone, Debug)]
pub struct Pool<T> {
    pub(crate) vec: Vec<T>,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Pool {
            vec: Default::default(),
        }
    }
}

/// Indexing a [`pool`](Pool) of [`nodes`](Node) with [`NodeId`]
///
/// ```ignore
/// let node = &tree.nodes[NodeId(42)];
/// ```
impl<T> Index<NodeId> for Pool<T> {
    type Output = T;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.vec[usize::from(index)]
    }
}

impl<T> IndexMut<NodeId> for Pool<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.vec[usize::from(index)]
    }
}

impl<T> Pool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Pool {
            vec: Vec::with_capacity(capacity),
        }
    }

    #[inline(always)]
    pub(crate) fn insert(&mut self, t: T) -> NodeId {
        self.vec.push(t);
        (self.vec.len() - 1).into()
    }

    /// Returns the number of items.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    #[inline(always)]
    pub fn get(&self, index: NodeId) -> Option<&T> {
        self.vec.get(usize::from(index))
    }

    /// Returns a [`PoolIterator`], which iterates over items and their ids.
    pub fn iter(&self) -> PoolIterator<T> {
        PoolIterator {
            inner: self.vec.iter().enumerate(),
        }
    }
}

impl<R: Real> Pool<Node<R>> {
    /// Construct a [`Pool`] holding a single root leaf.
    pub(crate) fn from_scope_with_capacity(root: Scope<R>, capacity: usize) -> Self {
        let mut pool = Pool::with_capacity(capacity.max(1));
        pool.insert(Node::from_scope(root, None));
        pool
    }

    /// Drops every node and restarts with a root leaf.
    pub(crate) fn clear_with_scope(&mut self, root: Scope<R>) {
        self.vec.clear();
        self.insert(Node::from_scope(root, None));
    }

    /// Turns leaf `parent` into a branch with eight empty leaf children.
    ///
    /// Returns the children ids; the samples the leaf held are returned to be
    /// redistributed by the caller.
    pub(crate) fn branch(&mut self, parent: NodeId) -> ([NodeId; 8], NodeType) {
        let first = self.vec.len();
        let ids: [NodeId; 8] = std::array::from_fn(|i| (first + i).into());
        let scopes = self[parent].scope.children(ids);
        for scope in scopes {
            self.insert(Node::from_scope(scope, Some(parent)));
        }
        let old = std::mem::replace(
            &mut self[parent].ntype,
            NodeType::Branch(Branch::new(ids)),
        );
        (ids, old)
    }
}

/// Iterates over `(NodeId, &T)` pairs.
pub struct PoolIterator<'pool, T> {
    inner: Enumerate<std::slice::Iter<'pool, T>>,
}

impl<'pool, T> Iterator for PoolIterator<'pool, T> {
    type Item = (NodeId, &'pool T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(i, item)| (i.into(), item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for PoolIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T> std::iter::FusedIterator for PoolIterator<'_, T> {}
