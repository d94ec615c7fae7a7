//! The scene [`Tree`]: an octree over the reconstruction volume.

use log::{debug, info, trace, warn};

use crate::{
    bounding::{Aabb, Real, TVec3},
    config::TreeConfig,
    flags::NodeStates,
    node::{Node, NodeType},
    pool::Pool,
    sample::Sample,
    scope::Scope,
    NodeId, SampleId, TreeError,
};

/// Octree of [`Scope`]s.
///
/// Leaves split once they hold more than
/// [`leaf_capacity`](TreeConfig::leaf_capacity) samples, until
/// [`max_depth`](TreeConfig::max_depth) is reached. Node ids are handed out in
/// creation order and stay valid until [`Tree::rebuild`].
///
/// The topology is never changed by classification; node flags live in a
/// separate [`NodeStates`] array created by [`Tree::states`].
#[derive(Clone, Debug)]
pub struct Tree<R: Real> {
    pub nodes: Pool<Node<R>>,
    pub root: NodeId,
    positions: Vec<TVec3<R>>,
    config: TreeConfig,
    generation: u32,
    leaf_count: usize,
}

impl<R: Real> Tree<R> {
    /// Creates a tree holding a single root leaf covering `bounds`.
    ///
    /// Non cubic bounds are grown to their bounding cube.
    pub fn new(bounds: Aabb<R>, config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        let root = Self::root_scope(&bounds)?;
        Ok(Tree {
            nodes: Pool::from_scope_with_capacity(root, 1),
            root: root.node(),
            positions: Vec::new(),
            config,
            generation: 0,
            leaf_count: 1,
        })
    }

    /// Creates a tree subdivided uniformly down to `depth`.
    ///
    /// Holds `8^depth` leaves, so keep `depth` small.
    pub fn uniform(bounds: Aabb<R>, depth: u32) -> Result<Self, TreeError> {
        let config = TreeConfig {
            max_depth: depth,
            ..Default::default()
        };
        let mut tree = Tree::new(bounds, config)?;

        let mut level = vec![tree.root];
        for _ in 0..depth {
            let mut next = Vec::with_capacity(level.len() * 8);
            for node in level {
                next.extend(tree.split(node));
            }
            level = next;
        }

        info!(
            "Built uniform tree: depth {depth}, {} nodes, {} leaves",
            tree.len(),
            tree.leaf_count
        );
        Ok(tree)
    }

    /// Creates a tree adapted to the sample distribution.
    ///
    /// Samples outside of `bounds` are skipped with a warning; their
    /// [`SampleId`] is still consumed so ids keep matching `samples` indices.
    pub fn from_samples(
        bounds: Aabb<R>,
        samples: &[Sample<R>],
        config: TreeConfig,
    ) -> Result<Self, TreeError> {
        let mut tree = Tree::new(bounds, config)?;
        tree.positions.reserve(samples.len());
        let skipped = tree.place_all(samples.iter().map(|s| s.position));

        info!(
            "Built scene tree from {} samples ({skipped} outside): {} nodes, {} leaves",
            samples.len(),
            tree.len(),
            tree.leaf_count
        );
        Ok(tree)
    }

    /// Drops the whole topology and builds it again from `samples`.
    ///
    /// All previously handed out [`NodeId`]s and [`NodeStates`] become stale.
    pub fn rebuild(&mut self, samples: &[Sample<R>]) {
        let root = self.nodes[self.root].scope;
        self.nodes.clear_with_scope(root);
        self.positions.clear();
        self.leaf_count = 1;
        self.generation = self.generation.wrapping_add(1);

        let skipped = self.place_all(samples.iter().map(|s| s.position));
        info!(
            "Rebuilt scene tree (generation {}) from {} samples ({skipped} outside): {} nodes",
            self.generation,
            samples.len(),
            self.len()
        );
    }

    fn root_scope(bounds: &Aabb<R>) -> Result<Scope<R>, TreeError> {
        let cube = bounds.bounding_cube();
        Aabb::new(cube.center(), cube.half_extent().x)?;
        Ok(Scope::root(bounds))
    }

    fn place_all(&mut self, positions: impl Iterator<Item = TVec3<R>>) -> usize {
        let mut skipped = 0;
        for position in positions {
            if let Err(err) = self.insert_sample(position) {
                warn!("Skipping sample: {err}");
                self.positions.push(position);
                skipped += 1;
            }
        }
        skipped
    }

    /// Inserts a sample point, splitting full leaves on the way.
    ///
    /// Returns the id of the stored sample.
    pub fn insert_sample(&mut self, position: TVec3<R>) -> Result<SampleId, TreeError> {
        let root = &self.nodes[self.root].scope;
        if !position.is_finite() || !root.aabb().contains(position) {
            return Err(TreeError::OutOfTreeBounds(format!(
                "{position} is outside of {root}"
            )));
        }

        let sample: SampleId = self.positions.len().into();
        self.positions.push(position);

        let mut node = self.root;
        loop {
            let n = &self.nodes[node];
            match &n.ntype {
                NodeType::Branch(branch) => {
                    node = branch.find_child(position, &n.scope);
                }
                NodeType::Leaf(samples) => {
                    if samples.len() < self.config.leaf_capacity
                        || n.scope.depth() >= self.config.max_depth
                    {
                        break;
                    }
                    self.split(node);
                }
            }
        }

        if let NodeType::Leaf(samples) = &mut self.nodes[node].ntype {
            samples.push(sample);
        }
        Ok(sample)
    }

    /// Turns a leaf into a branch, moving its samples into the children.
    fn split(&mut self, node: NodeId) -> [NodeId; 8] {
        let (children, old) = self.nodes.branch(node);
        self.leaf_count += 7;
        trace!("Split {}", self.nodes[node].scope);

        if let NodeType::Leaf(samples) = old {
            let scope = self.nodes[node].scope;
            for sample in samples {
                let child = children[scope.octant_of(self.positions[usize::from(sample)])];
                if let NodeType::Leaf(held) = &mut self.nodes[child].ntype {
                    held.push(sample);
                }
            }
        }
        children
    }

    /// Creates a zeroed node state array for the current topology.
    pub fn states(&self) -> NodeStates {
        debug!(
            "Allocating node states for {} nodes (generation {})",
            self.len(),
            self.generation
        );
        NodeStates::new(self.len(), self.generation)
    }

    /// Checks that `states` was created for the current topology.
    pub fn check_states(&self, states: &NodeStates) -> Result<(), TreeError> {
        if states.generation() != self.generation || states.len() != self.len() {
            return Err(TreeError::IndexOutOfRange(format!(
                "Node states of generation {} with {} nodes used with tree generation {} with {} nodes",
                states.generation(),
                states.len(),
                self.generation,
                self.len()
            )));
        }
        Ok(())
    }

    /// Number of nodes, internal ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has a root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn node(&self, node: NodeId) -> Result<&Node<R>, TreeError> {
        self.nodes.get(node).ok_or_else(|| {
            TreeError::IndexOutOfRange(format!(
                "{node} is not in the tree of {} nodes",
                self.len()
            ))
        })
    }

    pub fn scope(&self, node: NodeId) -> Result<&Scope<R>, TreeError> {
        Ok(&self.node(node)?.scope)
    }

    pub fn is_leaf(&self, node: NodeId) -> Result<bool, TreeError> {
        Ok(self.node(node)?.is_leaf())
    }

    pub fn children(&self, node: NodeId) -> Result<[NodeId; 8], TreeError> {
        self.node(node)?.children()
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(node)?.parent)
    }

    pub fn depth(&self, node: NodeId) -> Result<u32, TreeError> {
        Ok(self.node(node)?.scope.depth())
    }

    /// Sample ids held by a leaf.
    pub fn samples_in(&self, node: NodeId) -> Result<&[SampleId], TreeError> {
        self.node(node)?.samples()
    }

    pub fn sample_position(&self, sample: SampleId) -> Result<TVec3<R>, TreeError> {
        self.positions
            .get(usize::from(sample))
            .copied()
            .ok_or_else(|| {
                TreeError::IndexOutOfRange(format!(
                    "{sample} is not one of {} samples",
                    self.positions.len()
                ))
            })
    }

    /// Iterates over all leaves.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Node<R>)> {
        self.nodes.iter().filter(|(_, node)| node.is_leaf())
    }

    /// Leaf whose scope contains `position`.
    pub fn find_leaf(&self, position: TVec3<R>) -> Option<NodeId> {
        if !self.nodes[self.root].scope.aabb().contains(position) {
            return None;
        }

        let mut node = self.root;
        loop {
            let n = &self.nodes[node];
            match &n.ntype {
                NodeType::Branch(branch) => node = branch.find_child(position, &n.scope),
                NodeType::Leaf(_) => return Some(node),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Branch;

    fn bounds() -> Aabb<f64> {
        Aabb::new(TVec3::splat(8.0), 8.0).unwrap()
    }

    fn config(max_depth: u32, leaf_capacity: usize) -> TreeConfig {
        TreeConfig {
            max_depth,
            leaf_capacity,
        }
    }

    #[test]
    fn test_new() {
        let tree = Tree::new(bounds(), TreeConfig::default()).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root, NodeId(0));
        assert!(tree.is_leaf(tree.root).unwrap());
        assert_eq!(tree.parent(tree.root), Ok(None));

        let flat = Aabb::from_min_max(TVec3::zero(), TVec3::new(1.0, 1.0, 0.0));
        assert!(Tree::new(flat, TreeConfig::default()).is_ok());
        let point = Aabb::from_min_max(TVec3::zero(), TVec3::<f64>::zero());
        assert!(matches!(
            Tree::new(point, TreeConfig::default()),
            Err(TreeError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_uniform() {
        let tree = Tree::uniform(bounds(), 2).unwrap();
        assert_eq!(tree.len(), 1 + 8 + 64);
        assert_eq!(tree.leaf_count(), 64);
        assert_eq!(tree.leaves().count(), 64);
        for (_, leaf) in tree.leaves() {
            assert_eq!(leaf.scope.depth(), 2);
            assert_eq!(leaf.scope.size(), 4.0);
        }
        assert_eq!(tree.max_depth(), 2);
    }

    #[test]
    fn test_insert_splits() {
        let mut tree = Tree::new(bounds(), config(4, 2)).unwrap();

        assert_eq!(tree.insert_sample(TVec3::splat(1.0)), Ok(SampleId(0)));
        assert_eq!(tree.insert_sample(TVec3::splat(2.0)), Ok(SampleId(1)));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.samples_in(tree.root).unwrap(), &[SampleId(0), SampleId(1)]);

        // third sample splits the root, then the lower octant twice more
        assert_eq!(tree.insert_sample(TVec3::splat(3.0)), Ok(SampleId(2)));
        assert!(!tree.is_leaf(tree.root).unwrap());

        let leaf = tree.find_leaf(TVec3::splat(1.0)).unwrap();
        let held = tree.samples_in(leaf).unwrap();
        assert!(held.len() <= 2);
        assert!(held.contains(&SampleId(0)));

        let mut total = 0;
        for (id, node) in tree.leaves() {
            let samples = node.samples().unwrap();
            total += samples.len();
            for s in samples {
                assert!(node.scope.aabb().contains(tree.sample_position(*s).unwrap()));
                assert_eq!(tree.find_leaf(tree.sample_position(*s).unwrap()), Some(id));
            }
        }
        assert_eq!(total, 3);
        assert_eq!(tree.leaf_count(), tree.leaves().count());
    }

    #[test]
    fn test_depth_limit_keeps_samples() {
        let mut tree = Tree::new(bounds(), config(1, 1)).unwrap();
        for _ in 0..5 {
            tree.insert_sample(TVec3::splat(1.0)).unwrap();
        }
        let leaf = tree.find_leaf(TVec3::splat(1.0)).unwrap();
        assert_eq!(tree.scope(leaf).unwrap().depth(), 1);
        assert_eq!(tree.samples_in(leaf).unwrap().len(), 5);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut tree = Tree::new(bounds(), TreeConfig::default()).unwrap();
        assert!(matches!(
            tree.insert_sample(TVec3::splat(17.0)),
            Err(TreeError::OutOfTreeBounds(_))
        ));
        assert!(tree.insert_sample(TVec3::new(f64::NAN, 1.0, 1.0)).is_err());
        assert_eq!(tree.find_leaf(TVec3::splat(-1.0)), None);
    }

    #[test]
    fn test_queries_out_of_range() {
        let tree = Tree::uniform(bounds(), 1).unwrap();
        assert!(matches!(
            tree.scope(NodeId(9)),
            Err(TreeError::IndexOutOfRange(_))
        ));
        assert!(tree.scope(NodeId(8)).is_ok());
        assert_eq!(tree.depth(NodeId(8)), Ok(1));
        assert!(tree.depth(NodeId(9)).is_err());
        assert!(matches!(
            tree.children(NodeId(3)),
            Err(TreeError::NotBranch(_))
        ));
        assert!(matches!(
            tree.samples_in(NodeId(0)),
            Err(TreeError::NotLeaf(_))
        ));
        assert_eq!(
            tree.nodes[tree.root].ntype,
            NodeType::Branch(Branch::new(std::array::from_fn(|i| NodeId(i as u32 + 1))))
        );
        assert!(tree.sample_position(SampleId(0)).is_err());
    }

    #[test]
    fn test_rebuild_invalidates_states() {
        let samples: Vec<Sample<f64>> = (0..20)
            .map(|i| {
                Sample::new(
                    TVec3::new(i as f64 * 0.7, 3.0, 5.0),
                    TVec3::unit_z(),
                    0.1,
                    0,
                )
                .unwrap()
            })
            .collect();
        let mut tree = Tree::from_samples(bounds(), &samples, config(6, 2)).unwrap();
        let states = tree.states();
        assert_eq!(tree.check_states(&states), Ok(()));

        tree.rebuild(&samples[..10]);
        assert_eq!(tree.generation(), 1);
        assert!(matches!(
            tree.check_states(&states),
            Err(TreeError::IndexOutOfRange(_))
        ));
        assert_eq!(tree.check_states(&tree.states()), Ok(()));
    }

    #[test]
    fn test_from_samples_skips_outside() {
        let samples = vec![
            Sample::new(TVec3::splat(1.0), TVec3::unit_z(), 0.1, 0).unwrap(),
            Sample::new(TVec3::splat(40.0), TVec3::unit_z(), 0.1, 0).unwrap(),
            Sample::new(TVec3::splat(2.0), TVec3::unit_z(), 0.1, 0).unwrap(),
        ];
        let tree = Tree::from_samples(bounds(), &samples, config(6, 1)).unwrap();
        assert_eq!(tree.sample_position(SampleId(2)), Ok(TVec3::splat(2.0)));
        assert_eq!(tree.sample_position(SampleId(1)), Ok(TVec3::splat(40.0)));

        let held: usize = tree.leaves().map(|(_, n)| n.samples().unwrap().len()).sum();
        assert_eq!(held, 2);
    }
}
