use core::fmt;

use smallvec::SmallVec;

use crate::{
    bounding::{Real, TVec3},
    scope::Scope,
    NodeId, SampleId, TreeError,
};

/// Sample indices held by a leaf. Most leaves hold a handful at most.
pub type LeafSamples = SmallVec<[SampleId; 4]>;

#[derive(Clone, Debug)]
pub struct Node<R: Real> {
    pub scope: Scope<R>,
    pub ntype: NodeType,
    pub parent: Option<NodeId>,
}

impl<R: Real> Node<R> {
    pub(crate) fn from_scope(scope: Scope<R>, parent: Option<NodeId>) -> Self {
        Node {
            scope,
            parent,
            ntype: Default::default(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.ntype, NodeType::Leaf(_))
    }

    pub fn children(&self) -> Result<[NodeId; 8], TreeError> {
        match self.ntype {
            NodeType::Branch(Branch { children }) => Ok(children),
            _ => Err(TreeError::NotBranch(format!(
                "Attempt to get children of {} at {}",
                self.ntype, self.scope
            ))),
        }
    }

    pub fn samples(&self) -> Result<&[SampleId], TreeError> {
        match &self.ntype {
            NodeType::Leaf(samples) => Ok(samples),
            _ => Err(TreeError::NotLeaf(format!(
                "Attempt to get samples of {} at {}",
                self.ntype, self.scope
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum NodeType {
    Leaf(LeafSamples),
    Branch(Branch),
}

impl Default for NodeType {
    fn default() -> Self {
        NodeType::Leaf(SmallVec::new())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Leaf(samples) => write!(f, "NodeType: Leaf({} samples)", samples.len()),
            NodeType::Branch(branch) => write!(f, "NodeType: Branch({:?})", branch),
        }
    }
}

#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct Branch {
    pub children: [NodeId; 8],
}

impl Branch {
    pub(crate) fn new(children: [NodeId; 8]) -> Self {
        Branch { children }
    }

    /// Child of the octant containing `position`.
    pub fn find_child<R: Real>(&self, position: TVec3<R>, scope: &Scope<R>) -> NodeId {
        self.children[scope.octant_of(position)]
    }
}
