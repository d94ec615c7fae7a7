//! Node classification flags and the shared per-node state array.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{NodeId, TreeError};

bitflags! {
    /// Classification outcomes accumulated on a node.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        /// Seen through by at least one camera before reaching a sample.
        const EMPTINESS  = 0x1 << 0;
        /// Lies behind an observed surface.
        const OCCUPANCY  = 0x1 << 1;
        /// Directly contains a sample point.
        const SAMPLENESS = 0x1 << 2;
    }
}

impl Serialize for NodeFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for NodeFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(NodeFlags::from_bits_truncate)
    }
}

/// Per node [`NodeFlags`] of one tree build.
///
/// Indexed by [`NodeId`]. Updates are atomic `OR`s, so any number of
/// classification passes may mark concurrently through a shared reference.
/// Flags are never removed except by [`NodeStates::reset`].
#[derive(Debug)]
pub struct NodeStates {
    states: Vec<AtomicU32>,
    generation: u32,
}

impl NodeStates {
    pub(crate) fn new(len: usize, generation: u32) -> Self {
        NodeStates {
            states: (0..len).map(|_| AtomicU32::new(0)).collect(),
            generation,
        }
    }

    /// Build generation of the tree this array was created for.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    fn slot(&self, node: NodeId) -> Result<&AtomicU32, TreeError> {
        self.states.get(usize::from(node)).ok_or_else(|| {
            TreeError::IndexOutOfRange(format!(
                "{node} is outside of node states of length {}",
                self.states.len()
            ))
        })
    }

    /// Flags recorded for `node`.
    pub fn get(&self, node: NodeId) -> Result<NodeFlags, TreeError> {
        Ok(NodeFlags::from_bits_retain(
            self.slot(node)?.load(Ordering::Relaxed),
        ))
    }

    /// Whether `node` carries every flag of `required`.
    pub fn contains(&self, node: NodeId, required: NodeFlags) -> Result<bool, TreeError> {
        Ok(self.get(node)?.contains(required))
    }

    /// ORs `flags` into `node`. Returns the flags the node had before.
    ///
    /// Leaves ancestors untouched; outside of the crate flags are marked
    /// through [`Tree::mark_with_ancestors`](crate::tree::Tree::mark_with_ancestors).
    pub(crate) fn mark(&self, node: NodeId, flags: NodeFlags) -> Result<NodeFlags, TreeError> {
        let previous = self.slot(node)?.fetch_or(flags.bits(), Ordering::Relaxed);
        Ok(NodeFlags::from_bits_retain(previous))
    }

    /// Clears every node.
    pub fn reset(&mut self) {
        for state in self.states.iter_mut() {
            *state.get_mut() = 0;
        }
    }

    /// Number of nodes carrying all of `flags`.
    pub fn count_with(&self, flags: NodeFlags) -> usize {
        self.states
            .iter()
            .filter(|s| NodeFlags::from_bits_retain(s.load(Ordering::Relaxed)).contains(flags))
            .count()
    }

    /// Plain copy of all states, indexed by node.
    pub fn snapshot(&self) -> Vec<NodeFlags> {
        self.states
            .iter()
            .map(|s| NodeFlags::from_bits_retain(s.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_union() {
        let states = NodeStates::new(4, 0);
        assert_eq!(states.get(NodeId(2)), Ok(NodeFlags::empty()));

        assert_eq!(
            states.mark(NodeId(2), NodeFlags::EMPTINESS),
            Ok(NodeFlags::empty())
        );
        assert_eq!(
            states.mark(NodeId(2), NodeFlags::OCCUPANCY),
            Ok(NodeFlags::EMPTINESS)
        );
        assert_eq!(
            states.get(NodeId(2)),
            Ok(NodeFlags::EMPTINESS | NodeFlags::OCCUPANCY)
        );

        // idempotent
        states.mark(NodeId(2), NodeFlags::OCCUPANCY).unwrap();
        assert_eq!(
            states.get(NodeId(2)),
            Ok(NodeFlags::EMPTINESS | NodeFlags::OCCUPANCY)
        );
        assert_eq!(states.count_with(NodeFlags::OCCUPANCY), 1);
        assert_eq!(states.count_with(NodeFlags::empty()), 4);
    }

    #[test]
    fn test_out_of_range() {
        let states = NodeStates::new(2, 0);
        assert!(matches!(
            states.get(NodeId(2)),
            Err(TreeError::IndexOutOfRange(_))
        ));
        assert!(states.mark(NodeId(7), NodeFlags::SAMPLENESS).is_err());
    }

    #[test]
    fn test_reset() {
        let mut states = NodeStates::new(3, 0);
        states.mark(NodeId(0), NodeFlags::all()).unwrap();
        states.reset();
        assert_eq!(states.snapshot(), vec![NodeFlags::empty(); 3]);
    }

    #[test]
    fn test_concurrent_marks() {
        let states = NodeStates::new(1, 0);
        std::thread::scope(|s| {
            s.spawn(|| states.mark(NodeId(0), NodeFlags::EMPTINESS));
            s.spawn(|| states.mark(NodeId(0), NodeFlags::OCCUPANCY));
            s.spawn(|| states.mark(NodeId(0), NodeFlags::SAMPLENESS));
        });
        assert_eq!(states.get(NodeId(0)), Ok(NodeFlags::all()));
    }

    #[test]
    fn test_flags_serde() {
        let flags = NodeFlags::EMPTINESS | NodeFlags::SAMPLENESS;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "5");
        assert_eq!(serde_json::from_str::<NodeFlags>(&json).unwrap(), flags);
    }
}
