//! Crate's core types reimports.

pub use crate::{
    bounding::{Aabb, Real, TVec3},
    camera::{CameraData, Quaternion},
    carving::{Carver, CarvingReport, PassKind},
    checker::{
        BoxNodesChecker, ConeNodesChecker, FlagFilter, GeometricTest, NodesChecker,
        SphereNodesChecker,
    },
    config::{CarvingConfig, TreeConfig},
    flags::{NodeFlags, NodeStates},
    node::{Node, NodeType},
    sample::Sample,
    scope::Scope,
    tree::Tree,
    NodeId, SampleId, TreeError,
};
