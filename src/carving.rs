//! Space carving: classifies the tree from cameras and their samples.
//!
//! A run marks, in this order:
//!
//! 1. `SAMPLENESS` on the leaves holding a sample,
//! 2. `EMPTINESS` along a cone from each sample's camera up to just before
//!    the sample, where the camera saw through free space,
//! 3. `OCCUPANCY` along a cone starting at each sample and leading away from
//!    its camera, right behind the observed surface.
//!
//! Every (camera, sample) pair is one pass. Passes only OR flags into the
//! shared [`NodeStates`], so within a family they run in parallel on the
//! rayon pool and the result does not depend on the sample order.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    bounding::Real,
    camera::CameraData,
    checker::{ConeNodesChecker, NodesChecker},
    config::CarvingConfig,
    flags::{NodeFlags, NodeStates},
    sample::Sample,
    tree::Tree,
    TreeError,
};

/// The two cone pass families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Emptiness,
    Occupancy,
}

impl PassKind {
    pub fn flags(&self) -> NodeFlags {
        match self {
            PassKind::Emptiness => NodeFlags::EMPTINESS,
            PassKind::Occupancy => NodeFlags::OCCUPANCY,
        }
    }
}

/// Outcome counters of a carving run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CarvingReport {
    /// Cone passes which ran to completion.
    pub passes: usize,
    /// Passes whose cone could not be built. They left the states untouched.
    pub rejected: usize,
    /// Passes without a usable camera: unknown view or sample behind it.
    pub skipped: usize,
    /// Samples inside the tree whose leaf got marked `SAMPLENESS`.
    pub sample_leaves: usize,
    /// Leaves visited over all cone passes.
    pub marked_leaves: usize,
    /// The run stopped early; states under-report.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CarvingReport {
    fn merge(mut self, other: CarvingReport) -> CarvingReport {
        self.passes += other.passes;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
        self.sample_leaves += other.sample_leaves;
        self.marked_leaves += other.marked_leaves;
        self.cancelled |= other.cancelled;
        self
    }
}

/// Runs the carving passes of a set of views over a [`Tree`].
///
/// ```rust
/// use scopetree::prelude::*;
///
/// let tree = Tree::uniform(Aabb::new(TVec3::splat(4.0), 4.0).unwrap(), 3).unwrap();
/// let camera =
///     CameraData::looking_at(0, TVec3::new(4.0, 4.0, 20.0), TVec3::splat(4.0), 1.0).unwrap();
/// let sample = Sample::new(TVec3::new(4.0, 4.0, 6.0), TVec3::unit_z(), 0.5, 0).unwrap();
///
/// let cameras = [camera];
/// let samples = [sample];
/// let carver = Carver::new(&tree, &cameras, &samples, CarvingConfig::default()).unwrap();
/// let (states, report) = carver.run().unwrap();
///
/// assert_eq!(report.passes, 2);
/// let leaf = tree.find_leaf(sample.position).unwrap();
/// assert!(states.contains(leaf, NodeFlags::SAMPLENESS).unwrap());
/// ```
pub struct Carver<'a, R: Real> {
    tree: &'a Tree<R>,
    samples: &'a [Sample<R>],
    cameras: HashMap<u32, &'a CameraData<R>>,
    config: CarvingConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, R: Real> Carver<'a, R> {
    pub fn new(
        tree: &'a Tree<R>,
        cameras: &'a [CameraData<R>],
        samples: &'a [Sample<R>],
        config: CarvingConfig,
    ) -> Result<Self, TreeError> {
        config.validate()?;

        let mut by_view = HashMap::with_capacity(cameras.len());
        for camera in cameras {
            if by_view.insert(camera.view_id, camera).is_some() {
                warn!("Several cameras with view id {}, using the last one", camera.view_id);
            }
        }

        Ok(Carver {
            tree,
            samples,
            cameras: by_view,
            config,
            cancel: None,
        })
    }

    /// Stops the run once `cancel` is set. Checked before every pass.
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &CarvingConfig {
        &self.config
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.load(Ordering::Relaxed))
    }

    fn max_depth(&self) -> u32 {
        self.config.max_depth.unwrap_or(self.tree.max_depth())
    }

    /// Carves into fresh node states.
    pub fn run(&self) -> Result<(NodeStates, CarvingReport), TreeError> {
        let states = self.tree.states();
        let report = self.run_into(&states)?;
        Ok((states, report))
    }

    /// Carves into `states`, keeping the flags it already holds.
    pub fn run_into(&self, states: &NodeStates) -> Result<CarvingReport, TreeError> {
        self.tree.check_states(states)?;
        let start = Instant::now();
        info!(
            "Carving {} samples seen by {} cameras",
            self.samples.len(),
            self.cameras.len()
        );

        let mut report = CarvingReport::default();
        if self.config.mark_samples {
            report = report.merge(self.mark_samples(states)?);
        }
        for kind in [PassKind::Emptiness, PassKind::Occupancy] {
            if report.cancelled {
                break;
            }
            report = report.merge(self.run_family(kind, states)?);
        }

        report.elapsed = start.elapsed();
        info!(
            "Carving done in {:?}: {} passes, {} rejected, {} skipped, {} leaves marked{}",
            report.elapsed,
            report.passes,
            report.rejected,
            report.skipped,
            report.marked_leaves,
            if report.cancelled { ", cancelled" } else { "" }
        );
        Ok(report)
    }

    /// Marks `SAMPLENESS` on the leaf containing each sample.
    pub fn mark_samples(&self, states: &NodeStates) -> Result<CarvingReport, TreeError> {
        self.tree.check_states(states)?;
        let mut report = CarvingReport::default();
        for sample in self.samples {
            if self.cancelled() {
                report.cancelled = true;
                break;
            }
            if let Some(leaf) = self.tree.find_leaf(sample.position) {
                self.tree
                    .mark_with_ancestors(leaf, states, NodeFlags::SAMPLENESS)?;
                report.sample_leaves += 1;
            }
        }
        debug!("Marked {} sample leaves", report.sample_leaves);
        Ok(report)
    }

    /// Runs one pass per sample for the given family.
    pub fn run_family(&self, kind: PassKind, states: &NodeStates) -> Result<CarvingReport, TreeError> {
        self.tree.check_states(states)?;
        let report = if self.config.parallel {
            self.samples
                .par_iter()
                .map(|sample| self.pass(kind, sample, states))
                .try_reduce(CarvingReport::default, |a, b| Ok(a.merge(b)))?
        } else {
            let mut report = CarvingReport::default();
            for sample in self.samples {
                report = report.merge(self.pass(kind, sample, states)?);
            }
            report
        };

        debug!(
            "{kind:?} passes: {} done, {} rejected, {} skipped, {} leaves",
            report.passes, report.rejected, report.skipped, report.marked_leaves
        );
        Ok(report)
    }

    fn pass(
        &self,
        kind: PassKind,
        sample: &Sample<R>,
        states: &NodeStates,
    ) -> Result<CarvingReport, TreeError> {
        let mut report = CarvingReport::default();
        if self.cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let Some(camera) = self.cameras.get(&sample.view_id) else {
            report.skipped += 1;
            return Ok(report);
        };
        if !camera.sees(sample.position) {
            report.skipped += 1;
            return Ok(report);
        }

        let cone = match self.cone(kind, camera, sample) {
            Ok(cone) => cone,
            Err(err) => {
                warn!("Rejected {kind:?} cone of sample at {}: {err}", sample.position);
                report.rejected += 1;
                return Ok(report);
            }
        };

        let required = match kind {
            PassKind::Emptiness => self.config.emptiness_required,
            PassKind::Occupancy => self.config.occupancy_required,
        };
        report.marked_leaves += if required.is_empty() {
            self.tree.classify(&cone, states, kind.flags())?
        } else {
            let filtered = cone.requiring(self.tree, states, required)?;
            self.tree.classify(&filtered, states, kind.flags())?
        };
        report.passes += 1;
        Ok(report)
    }

    /// Builds the cone of a pass without touching any state.
    ///
    /// The end radius is the sample scale times `radius_factor`, divided by
    /// the sample confidence.
    pub fn cone(
        &self,
        kind: PassKind,
        camera: &CameraData<R>,
        sample: &Sample<R>,
    ) -> Result<ConeNodesChecker<R>, TreeError> {
        let radius = sample.scale * R::lit(self.config.radius_factor) / sample.confidence;
        match kind {
            PassKind::Emptiness => {
                let distance = (sample.position - camera.position).length();
                let length = distance - sample.scale * R::lit(self.config.emptiness_margin);
                ConeNodesChecker::new(
                    camera.position,
                    sample.position,
                    radius,
                    length,
                    self.max_depth(),
                )
            }
            PassKind::Occupancy => {
                let away = (sample.position - camera.position)
                    .normalize()
                    .ok_or_else(|| {
                        TreeError::InvalidGeometry(format!(
                            "Sample coincides with its camera: {}",
                            sample.position
                        ))
                    })?;
                let length = sample.scale * R::lit(self.config.occupancy_depth);
                let end = sample.position + away * length;

                // tilt the end disc along the surface when it faces the camera
                match sample.unit_normal() {
                    Some(normal) if normal.dot(away) <= R::lit(-0.25) => {
                        ConeNodesChecker::with_end_normal(
                            sample.position,
                            normal,
                            end,
                            radius,
                            length,
                            self.max_depth(),
                        )
                    }
                    _ => ConeNodesChecker::new(sample.position, end, radius, length, self.max_depth()),
                }
            }
        }
    }
}
