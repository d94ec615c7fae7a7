use rand::seq::SliceRandom;
use scopetree::prelude::*;

fn bounds() -> Aabb<f64> {
    Aabb::new(TVec3::splat(4.0), 4.0).unwrap()
}

fn overhead_camera() -> CameraData<f64> {
    CameraData::looking_at(0, TVec3::new(4.0, 4.0, 40.0), TVec3::splat(4.0), 1.0).unwrap()
}

/// A 4x4 patch of wall at `z = 4.5`, one sample per leaf column.
fn wall() -> Vec<Sample<f64>> {
    let mut samples = Vec::new();
    for x in 2..6 {
        for y in 2..6 {
            let position = TVec3::new(x as f64 + 0.5, y as f64 + 0.5, 4.5);
            samples.push(Sample::new(position, TVec3::unit_z(), 0.2, 0).unwrap());
        }
    }
    samples
}

fn flags_at(tree: &Tree<f64>, states: &NodeStates, x: f64, y: f64, z: f64) -> NodeFlags {
    let leaf = tree.find_leaf(TVec3::new(x, y, z)).unwrap();
    states.get(leaf).unwrap()
}

#[test]
fn test_wall_carving() {
    let tree = Tree::uniform(bounds(), 3).unwrap();
    let cameras = [overhead_camera()];
    let samples = wall();

    let (states, report) = Carver::new(&tree, &cameras, &samples, CarvingConfig::default())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.passes, 2 * samples.len());
    assert_eq!(report.sample_leaves, samples.len());
    assert_eq!((report.rejected, report.skipped), (0, 0));

    for sample in &samples {
        let TVec3 { x, y, .. } = sample.position;

        let above = flags_at(&tree, &states, x, y, 7.5);
        assert!(above.contains(NodeFlags::EMPTINESS));
        assert!(!above.contains(NodeFlags::OCCUPANCY));

        let at = flags_at(&tree, &states, x, y, 4.5);
        assert!(at.contains(NodeFlags::SAMPLENESS | NodeFlags::OCCUPANCY));

        let behind = flags_at(&tree, &states, x, y, 3.5);
        assert_eq!(behind, NodeFlags::OCCUPANCY);

        let deep = flags_at(&tree, &states, x, y, 1.5);
        assert_eq!(deep, NodeFlags::empty());
    }

    // columns outside the wall stay untouched
    for z in [0.5, 4.5, 7.5] {
        assert_eq!(flags_at(&tree, &states, 0.5, 7.5, z), NodeFlags::empty());
    }
    assert_eq!(states.get(tree.root).unwrap(), NodeFlags::all());
}

#[test]
fn test_sample_order_does_not_matter() {
    let tree = Tree::uniform(bounds(), 4).unwrap();
    let cameras = [
        overhead_camera(),
        CameraData::looking_at(1, TVec3::new(-20.0, 4.0, 6.0), TVec3::splat(4.0), 1.0).unwrap(),
    ];
    let mut samples = wall();
    for (i, sample) in samples.iter_mut().enumerate() {
        sample.view_id = (i % 2) as u32;
    }

    let carve = |samples: &[Sample<f64>]| {
        Carver::new(&tree, &cameras, samples, CarvingConfig::default())
            .unwrap()
            .run()
            .unwrap()
            .0
            .snapshot()
    };

    let forward = carve(&samples);
    samples.shuffle(&mut rand::thread_rng());
    assert_eq!(carve(&samples), forward);
}

#[test]
fn test_adaptive_tree_sample_leaves() {
    let samples = wall();
    let tree = Tree::from_samples(
        bounds(),
        &samples,
        TreeConfig {
            max_depth: 6,
            leaf_capacity: 1,
        },
    )
    .unwrap();
    assert!(tree.len() > 1);

    let cameras = [overhead_camera()];
    let (states, _) = Carver::new(&tree, &cameras, &samples, CarvingConfig::default())
        .unwrap()
        .run()
        .unwrap();

    for (leaf, node) in tree.leaves() {
        let holds_samples = !node.samples().unwrap().is_empty();
        assert_eq!(
            states.contains(leaf, NodeFlags::SAMPLENESS).unwrap(),
            holds_samples,
            "{}",
            node.scope
        );
    }
}

#[test]
fn test_rendering_queries() {
    let tree = Tree::uniform(bounds(), 3).unwrap();
    let cameras = [overhead_camera()];
    let samples = wall();
    let (states, _) = Carver::new(&tree, &cameras, &samples, CarvingConfig::default())
        .unwrap()
        .run()
        .unwrap();

    // the slab right behind the wall
    let slab = Aabb::from_min_max(TVec3::new(0.1, 0.1, 3.1), TVec3::new(7.9, 7.9, 3.9));
    let leaves = tree.leaves_in(&slab).unwrap();
    assert_eq!(leaves.len(), 64);

    let occupied: Vec<NodeId> = leaves
        .into_iter()
        .filter(|leaf| states.contains(*leaf, NodeFlags::OCCUPANCY).unwrap())
        .collect();
    assert_eq!(occupied.len(), 16);
    for leaf in occupied {
        let scope = tree.scope(leaf).unwrap();
        assert_eq!(scope.depth(), 3);
        assert!(scope.min().x >= 2.0 && scope.max().x <= 6.0);
    }
}

#[test]
fn test_stale_states_after_rebuild() {
    let samples = wall();
    let mut tree = Tree::from_samples(bounds(), &samples, TreeConfig::default()).unwrap();
    let states = tree.states();
    tree.rebuild(&samples[..4]);

    let cameras = [overhead_camera()];
    let carver = Carver::new(&tree, &cameras, &samples, CarvingConfig::default()).unwrap();
    assert!(matches!(
        carver.run_into(&states),
        Err(TreeError::IndexOutOfRange(_))
    ));
    assert!(carver.run().is_ok());
}
