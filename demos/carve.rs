//! Carves a synthetic scene: six cameras looking at a ball.
//!
//! ```sh
//! RUST_LOG=debug cargo run --release --example carve
//! ```

use std::f64::consts::PI;

use log::info;
use scopetree::prelude::*;

const CENTER: f64 = 16.0;
const RADIUS: f64 = 8.0;

fn main() -> Result<(), TreeError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let center = TVec3::splat(CENTER);
    let cameras = [
        TVec3::new(CENTER, CENTER, 60.0),
        TVec3::new(CENTER, CENTER, -28.0),
        TVec3::new(60.0, CENTER, CENTER),
        TVec3::new(-28.0, CENTER, CENTER),
        TVec3::new(CENTER, 60.0, CENTER),
        TVec3::new(CENTER, -28.0, CENTER),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, position)| CameraData::looking_at(i as u32, position, center, 1.2))
    .collect::<Result<Vec<_>, _>>()?;

    let samples = ball_samples(&cameras, center)?;
    info!("Generated {} samples", samples.len());

    let tree = Tree::from_samples(
        Aabb::new(center, CENTER)?,
        &samples,
        TreeConfig {
            max_depth: 7,
            leaf_capacity: 4,
        },
    )?;

    let config = CarvingConfig {
        radius_factor: 1.5,
        ..Default::default()
    };
    let (states, report) = Carver::new(&tree, &cameras, &samples, config)?.run()?;
    info!("{report:?}");

    let mut counts = [0usize; 4];
    for (leaf, _) in tree.leaves() {
        let flags = states.get(leaf)?;
        counts[0] += usize::from(flags.contains(NodeFlags::EMPTINESS));
        counts[1] += usize::from(flags.contains(NodeFlags::OCCUPANCY));
        counts[2] += usize::from(flags.contains(NodeFlags::SAMPLENESS));
        counts[3] += usize::from(flags.is_empty());
    }
    info!(
        "{} leaves: {} empty, {} occupied, {} with samples, {} unseen",
        tree.leaf_count(),
        counts[0],
        counts[1],
        counts[2],
        counts[3]
    );

    // the ball's center is never seen through
    let inner = tree.find_leaf(center).map(|leaf| states.get(leaf)).transpose()?;
    info!("Center leaf flags: {inner:?}");
    Ok(())
}

/// Points on the ball, each assigned to the camera facing it the most.
fn ball_samples(
    cameras: &[CameraData<f64>],
    center: TVec3<f64>,
) -> Result<Vec<Sample<f64>>, TreeError> {
    let mut samples = Vec::new();
    let rings = 48;
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        let segments = (2.0 * rings as f64 * theta.sin()).ceil() as usize;
        for j in 0..segments {
            let phi = 2.0 * PI * j as f64 / segments as f64;
            let normal = TVec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            let position = center + normal * RADIUS;

            let Some(camera) = cameras.iter().max_by(|a, b| {
                let facing = |c: &CameraData<f64>| {
                    (c.position - position).normalize().map_or(-1.0, |d| d.dot(normal))
                };
                facing(a).total_cmp(&facing(b))
            }) else {
                continue;
            };
            samples.push(Sample::new(position, normal, 0.3, camera.view_id)?);
        }
    }
    Ok(samples)
}
