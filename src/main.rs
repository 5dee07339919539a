use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam_channel::unbounded;
use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nbv_graph::geometry::{BoundingBox, Pose};
use nbv_graph::graph::ViewpointEntry;
use nbv_graph::sensing::{
    BoxPoseSampler, CameraModel, RaycastError, RaycastOracle, RaycastResult, Viewpoint,
    ViewpointFactory, VirtualCamera, VoxelKey, VoxelRef, VoxelWithInformation,
};
use nbv_graph::{PlannerConfig, PlannerContext, PlannerVolumes, ViewpointPlanner};

const NUM_WORKERS: usize = 4;
const ATTEMPTS_PER_WORKER: usize = 250;
const TARGET_RADIUS: f64 = 3.0;
const TARGET_VOXELS: usize = 2000;

/// Which sampling strategy the workers run.
#[derive(Debug, Clone, Copy)]
enum Strategy {
    Density,
    Frontier,
}

/// Per-worker summary sent back to the main thread.
struct WorkerReport {
    worker: usize,
    attempts: usize,
    added: usize,
}

/// Occupancy oracle over a spherical target at the origin.
///
/// Surface voxels facing the camera, inside its field of view and range,
/// are observed with unit information.
struct SphereOracle {
    voxels: Vec<VoxelWithInformation>,
    world: BoundingBox,
}

impl SphereOracle {
    fn new(radius: f64, num_voxels: usize, world: BoundingBox) -> Self {
        // Fibonacci lattice on the sphere.
        let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
        let voxel_extent = Vector3::repeat(0.1);
        let voxels = (0..num_voxels)
            .map(|i| {
                let y = 1.0 - 2.0 * (i as f64 + 0.5) / num_voxels as f64;
                let r = (1.0 - y * y).sqrt();
                let theta = golden_angle * i as f64;
                let center = Vector3::new(r * theta.cos(), y, r * theta.sin()) * radius;
                VoxelWithInformation {
                    voxel: VoxelRef {
                        key: VoxelKey(i as u64),
                        bbox: BoundingBox::from_center_extent(center, voxel_extent),
                    },
                    information: 1.0,
                }
            })
            .collect();
        Self { voxels, world }
    }
}

impl RaycastOracle for SphereOracle {
    fn score(
        &self,
        viewpoint: &Viewpoint,
        ignore_zero_information: bool,
    ) -> Result<RaycastResult, RaycastError> {
        let pose = viewpoint.pose();
        let position = pose.translation;
        if !self.world.contains(&position) {
            return Err(RaycastError::OutOfBounds {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }
        let camera = viewpoint.camera();
        let forward = pose.rotation * Vector3::z();
        let cos_half_fov = (camera.horizontal_fov() / 2.0).cos();

        let voxels = self
            .voxels
            .iter()
            .filter(|v| !(ignore_zero_information && v.information == 0.0))
            .filter(|v| {
                let center = v.voxel.bbox.center();
                let ray = center - position;
                let distance = ray.norm();
                distance > 0.0
                    && distance <= camera.max_range
                    && center.dot(&(position - center)) > 0.0
                    && forward.dot(&ray) / distance >= cos_half_fov
            })
            .copied()
            .collect();
        Ok(RaycastResult::from_voxels(voxels))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => PlannerConfig::from_json_file(&path)
            .with_context(|| format!("loading planner configuration from {path}"))?,
        None => PlannerConfig {
            min_voxel_count: 20,
            exploration_step: 1.5,
            ..Default::default()
        },
    };
    let strategy = match args.next().as_deref() {
        None | Some("density") => Strategy::Density,
        Some("frontier") => Strategy::Frontier,
        Some(other) => bail!("unknown strategy {other:?}, expected \"density\" or \"frontier\""),
    };

    let world = BoundingBox::new(Vector3::repeat(-12.0), Vector3::repeat(12.0));
    let roi = BoundingBox::from_center_extent(Vector3::zeros(), Vector3::repeat(2.0 * TARGET_RADIUS));
    let sample_bbox = BoundingBox::new(Vector3::repeat(-10.0), Vector3::repeat(10.0));
    let drone_bbox = BoundingBox::from_center_extent(Vector3::zeros(), Vector3::repeat(0.5));

    let camera = Arc::new(VirtualCamera::new(CameraModel::with_focal_length(640, 480, 400.0, 12.0)));
    let oracle = Arc::new(SphereOracle::new(TARGET_RADIUS, TARGET_VOXELS, world));

    // Two captured viewpoints looking at the target from opposite sides.
    let real_entries = [Vector3::new(7.0, 0.0, 0.0), Vector3::new(-7.0, 0.0, 0.0)]
        .into_iter()
        .map(|position| {
            let rotation = UnitQuaternion::face_towards(&(-position), &Vector3::z());
            let viewpoint = camera.make_viewpoint(Pose::new(position, rotation));
            let result = oracle
                .score(&viewpoint, true)
                .with_context(|| format!("scoring real viewpoint at {position:?}"))?;
            Ok(ViewpointEntry::new(viewpoint, result.total_information, result.voxels))
        })
        .collect::<Result<Vec<_>>>()?;

    let context = PlannerContext {
        viewpoint_factory: camera,
        oracle,
        pose_sampler: Arc::new(BoxPoseSampler::new(sample_bbox, roi, drone_bbox)),
    };
    let volumes = PlannerVolumes {
        grid_bbox: sample_bbox,
        exploration_bbox: roi,
    };
    let planner = Arc::new(ViewpointPlanner::new(config, real_entries, volumes, context)?);

    info!(?strategy, workers = NUM_WORKERS, "Starting viewpoint graph construction");

    let (report_sender, report_receiver) = unbounded::<WorkerReport>();
    let handles: Vec<_> = (0..NUM_WORKERS)
        .map(|worker| {
            let planner = Arc::clone(&planner);
            let sender = report_sender.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(worker as u64);
                let added = (0..ATTEMPTS_PER_WORKER)
                    .filter(|_| match strategy {
                        Strategy::Density => planner.generate_next_viewpoint_entry(&mut rng),
                        Strategy::Frontier => planner.generate_next_viewpoint_entry2(&mut rng),
                    })
                    .count();
                let report = WorkerReport {
                    worker,
                    attempts: ATTEMPTS_PER_WORKER,
                    added,
                };
                if let Err(err) = sender.send(report) {
                    warn!(worker, error = %err, "Failed to send worker report");
                }
            })
        })
        .collect();
    drop(report_sender);

    for report in report_receiver.iter() {
        info!(
            worker = report.worker,
            attempts = report.attempts,
            added = report.added,
            "Worker finished"
        );
    }
    for handle in handles {
        if handle.join().is_err() {
            bail!("planner worker panicked");
        }
    }

    let components = planner.connected_components();
    let (num_entries, num_real, grid_total) = planner.with_store(|store| {
        (store.len(), store.num_real_viewpoints(), store.grid().total_count())
    });
    info!(
        num_entries,
        num_real,
        grid_total,
        frontier = planner.shared().frontier_len(),
        components = components.count,
        failed_samples = planner.num_failed_samples(),
        "Viewpoint graph construction finished"
    );
    Ok(())
}
