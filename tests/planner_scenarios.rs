use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use nbv_graph::geometry::{BoundingBox, Pose};
use nbv_graph::graph::{ViewpointEntry, ViewpointEntryIndex};
use nbv_graph::sensing::{
    CameraModel, PoseSampler, RandomSource, RaycastError, RaycastOracle, RaycastResult, Viewpoint,
    ViewpointFactory, VirtualCamera, VoxelKey, VoxelRef, VoxelWithInformation,
};
use nbv_graph::{PlannerConfig, PlannerContext, PlannerVolumes, Rejection, ViewpointPlanner};

/// Returns `num_voxels` voxels well away from the camera, each with
/// `information`.
struct ConstantOracle {
    num_voxels: u64,
    information: f64,
}

impl RaycastOracle for ConstantOracle {
    fn score(&self, viewpoint: &Viewpoint, _: bool) -> Result<RaycastResult, RaycastError> {
        let position = viewpoint.pose().translation;
        Ok(RaycastResult::from_voxels(
            (0..self.num_voxels)
                .map(|k| voxel(k, position + Vector3::new(10.0 + 0.1 * k as f64, 0.0, 0.0), self.information))
                .collect(),
        ))
    }
}

struct FailingOracle;

impl RaycastOracle for FailingOracle {
    fn score(&self, _: &Viewpoint, _: bool) -> Result<RaycastResult, RaycastError> {
        Err(RaycastError::InvalidQuery("outside occupancy map".into()))
    }
}

/// Deterministic pose sampler.
///
/// Surrounding poses sit at a fixed offset from the reference; uniform poses
/// are a fixed position (or not found). Orientations are the identity.
struct StubSampler {
    offset: Vector3<f64>,
    uniform: Option<Vector3<f64>>,
    bounds: BoundingBox,
    uniform_calls: AtomicUsize,
}

impl StubSampler {
    fn new(offset: Vector3<f64>, uniform: Option<Vector3<f64>>) -> Self {
        Self {
            offset,
            uniform,
            bounds: BoundingBox::new(Vector3::repeat(-50.0), Vector3::repeat(50.0)),
            uniform_calls: AtomicUsize::new(0),
        }
    }
}

impl PoseSampler for StubSampler {
    fn sample_uniform_pose(&self, _: &mut dyn RandomSource) -> Option<Pose> {
        self.uniform_calls.fetch_add(1, Ordering::SeqCst);
        self.uniform.map(Pose::from_position)
    }

    fn sample_surrounding_pose(&self, reference: &Pose, _: &mut dyn RandomSource) -> Option<Pose> {
        Some(Pose::from_position(reference.translation + self.offset))
    }

    fn sample_biased_orientation(&self, _: &Vector3<f64>, _: &mut dyn RandomSource) -> UnitQuaternion<f64> {
        UnitQuaternion::identity()
    }

    fn is_valid_position(&self, position: &Vector3<f64>) -> bool {
        self.bounds.contains(position)
    }
}

/// Draws uniform poses spread over a box, for the concurrent scenario.
struct SpreadSampler;

impl PoseSampler for SpreadSampler {
    fn sample_uniform_pose(&self, rng: &mut dyn RandomSource) -> Option<Pose> {
        Some(Pose::from_position(Vector3::new(
            rng.uniform_range(-20.0, 20.0),
            rng.uniform_range(-20.0, 20.0),
            rng.uniform_range(-20.0, 20.0),
        )))
    }

    fn sample_surrounding_pose(&self, reference: &Pose, rng: &mut dyn RandomSource) -> Option<Pose> {
        let offset = Vector3::new(
            rng.uniform_range(-3.0, 3.0),
            rng.uniform_range(-3.0, 3.0),
            rng.uniform_range(-3.0, 3.0),
        );
        Some(Pose::from_position(reference.translation + offset))
    }

    fn sample_biased_orientation(&self, _: &Vector3<f64>, _: &mut dyn RandomSource) -> UnitQuaternion<f64> {
        UnitQuaternion::identity()
    }

    fn is_valid_position(&self, position: &Vector3<f64>) -> bool {
        position.iter().all(|c| c.abs() <= 25.0)
    }
}

fn voxel(key: u64, center: Vector3<f64>, information: f64) -> VoxelWithInformation {
    VoxelWithInformation {
        voxel: VoxelRef {
            key: VoxelKey(key),
            bbox: BoundingBox::from_center_extent(center, Vector3::repeat(0.1)),
        },
        information,
    }
}

fn camera() -> Arc<VirtualCamera> {
    Arc::new(VirtualCamera::new(CameraModel::with_focal_length(64, 48, 32.0, 20.0)))
}

fn base_config() -> PlannerConfig {
    PlannerConfig {
        min_voxel_count: 10,
        min_information: 5.0,
        sample_without_reference_probability: 0.0,
        ..Default::default()
    }
}

/// Planner with one real viewpoint (information 10, 200 voxels) per position.
fn planner_with(
    config: PlannerConfig,
    real_positions: &[Vector3<f64>],
    oracle: Arc<dyn RaycastOracle>,
    sampler: Arc<dyn PoseSampler>,
) -> ViewpointPlanner {
    let camera = camera();
    let real_entries = real_positions
        .iter()
        .map(|&position| {
            let viewpoint = camera.make_viewpoint(Pose::from_position(position));
            let voxels = (0..200)
                .map(|k| voxel(k, position + Vector3::new(10.0, 0.1 * k as f64, 0.0), 0.05))
                .collect();
            ViewpointEntry::new(viewpoint, 10.0, voxels)
        })
        .collect();
    let volumes = PlannerVolumes {
        grid_bbox: BoundingBox::new(Vector3::repeat(-20.0), Vector3::repeat(20.0)),
        exploration_bbox: BoundingBox::new(Vector3::repeat(-20.0), Vector3::repeat(20.0)),
    };
    let context = PlannerContext {
        viewpoint_factory: camera,
        oracle,
        pose_sampler: sampler,
    };
    ViewpointPlanner::new(config, real_entries, volumes, context).unwrap()
}

fn high_information() -> Arc<dyn RaycastOracle> {
    Arc::new(ConstantOracle {
        num_voxels: 50,
        information: 1.0,
    })
}

fn low_information() -> Arc<dyn RaycastOracle> {
    Arc::new(ConstantOracle {
        num_voxels: 200,
        information: 0.001,
    })
}

#[test]
fn test_commits_receive_sequential_indices() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::zeros(), None)),
    );

    for n in 0..30 {
        let position = Vector3::new(1.0 + n as f64, 0.0, 0.0);
        let index = planner
            .add_viewpoint_entry(Pose::from_position(position), false)
            .unwrap();
        assert_eq!(index, ViewpointEntryIndex(n + 1));

        planner.with_store(|store| {
            assert!(store.check_invariants());
            assert_eq!(store.spatial_index().len(), store.len());
            assert_eq!(store.graph().num_nodes(), store.len());

            let nearest = store.knn(&position, 1);
            assert_eq!(nearest[0].index, index);
            assert_eq!(nearest[0].squared_distance, 0.0);
        });
    }
}

#[test]
fn test_real_viewpoint_nearby_rejects_high_information_candidate() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::new(0.5, 0.0, 0.0), None)),
    );
    let mut rng = StdRng::seed_from_u64(1);

    assert_eq!(
        planner.try_generate_next_viewpoint_entry(&mut rng),
        Err(Rejection::TooCloseToRealViewpoint)
    );
    assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_entries(), 1);
}

#[test]
fn test_low_information_candidate_counts_one_failure() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        low_information(),
        Arc::new(StubSampler::new(Vector3::new(5.0, 0.0, 0.0), None)),
    );
    let mut rng = StdRng::seed_from_u64(2);

    let before = planner.num_failed_samples();
    assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_entries(), 1);
    assert_eq!(planner.num_failed_samples(), before + 1);
}

#[test]
fn test_raycast_failure_is_a_rejection() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        Arc::new(FailingOracle),
        Arc::new(StubSampler::new(Vector3::new(5.0, 0.0, 0.0), None)),
    );
    let mut rng = StdRng::seed_from_u64(3);

    assert_eq!(
        planner.try_generate_next_viewpoint_entry(&mut rng),
        Err(Rejection::RaycastFailed)
    );
    assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_failed_samples(), 1);
    assert_eq!(planner.num_entries(), 1);
}

#[test]
fn test_successful_commit_resets_failures() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::new(5.0, 0.0, 0.0), None)),
    );
    planner.shared().record_failure();
    planner.shared().record_failure();
    let mut rng = StdRng::seed_from_u64(4);

    assert!(planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_entries(), 2);
    assert_eq!(planner.num_failed_samples(), 0);
    planner.with_store(|store| {
        assert_eq!(store.grid().total_count(), 1);
        assert_eq!(store.distribution().len(), 1);
    });
}

#[test]
fn test_start_position_bootstraps_sampling() {
    let config = PlannerConfig {
        start_position: Some([10.0, 10.0, 10.0]),
        ..base_config()
    };
    let planner = planner_with(
        config,
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::new(1.0, 0.0, 0.0), None)),
    );
    let mut rng = StdRng::seed_from_u64(5);

    let index = planner.try_generate_next_viewpoint_entry(&mut rng).unwrap();
    planner.with_store(|store| {
        let position = store.entry(index).unwrap().pose().translation;
        assert_eq!(position, Vector3::new(11.0, 10.0, 10.0));
    });
}

#[test]
fn test_stuck_second_viewpoint_triggers_reset() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        low_information(),
        Arc::new(StubSampler::new(Vector3::new(0.0, 5.0, 0.0), None)),
    );
    let camera = camera();
    let first = ViewpointEntry::without_observations(
        camera.make_viewpoint(Pose::from_position(Vector3::new(6.0, 0.0, 0.0))),
    );
    planner.shared().commit(first, true, true);
    assert_eq!(planner.num_entries(), 2);
    assert_eq!(planner.shared().frontier_len(), 1);

    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..50 {
        assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    }
    assert_eq!(planner.num_failed_samples(), 50);
    assert_eq!(planner.num_entries(), 2);

    // The next attempt resets before sampling, then fails again.
    assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_entries(), 1);
    assert_eq!(planner.shared().frontier_len(), 0);
    assert_eq!(planner.num_failed_samples(), 1);
    planner.with_store(|store| {
        assert_eq!(store.grid().total_count(), 0);
        assert!(store.distribution().is_empty());
        assert!(store.check_invariants());
    });
}

#[test]
fn test_empty_frontier_falls_back_to_uniform_sampling() {
    let sampler = Arc::new(StubSampler::new(Vector3::zeros(), Some(Vector3::new(-8.0, 4.0, 2.0))));
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        sampler.clone(),
    );
    let camera = camera();
    let virtual_entry = ViewpointEntry::without_observations(
        camera.make_viewpoint(Pose::from_position(Vector3::new(6.0, 0.0, 0.0))),
    );
    planner.shared().commit(virtual_entry, true, false);
    assert_eq!(planner.shared().frontier_len(), 0);

    let mut rng = StdRng::seed_from_u64(7);
    assert!(planner.generate_next_viewpoint_entry2(&mut rng));
    assert_eq!(sampler.uniform_calls.load(Ordering::SeqCst), 1);
    assert_eq!(planner.num_entries(), 3);
    assert_eq!(planner.shared().frontier_len(), 1);
}

#[test]
fn test_uniform_sample_not_found_is_a_failure() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::zeros(), None)),
    );
    let camera = camera();
    let virtual_entry = ViewpointEntry::without_observations(
        camera.make_viewpoint(Pose::from_position(Vector3::new(6.0, 0.0, 0.0))),
    );
    planner.shared().commit(virtual_entry, true, false);

    let mut rng = StdRng::seed_from_u64(8);
    assert!(!planner.generate_next_viewpoint_entry2(&mut rng));
    assert_eq!(planner.num_failed_samples(), 1);
}

fn commit_virtual(planner: &ViewpointPlanner, position: Vector3<f64>) -> ViewpointEntryIndex {
    let camera = camera();
    let entry = ViewpointEntry::without_observations(camera.make_viewpoint(Pose::from_position(position)));
    planner.shared().commit(entry, true, false)
}

#[test]
fn test_reference_sampling_without_count_grid() {
    let config = PlannerConfig {
        count_grid_enable: false,
        ..base_config()
    };
    let planner = planner_with(
        config,
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::new(0.0, 5.0, 0.0), None)),
    );
    let reference = commit_virtual(&planner, Vector3::new(6.0, 0.0, 0.0));
    planner.with_store(|store| {
        assert_eq!(store.grid().total_count(), 0);
        assert_eq!(store.distribution().weight(reference), Some(1.0));
    });

    let mut rng = StdRng::seed_from_u64(10);
    let index = planner.try_generate_next_viewpoint_entry(&mut rng).unwrap();
    assert_eq!(index, ViewpointEntryIndex(2));
    assert_eq!(planner.num_entries(), 3);
    planner.with_store(|store| {
        let position = store.entry(index).unwrap().pose().translation;
        assert_eq!(position, Vector3::new(6.0, 5.0, 0.0));
        assert_eq!(store.distribution().len(), 2);
    });
}

#[test]
fn test_crowded_cell_rejects_by_count_grid() {
    let planner = planner_with(
        base_config(),
        &[Vector3::zeros()],
        high_information(),
        Arc::new(StubSampler::new(Vector3::zeros(), None)),
    );
    let crowded = Vector3::new(6.0, 6.0, 6.0);
    for _ in 0..120 {
        commit_virtual(&planner, crowded);
    }
    planner.shared().store.write().refresh_distribution();
    planner.with_store(|store| {
        assert_eq!(store.grid().count_at(&crowded), 120);
        assert!(store.grid().probability_at(&crowded) < 0.2);
    });

    let mut rng = StdRng::seed_from_u64(11);
    let outcomes: Vec<_> = (0..20)
        .map(|_| planner.try_generate_next_viewpoint_entry(&mut rng))
        .collect();
    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Err(Rejection::RejectedByCountGrid) | Err(Rejection::TooManyCloseViewpoints)
    )));
    assert!(outcomes.contains(&Err(Rejection::RejectedByCountGrid)));
    assert_eq!(planner.num_entries(), 121);

    let before = planner.num_failed_samples();
    assert!(!planner.generate_next_viewpoint_entry(&mut rng));
    assert_eq!(planner.num_failed_samples(), before + 1);
    assert_eq!(planner.num_entries(), 121);
}

#[test]
fn test_sampling_without_reference_uses_uniform_sampler() {
    let config = PlannerConfig {
        sample_without_reference_probability: 1.0,
        ..base_config()
    };
    let sampler = Arc::new(StubSampler::new(Vector3::new(0.0, 5.0, 0.0), Some(Vector3::new(-8.0, 4.0, 2.0))));
    let planner = planner_with(config, &[Vector3::zeros()], high_information(), sampler.clone());
    commit_virtual(&planner, Vector3::new(6.0, 0.0, 0.0));

    let mut rng = StdRng::seed_from_u64(12);
    let index = planner.try_generate_next_viewpoint_entry(&mut rng).unwrap();
    assert_eq!(sampler.uniform_calls.load(Ordering::SeqCst), 1);
    planner.with_store(|store| {
        let position = store.entry(index).unwrap().pose().translation;
        assert_eq!(position, Vector3::new(-8.0, 4.0, 2.0));
    });
}

#[test]
fn test_frontier_expansion_along_six_axes() {
    let config = PlannerConfig {
        no_raycast: true,
        ..base_config()
    };
    let planner = planner_with(
        config,
        &[Vector3::zeros()],
        Arc::new(FailingOracle),
        Arc::new(StubSampler::new(Vector3::zeros(), None)),
    );
    let mut rng = StdRng::seed_from_u64(9);

    assert!(planner.generate_next_viewpoint_entry2(&mut rng));
    assert_eq!(planner.num_entries(), 7);
    assert_eq!(planner.shared().frontier_len(), 6);

    let step = planner.exploration_step(&Vector3::zeros());
    planner.with_store(|store| {
        let offsets: Vec<Vector3<f64>> = store.entries()[1..]
            .iter()
            .map(|entry| entry.pose().translation / step)
            .collect();
        assert_eq!(offsets.len(), 6);
        for axis in 0..3 {
            for sign in [-1.0, 1.0] {
                let mut direction = Vector3::zeros();
                direction[axis] = sign;
                assert!(offsets.iter().any(|o| (o - direction).norm() < 1e-12));
            }
        }
        // Expanded entries skip density bookkeeping.
        assert_eq!(store.grid().total_count(), 0);
    });
}

#[test]
fn test_expansion_rejects_duplicates() {
    let config = PlannerConfig {
        no_raycast: true,
        ..base_config()
    };
    let planner = planner_with(
        config,
        &[Vector3::zeros()],
        Arc::new(FailingOracle),
        Arc::new(StubSampler::new(Vector3::zeros(), None)),
    );

    assert_eq!(
        planner.try_add_viewpoint_entry(Pose::from_position(Vector3::new(0.5, 0.0, 0.0)), false),
        Err(Rejection::DuplicateOrientation)
    );
    assert_eq!(
        planner.try_add_viewpoint_entry(Pose::from_position(Vector3::new(100.0, 0.0, 0.0)), false),
        Err(Rejection::InvalidPosition)
    );
    assert!(planner
        .try_add_viewpoint_entry(Pose::from_position(Vector3::new(3.0, 0.0, 0.0)), false)
        .is_ok());
}

#[test]
fn test_concurrent_generation_keeps_parallel_arrays() {
    let config = PlannerConfig {
        sample_without_reference_probability: 0.3,
        discard_dist_thres_square: 0.25,
        discard_dist_real_thres_square: 0.25,
        ..base_config()
    };
    let planner = Arc::new(planner_with(
        config,
        &[Vector3::zeros(), Vector3::new(5.0, 5.0, 5.0)],
        high_information(),
        Arc::new(SpreadSampler),
    ));

    thread::scope(|s| {
        for worker in 0..4u64 {
            let planner = Arc::clone(&planner);
            s.spawn(move || {
                let mut rng = StdRng::seed_from_u64(100 + worker);
                for attempt in 0..50 {
                    if (worker + attempt) % 2 == 0 {
                        planner.generate_next_viewpoint_entry(&mut rng);
                    } else {
                        planner.generate_next_viewpoint_entry2(&mut rng);
                    }
                }
            });
        }
    });

    assert!(planner.num_entries() > 2);
    planner.with_store(|store| {
        assert!(store.check_invariants());
        assert_eq!(store.graph().num_nodes(), store.len());
        assert_eq!(store.num_real_viewpoints(), 2);
    });
    let components = planner.connected_components();
    assert_eq!(components.count, planner.num_entries());
}
