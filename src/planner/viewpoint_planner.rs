//! Viewpoint planner: the sampling engine on top of the shared store.
//!
//! Two strategies grow the graph:
//! - [`ViewpointPlanner::generate_next_viewpoint_entry`] resamples around
//!   virtual viewpoints chosen by the density distribution
//! - [`ViewpointPlanner::generate_next_viewpoint_entry2`] expands frontier
//!   entries along the six axis directions
//!
//! Every method takes `&self` and the caller's random source, so one planner
//! can be driven by several worker threads at once. Sampling, closeness
//! checks and raycasts run without holding the store write lock; only the
//! commit is serialized.

use std::sync::Arc;

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::density::VisitationGrid;
use crate::error::Result;
use crate::geometry::{BoundingBox, Pose};
use crate::graph::{
    ConnectedComponents, DensitySettings, EntryStore, ViewpointEntry, ViewpointEntryIndex,
};
use crate::sensing::{PoseSampler, RandomSource, RaycastOracle, Viewpoint, ViewpointFactory};
use crate::system::SharedState;

use super::acceptance::{check_closeness, check_exploration_duplicate, evaluate_raycast, make_entry};
use super::exploration::ExplorationStep;
use super::{PlannerConfig, Rejection};

/// What one frontier-expansion call works on.
enum FrontierDraw {
    Uniform,
    Expand(Vector3<f64>),
    /// The popped index was dropped by a reset.
    Stale(ViewpointEntryIndex),
}

/// Unit directions tried when expanding a frontier entry.
fn expansion_directions() -> [Vector3<f64>; 6] {
    [
        Vector3::new(-1.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, -1.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.0, 0.0, 1.0),
    ]
}

/// Bounding volumes fixed for the lifetime of a planner.
#[derive(Debug, Clone, Copy)]
pub struct PlannerVolumes {
    /// Extent of the visitation grid.
    pub grid_bbox: BoundingBox,
    /// Volume outside which the exploration step dilates.
    pub exploration_bbox: BoundingBox,
}

/// External collaborators the planner consumes.
#[derive(Clone)]
pub struct PlannerContext {
    pub viewpoint_factory: Arc<dyn ViewpointFactory>,
    pub oracle: Arc<dyn RaycastOracle>,
    pub pose_sampler: Arc<dyn PoseSampler>,
}

pub struct ViewpointPlanner {
    config: PlannerConfig,
    shared: Arc<SharedState>,
    context: PlannerContext,
    exploration: ExplorationStep,
}

impl ViewpointPlanner {
    /// Build a planner whose store starts with `real_entries`.
    pub fn new(
        config: PlannerConfig,
        real_entries: Vec<ViewpointEntry>,
        volumes: PlannerVolumes,
        context: PlannerContext,
    ) -> Result<Self> {
        config.validate()?;
        let grid = VisitationGrid::new(volumes.grid_bbox, config.count_grid_dimensions);
        let store = EntryStore::new(real_entries, grid, DensitySettings::from(&config));
        info!(
            num_real = store.num_real_viewpoints(),
            grid_cells = store.grid().num_cells(),
            "Viewpoint planner initialized"
        );
        Ok(Self {
            exploration: ExplorationStep::from_config(&config, volumes.exploration_bbox),
            shared: SharedState::new(store),
            config,
            context,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn exploration_step(&self, position: &Vector3<f64>) -> f64 {
        self.exploration.step_at(position)
    }

    pub fn num_failed_samples(&self) -> usize {
        self.shared.num_failed_samples()
    }

    pub fn num_entries(&self) -> usize {
        self.shared.len()
    }

    /// Run `f` against the store under its read lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&EntryStore) -> R) -> R {
        f(&self.shared.store.read())
    }

    pub fn connected_components(&self) -> ConnectedComponents {
        self.shared.store.read().graph().connected_components()
    }

    /// Clear the graph back to the real viewpoints.
    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Reset if only the first virtual viewpoint exists and too many attempts
    /// to grow past it have failed. Returns whether a reset happened.
    pub fn recover_if_stuck(&self) -> bool {
        self.shared
            .reset_if_stuck(self.config.max_failed_second_viewpoint_samples)
    }

    // ------------------------------------------------------------------
    // Density-biased resampling
    // ------------------------------------------------------------------

    /// Try to add one viewpoint by density-biased resampling.
    ///
    /// A failed attempt increments the failure counter; a commit resets it.
    pub fn generate_next_viewpoint_entry(&self, rng: &mut dyn RandomSource) -> bool {
        match self.try_generate_next_viewpoint_entry(rng) {
            Ok(index) => {
                debug!(%index, "Added viewpoint entry");
                true
            }
            Err(rejection) => {
                let failures = self.shared.record_failure();
                debug!(reason = %rejection, failures, "Rejected viewpoint sample");
                false
            }
        }
    }

    /// Like [`Self::generate_next_viewpoint_entry`] but reports why the
    /// attempt failed. Does not touch the failure counter on rejection.
    pub fn try_generate_next_viewpoint_entry(
        &self,
        rng: &mut dyn RandomSource,
    ) -> std::result::Result<ViewpointEntryIndex, Rejection> {
        self.recover_if_stuck();

        let pose = self.sample_pose(rng)?;
        let viewpoint = self.context.viewpoint_factory.make_viewpoint(pose);

        {
            let store = self.shared.store.read();
            let neighbors = store.knn(&viewpoint.pose().translation, self.config.discard_dist_knn);
            check_closeness(&neighbors, store.num_real_viewpoints(), &self.config)?;
        }

        let entry = if self.config.no_raycast {
            ViewpointEntry::without_observations(viewpoint)
        } else {
            let result = evaluate_raycast(self.context.oracle.as_ref(), &viewpoint, &self.config)?;
            make_entry(viewpoint, result)
        };
        Ok(self.shared.commit(entry, true, false))
    }

    fn sample_pose(&self, rng: &mut dyn RandomSource) -> std::result::Result<Pose, Rejection> {
        let sampler = self.context.pose_sampler.as_ref();
        let store = self.shared.store.read();

        if store.len() <= store.num_real_viewpoints() {
            let reference = match self.config.start_position() {
                Some(start) => Pose::from_position(start),
                None => {
                    if store.is_empty() {
                        return Err(Rejection::SampleNotFound);
                    }
                    let index = ViewpointEntryIndex(rng.uniform_index(store.len()));
                    *store.entries()[index.0].pose()
                }
            };
            drop(store);
            return sampler
                .sample_surrounding_pose(&reference, rng)
                .ok_or(Rejection::SampleNotFound);
        }

        if rng.bernoulli(self.config.sample_without_reference_probability) {
            drop(store);
            return sampler.sample_uniform_pose(rng).ok_or(Rejection::SampleNotFound);
        }

        let reference = store
            .distribution()
            .sample(rng)
            .and_then(|index| store.entry(index))
            .map(|entry| *entry.pose())
            .ok_or(Rejection::SampleNotFound)?;
        let pose = sampler
            .sample_surrounding_pose(&reference, rng)
            .ok_or(Rejection::SampleNotFound)?;

        if store.density_settings().enabled {
            let probability = store.grid().probability_at(&pose.translation);
            if rng.uniform_unit() > probability {
                return Err(Rejection::RejectedByCountGrid);
            }
        }
        Ok(pose)
    }

    // ------------------------------------------------------------------
    // Frontier expansion
    // ------------------------------------------------------------------

    /// Try to grow the graph by expanding one frontier entry.
    ///
    /// With probability `sample_without_reference_probability`, or when the
    /// frontier is empty, a uniformly sampled pose is tried instead. Returns
    /// whether at least one entry was added.
    pub fn generate_next_viewpoint_entry2(&self, rng: &mut dyn RandomSource) -> bool {
        let draw = {
            let store = self.shared.store.read();
            let mut frontier = self.shared.frontier.lock();
            if store.len() <= store.num_real_viewpoints() && frontier.is_empty() {
                frontier.seed(store.len());
            }
            let uniform = rng.bernoulli(self.config.sample_without_reference_probability);
            if uniform || frontier.is_empty() {
                FrontierDraw::Uniform
            } else {
                match frontier.pop_random(rng) {
                    Some(index) => match store.entry(index) {
                        Some(entry) => FrontierDraw::Expand(entry.pose().translation),
                        None => FrontierDraw::Stale(index),
                    },
                    None => FrontierDraw::Uniform,
                }
            }
        };

        let success = match draw {
            FrontierDraw::Expand(position) => self.expand_from(&position, rng),
            FrontierDraw::Stale(index) => {
                debug!(%index, "Frontier entry no longer exists");
                false
            }
            FrontierDraw::Uniform => match self.context.pose_sampler.sample_uniform_pose(rng) {
                Some(pose) => match self.try_add_viewpoint_entry(pose, false) {
                    Ok(_) => true,
                    Err(rejection) => {
                        debug!(reason = %rejection, "Rejected uniform exploration sample");
                        false
                    }
                },
                None => {
                    debug!(reason = %Rejection::SampleNotFound, "Rejected uniform exploration sample");
                    false
                }
            },
        };

        if !success {
            self.shared.record_failure();
        }
        success
    }

    /// Try all six axis-aligned neighbours of `position`.
    fn expand_from(&self, position: &Vector3<f64>, rng: &mut dyn RandomSource) -> bool {
        let step = self.exploration.step_at(position);
        debug!(?position, step, "Expanding frontier entry");
        let mut success = false;
        for direction in expansion_directions() {
            let candidate = position + direction * step;
            let local = self.try_add_viewpoint_entries(&candidate, false, rng);
            success = success || local;
        }
        success
    }

    /// Try `exploration_num_orientations` ROI-biased orientations at
    /// `position`. Returns whether any of them was added.
    pub fn try_add_viewpoint_entries(
        &self,
        position: &Vector3<f64>,
        no_raycast: bool,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if !self.context.pose_sampler.is_valid_position(position) {
            return false;
        }
        let mut success = false;
        for _ in 0..self.config.exploration_num_orientations {
            let orientation = self.context.pose_sampler.sample_biased_orientation(position, rng);
            let pose = Pose::new(*position, orientation);
            let local = match self.try_add_viewpoint_entry(pose, no_raycast) {
                Ok(_) => true,
                Err(rejection) => {
                    debug!(reason = %rejection, ?position, "Rejected exploration candidate");
                    false
                }
            };
            success = success || local;
        }
        success
    }

    /// Test an expansion candidate and commit it onto the frontier.
    ///
    /// The candidate must be a valid drone position and must not duplicate a
    /// nearby entry in both position and orientation. Density bookkeeping is
    /// skipped for entries added this way.
    pub fn try_add_viewpoint_entry(
        &self,
        pose: Pose,
        no_raycast: bool,
    ) -> std::result::Result<ViewpointEntryIndex, Rejection> {
        if !self.context.pose_sampler.is_valid_position(&pose.translation) {
            return Err(Rejection::InvalidPosition);
        }
        {
            let store = self.shared.store.read();
            let neighbors = store.knn(&pose.translation, self.config.discard_dist_knn);
            check_exploration_duplicate(
                &pose,
                &neighbors,
                &store,
                &self.exploration,
                self.config.exploration_angular_dist_threshold(),
            )?;
        }
        let viewpoint = self.context.viewpoint_factory.make_viewpoint(pose);
        let entry = self.score_viewpoint(viewpoint, no_raycast)?;
        Ok(self.shared.commit(entry, false, true))
    }

    /// Add `pose` without closeness checks.
    ///
    /// Unless raycasting is disabled the raycast stages still apply. The
    /// entry skips density bookkeeping and is registered on the frontier.
    pub fn add_viewpoint_entry(
        &self,
        pose: Pose,
        no_raycast: bool,
    ) -> std::result::Result<ViewpointEntryIndex, Rejection> {
        let viewpoint = self.context.viewpoint_factory.make_viewpoint(pose);
        let entry = self.score_viewpoint(viewpoint, no_raycast)?;
        Ok(self.shared.commit(entry, false, true))
    }

    fn score_viewpoint(
        &self,
        viewpoint: Viewpoint,
        no_raycast: bool,
    ) -> std::result::Result<ViewpointEntry, Rejection> {
        if no_raycast || self.config.no_raycast {
            return Ok(ViewpointEntry::without_observations(viewpoint));
        }
        let result = evaluate_raycast(self.context.oracle.as_ref(), &viewpoint, &self.config)?;
        Ok(make_entry(viewpoint, result))
    }
}

impl std::fmt::Debug for ViewpointPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewpointPlanner")
            .field("config", &self.config)
            .field("num_entries", &self.num_entries())
            .field("num_failed_samples", &self.num_failed_samples())
            .finish()
    }
}
