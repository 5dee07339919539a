//! Thread-shared planner state.
//!
//! [`SharedState`] is the explicitly constructed repository handed to every
//! planner worker: the lock-guarded entry store, the exploration frontier
//! and the consecutive-failure counter.

pub mod shared_state;

pub use shared_state::SharedState;
