//! Recording state machine and orchestration.
//!
//! [`RecorderState`] names the lifecycle phases; [`PipelineOrchestrator`]
//! owns the one live instance and performs every transition on a single
//! coordination task.  See [`runner`] for the transition rules and the
//! debounce-timer design.

pub mod runner;
pub mod state;

pub use runner::{PipelineOrchestrator, DEFAULT_DEBOUNCE};
pub use state::RecorderState;
