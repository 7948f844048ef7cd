//! Documentation deployment: the plan of a run and the sequencer that
//! executes it.

pub mod plan;
pub mod sequencer;

pub use plan::{DeployPlan, DeployState, DeployStep, DeployStrategy};
pub use sequencer::{DeployFailure, DeployReport, Sequencer};
