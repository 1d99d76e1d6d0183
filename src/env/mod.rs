//! Environment interface and the milling tool implementation.

mod milling;
pub mod spaces;

pub use milling::{MillingToolEnv, ResetOptions};
pub use spaces::{BoxSpace, Discrete};

use crate::error::EnvResult;
use crate::types::{Step, StepInfo};

/// Gym-style episodic environment.
///
/// `reset` starts an episode and returns the first observation; `step`
/// advances one time index and returns
/// `(observation, reward, terminated, truncated, info)` as a [`Step`].
pub trait Environment {
    type Observation;
    type Action;

    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&ResetOptions>,
    ) -> EnvResult<(Self::Observation, StepInfo)>;

    fn step(&mut self, action: Self::Action) -> EnvResult<Step<Self::Observation>>;
}
