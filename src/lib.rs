//! Milling Tool Degradation Environment
//!
//! Replays recorded milling sensor data as a sequential decision problem:
//! at every time step an agent observes force and vibration readings and
//! decides whether to keep cutting or replace the tool.
//!
//! ## Architecture
//!
//! - **Environment**: episode state machine (random start, termination on
//!   end of data or RUL threshold, cost bookkeeping, reward)
//! - **Data**: the `ToolWearSource` trait, a PHM CSV loader and a synthetic
//!   wear-profile generator
//! - **Telemetry**: per-instance step logs
//! - **Config**: TOML-tunable costs, thresholds and episode policies
//!
//! ## Example
//!
//! ```ignore
//! use milling_tool_env::{Action, MillingToolEnv, SyntheticWearProfile};
//!
//! let mut env = MillingToolEnv::with_records(0, 5.0)?;
//! env.attach(Box::new(SyntheticWearProfile::with_records(500).build()?));
//!
//! let (mut obs, _info) = env.reset(Some(42), None)?;
//! loop {
//!     let step = env.step(Action::Continue)?;
//!     obs = step.observation;
//!     if step.terminated {
//!         break;
//!     }
//! }
//! ```

pub mod config;
pub mod data;
pub mod env;
pub mod error;
pub mod render;
pub mod telemetry;
pub mod types;

// Re-export configuration
pub use config::{
    BookkeepingResetPolicy, ConfigError, EnvConfig, ObservationLayout, RenderMode,
};

// Re-export the environment
pub use env::{BoxSpace, Discrete, Environment, MillingToolEnv, ResetOptions};

// Re-export data sources
pub use data::{
    InMemorySource, PhmDataset, SourceAdapter, SyntheticWearProfile, ToolWearRecord,
    ToolWearSource,
};

pub use error::{EnvError, EnvResult, SourceError, TelemetryError};
pub use telemetry::{EpisodeLog, JsonLinesTelemetry, NoTelemetry, TelemetryEntry, TelemetrySink};
pub use types::{Action, Auxiliary, Observation, Step, StepInfo, StepTag, OBSERVATION_SIZE};
