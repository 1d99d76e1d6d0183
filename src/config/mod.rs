//! Environment Configuration Module
//!
//! Provides per-experiment configuration loaded from TOML files. Every
//! constant of the reward model and episode logic is a field here, with
//! defaults matching the reference values in [`defaults`].
//!
//! ## Loading Order
//!
//! 1. `MILLING_ENV_CONFIG` environment variable (path to TOML file)
//! 2. `milling_env.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = EnvConfig::load();
//! let mut env = MillingToolEnv::new(config)?;
//! ```
//!
//! Configs are passed to each environment explicitly; there is no global
//! instance, so parallel environments can run with different settings.

mod env_config;
pub mod defaults;
pub mod validation;

pub use env_config::*;
