//! Built-in default constants.
//!
//! These are the reference configuration values. Every one of them can be
//! overridden through [`super::EnvConfig`].

// ============================================================================
// Episode
// ============================================================================

/// Fraction of the record range an episode may start in.
///
/// Models a tool that has already seen an unknown amount of use.
pub const RANDOM_START_FRACTION: f64 = 0.10;

/// Default number of records before any data is attached.
pub const RECORDS: usize = 0;

/// Default RUL termination threshold.
pub const RUL_THRESHOLD: f64 = 0.0;

// ============================================================================
// Costs & Reward
// ============================================================================

/// Flat cost of one continue step.
pub const CONTINUE_COST: f64 = 0.1;

/// Flat cost of one tool replacement.
pub const REPLACE_COST: f64 = 10.0;

/// Smoothing term in the reward denominator; keeps a zero-cost step finite.
pub const LAMBDA: f64 = 0.01;

/// Reward divisor.
pub const REWARD_SCALE: f64 = 1_000.0;

// ============================================================================
// Config file discovery
// ============================================================================

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "MILLING_ENV_CONFIG";

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "milling_env.toml";
