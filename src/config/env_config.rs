//! Environment Configuration - episode, cost and render settings as TOML
//!
//! Each struct implements `Default` with the reference values, so an empty
//! or missing config file reproduces the reference environment exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one environment instance.
///
/// Load with `EnvConfig::load()` which searches:
/// 1. `$MILLING_ENV_CONFIG` env var
/// 2. `./milling_env.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Episode bounds and state handling
    #[serde(default)]
    pub environment: EpisodeConfig,

    /// Reward model constants
    #[serde(default)]
    pub costs: CostConfig,

    /// Human-readable output
    #[serde(default)]
    pub render: RenderConfig,
}

impl EnvConfig {
    /// Config with the two constructor parameters set and everything else default.
    pub fn new(records: usize, rul_threshold: f64) -> Self {
        Self {
            environment: EpisodeConfig {
                records,
                rul_threshold,
                ..EpisodeConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration using the standard search order:
    /// 1. `$MILLING_ENV_CONFIG` environment variable
    /// 2. `./milling_env.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded environment config from {}", defaults::CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", defaults::CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./milling_env.toml
        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded environment config from ./{}", defaults::CONFIG_FILE_NAME);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", defaults::CONFIG_FILE_NAME);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", defaults::CONFIG_FILE_NAME);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Save config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Environment config saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Every float must be finite
    /// - `lambda` and `reward_scale` must be > 0 (both are divisors)
    /// - Costs must be >= 0
    /// - `random_start_fraction` must lie in [0, 1]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let e = &self.environment;
        let c = &self.costs;

        for (name, value) in [
            ("environment.rul_threshold", e.rul_threshold),
            ("environment.random_start_fraction", e.random_start_fraction),
            ("costs.continue_cost", c.continue_cost),
            ("costs.replace_cost", c.replace_cost),
            ("costs.lambda", c.lambda),
            ("costs.reward_scale", c.reward_scale),
        ] {
            if !value.is_finite() {
                errors.push(format!("{name} must be finite (got {value})"));
            }
        }

        if !(0.0..=1.0).contains(&e.random_start_fraction) {
            errors.push(format!(
                "environment.random_start_fraction ({:.3}) must be within [0, 1]",
                e.random_start_fraction
            ));
        }
        if c.lambda <= 0.0 {
            errors.push(format!("costs.lambda ({}) must be > 0 (used as divisor)", c.lambda));
        }
        if c.reward_scale <= 0.0 {
            errors.push(format!(
                "costs.reward_scale ({}) must be > 0 (used as divisor)",
                c.reward_scale
            ));
        }
        if c.continue_cost < 0.0 {
            errors.push(format!("costs.continue_cost ({}) cannot be negative", c.continue_cost));
        }
        if c.replace_cost < 0.0 {
            errors.push(format!("costs.replace_cost ({}) cannot be negative", c.replace_cost));
        }

        for w in &super::validation::validate_cost_ranges(self) {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Episode
// ============================================================================

/// Which sensor channels make up the six observation slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationLayout {
    /// force x/y/z, vibration x/y/y. vibration_z is never observed and
    /// vibration_y fills the last slot. Reference behaviour; probably a
    /// channel-mapping slip, kept until confirmed with the data owners.
    #[default]
    Legacy,
    /// force x/y/z, vibration x/y/z
    FullAxes,
}

/// What `reset` does with the maintenance bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookkeepingResetPolicy {
    /// Keep cost, replacement count and last-replacement time across
    /// episodes (fleet-lifetime accounting). Reference behaviour.
    #[default]
    Persist,
    /// Zero them on every reset.
    PerEpisode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Record count before any data is attached; replaced by the source length on attach
    #[serde(default)]
    pub records: usize,

    /// Episode terminates once a record's RUL is at or below this value
    #[serde(default)]
    pub rul_threshold: f64,

    /// Episodes start uniformly within the first `fraction × records` rows
    #[serde(default = "default_random_start_fraction")]
    pub random_start_fraction: f64,

    /// Seed for the environment's RNG at construction; entropy when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default)]
    pub observation_layout: ObservationLayout,

    #[serde(default)]
    pub bookkeeping_reset: BookkeepingResetPolicy,
}

fn default_random_start_fraction() -> f64 { defaults::RANDOM_START_FRACTION }

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            records: defaults::RECORDS,
            rul_threshold: defaults::RUL_THRESHOLD,
            random_start_fraction: default_random_start_fraction(),
            seed: None,
            observation_layout: ObservationLayout::default(),
            bookkeeping_reset: BookkeepingResetPolicy::default(),
        }
    }
}

// ============================================================================
// Costs
// ============================================================================

/// Reward model: `reward = (t + 1) / (cost + lambda) / reward_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Cost of one continue step (flat, not a fraction of life)
    #[serde(default = "default_continue_cost")]
    pub continue_cost: f64,

    /// Cost of one replacement
    #[serde(default = "default_replace_cost")]
    pub replace_cost: f64,

    #[serde(default = "default_lambda")]
    pub lambda: f64,

    #[serde(default = "default_reward_scale")]
    pub reward_scale: f64,
}

fn default_continue_cost() -> f64 { defaults::CONTINUE_COST }
fn default_replace_cost() -> f64 { defaults::REPLACE_COST }
fn default_lambda() -> f64 { defaults::LAMBDA }
fn default_reward_scale() -> f64 { defaults::REWARD_SCALE }

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            continue_cost: default_continue_cost(),
            replace_cost: default_replace_cost(),
            lambda: default_lambda(),
            reward_scale: default_reward_scale(),
        }
    }
}

// ============================================================================
// Render
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    None,
    /// One formatted line per step on stderr
    Human,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub mode: RenderMode,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = EnvConfig::default();
        assert_eq!(config.environment.records, 0);
        assert_eq!(config.environment.rul_threshold, 0.0);
        assert_eq!(config.environment.random_start_fraction, 0.10);
        assert_eq!(config.costs.continue_cost, 0.1);
        assert_eq!(config.costs.replace_cost, 10.0);
        assert_eq!(config.costs.lambda, 0.01);
        assert_eq!(config.costs.reward_scale, 1000.0);
        assert_eq!(config.environment.observation_layout, ObservationLayout::Legacy);
        assert_eq!(config.environment.bookkeeping_reset, BookkeepingResetPolicy::Persist);
        assert_eq!(config.render.mode, RenderMode::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EnvConfig::from_toml_str("").unwrap();
        assert_eq!(config, EnvConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = EnvConfig::from_toml_str(
            r#"
[environment]
rul_threshold = 5.0
bookkeeping_reset = "per_episode"

[costs]
replace_cost = 25.0
"#,
        )
        .unwrap();
        assert_eq!(config.environment.rul_threshold, 5.0);
        assert_eq!(config.environment.bookkeeping_reset, BookkeepingResetPolicy::PerEpisode);
        assert_eq!(config.environment.random_start_fraction, 0.10);
        assert_eq!(config.costs.replace_cost, 25.0);
        assert_eq!(config.costs.continue_cost, 0.1);
    }

    #[test]
    fn test_zero_lambda_rejected() {
        let mut config = EnvConfig::default();
        config.costs.lambda = 0.0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("costs.lambda")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut config = EnvConfig::default();
        config.environment.rul_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_preserves_values() {
        let mut config = EnvConfig::new(1200, 4.5);
        config.environment.seed = Some(7);
        config.environment.observation_layout = ObservationLayout::FullAxes;
        config.render.mode = RenderMode::Human;
        let text = config.to_toml().unwrap();
        let back = EnvConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
