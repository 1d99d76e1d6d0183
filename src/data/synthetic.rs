//! Synthetic tool wear profiles.
//!
//! Generates a single run-to-failure tool history shaped like the PHM
//! milling data: RUL decays linearly to zero, wear grows with a slight
//! acceleration towards end of life, and the force / vibration channels
//! track wear plus Gaussian noise, clamped to the normalized [-1, 1] range.
//! The expert action code flips to replace once RUL drops below a fraction
//! of the starting life.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use super::{InMemorySource, ToolWearRecord};
use crate::error::SourceError;

/// Starting RUL of a fresh synthetic tool (arbitrary cutting-time units).
const INITIAL_RUL: f64 = 300.0;
/// Flank wear at end of life (micrometres).
const END_OF_LIFE_WEAR: f64 = 180.0;
/// Flank wear of a fresh tool (micrometres).
const FRESH_WEAR: f64 = 40.0;

/// Per-channel sensitivity to normalized wear, force x/y/z then vibration x/y/z.
const CHANNEL_GAIN: [f64; 6] = [0.55, 0.45, 0.70, 0.35, 0.40, 0.30];
/// Per-channel offset for a fresh tool.
const CHANNEL_OFFSET: [f64; 6] = [-0.30, -0.25, -0.40, -0.20, -0.20, -0.15];

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticWearProfile {
    /// Number of rows to generate
    pub records: usize,
    /// Standard deviation of the sensor noise
    pub noise_std: f64,
    /// `ACTION_CODE` becomes 1 once `rul < replace_rul_fraction × INITIAL_RUL`
    pub replace_rul_fraction: f64,
    pub seed: Option<u64>,
}

impl Default for SyntheticWearProfile {
    fn default() -> Self {
        Self {
            records: 1_000,
            noise_std: 0.05,
            replace_rul_fraction: 0.10,
            seed: None,
        }
    }
}

impl SyntheticWearProfile {
    pub fn with_records(records: usize) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate the record table.
    #[allow(clippy::cast_precision_loss)]
    pub fn generate(&self) -> Result<Vec<ToolWearRecord>, SourceError> {
        if self.records == 0 {
            return Err(SourceError::InvalidProfile("records must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.replace_rul_fraction) {
            return Err(SourceError::InvalidProfile(format!(
                "replace_rul_fraction ({}) must be within [0, 1]",
                self.replace_rul_fraction
            )));
        }
        let noise = Normal::new(0.0, self.noise_std).map_err(|e| {
            SourceError::InvalidProfile(format!("noise_std ({}): {e}", self.noise_std))
        })?;

        let mut rng = match self.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let last = (self.records.saturating_sub(1)).max(1) as f64;
        let replace_below = self.replace_rul_fraction * INITIAL_RUL;

        let records = (0..self.records)
            .map(|i| {
                let progress = i as f64 / last;
                let rul = INITIAL_RUL * (1.0 - progress);
                // wear accelerates towards end of life
                let wear_norm = 0.7 * progress + 0.3 * progress.powi(3);
                let tool_wear = FRESH_WEAR + (END_OF_LIFE_WEAR - FRESH_WEAR) * wear_norm;

                let mut channels = [0.0f64; 6];
                for (k, channel) in channels.iter_mut().enumerate() {
                    let value = CHANNEL_OFFSET[k] + CHANNEL_GAIN[k] * wear_norm + noise.sample(&mut rng);
                    *channel = value.clamp(-1.0, 1.0);
                }

                ToolWearRecord {
                    force_x: channels[0],
                    force_y: channels[1],
                    force_z: channels[2],
                    vibration_x: channels[3],
                    vibration_y: channels[4],
                    vibration_z: channels[5],
                    tool_wear,
                    action_code: i64::from(rul < replace_below),
                    rul,
                }
            })
            .collect();

        Ok(records)
    }

    /// Generate straight into an attachable source.
    pub fn build(&self) -> Result<InMemorySource, SourceError> {
        self.generate().map(InMemorySource::new)
    }
}

// ============================================================================
// Tests
// ============================================================================
