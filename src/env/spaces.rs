//! Observation and action space descriptors.
//!
//! Spaces describe the expected ranges for agents and tooling; the
//! environment itself never rejects an out-of-bounds observation.

use serde::{Deserialize, Serialize};

use crate::types::{Observation, OBSERVATION_SIZE};

/// Continuous box with per-dimension bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: [f32; OBSERVATION_SIZE],
    pub high: [f32; OBSERVATION_SIZE],
}

impl BoxSpace {
    /// Same bounds on every dimension.
    pub const fn uniform(low: f32, high: f32) -> Self {
        Self {
            low: [low; OBSERVATION_SIZE],
            high: [high; OBSERVATION_SIZE],
        }
    }

    pub const fn shape(&self) -> [usize; 1] {
        [OBSERVATION_SIZE]
    }

    /// Whether every channel lies within its bounds (inclusive).
    pub fn contains(&self, observation: &Observation) -> bool {
        observation
            .0
            .iter()
            .zip(self.low.iter().zip(&self.high))
            .all(|(v, (lo, hi))| (*lo..=*hi).contains(v))
    }
}

/// Finite set of actions `{0, ..., n - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    pub const fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn contains(&self, action: i64) -> bool {
        usize::try_from(action).is_ok_and(|a| a < self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_contains_bounds_inclusive() {
        let space = BoxSpace::uniform(-1.0, 1.0);
        assert_eq!(space.shape(), [6]);
        assert!(space.contains(&Observation([1.0, -1.0, 0.0, 0.5, -0.5, 1.0])));
        assert!(!space.contains(&Observation([1.01, 0.0, 0.0, 0.0, 0.0, 0.0])));
        assert!(!space.contains(&Observation([0.0, 0.0, 0.0, 0.0, 0.0, f32::NAN])));
    }

    #[test]
    fn test_discrete_contains() {
        let space = Discrete::new(2);
        assert!(space.contains(0));
        assert!(space.contains(1));
        assert!(!space.contains(2));
        assert!(!space.contains(-1));
    }
}
