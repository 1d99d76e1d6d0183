//! Core value types shared by the environment, data adapters and telemetry.
//!
//! Everything here is plain data: actions, observations, auxiliary readings
//! and the per-call info returned from `reset` / `step`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::EnvError;

// ============================================================================
// Observation
// ============================================================================

/// Number of sensor channels in an observation.
pub const OBSERVATION_SIZE: usize = 6;

/// Six-channel sensor observation: force x/y/z followed by three vibration
/// channels (see [`crate::config::ObservationLayout`] for which ones).
///
/// Values are nominally normalized to [-1.0, 1.0] but never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation(pub [f32; OBSERVATION_SIZE]);

impl Observation {
    /// All-zero observation, returned when no data is attached and as the
    /// terminal observation past the end of data.
    pub const fn zeros() -> Self {
        Self([0.0; OBSERVATION_SIZE])
    }
}

// ============================================================================
// Action
// ============================================================================

/// The two maintenance decisions available at each time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Action {
    /// Keep cutting with the current tool
    Continue = 0,
    /// Swap the tool for a new one
    Replace = 1,
}

impl Action {
    /// Number of discrete actions.
    pub const COUNT: usize = 2;

    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Human-readable label used by rendering.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Continue => "Continue",
            Self::Replace => "* REPLACE *",
        }
    }
}

impl TryFrom<i64> for Action {
    type Error = EnvError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Continue),
            1 => Ok(Self::Replace),
            other => Err(EnvError::InvalidArgument(format!(
                "action {other} is not in {{0 = continue, 1 = replace}}"
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

// ============================================================================
// Auxiliary Reading
// ============================================================================

/// Fields that accompany a record but are not part of the observation:
/// the expert's recommended action code and the remaining useful life.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Auxiliary {
    pub recommended_action: i64,
    pub rul: f64,
}

// ============================================================================
// Step Info
// ============================================================================

/// What happened during a `reset` or `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepTag {
    Reset,
    EndOfData,
    RulThresholdCrossed,
    /// Continue action applied
    None,
    /// Replace action applied
    Replace,
}

impl StepTag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::EndOfData => "end of data",
            Self::RulThresholdCrossed => "RUL threshold crossed",
            Self::None => "none",
            Self::Replace => "replace",
        }
    }

    /// Whether this tag ends the episode.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::EndOfData | Self::RulThresholdCrossed)
    }
}

impl fmt::Display for StepTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Info returned alongside every observation.
///
/// `recommended_action` and `rul` are the auxiliary readings taken at the
/// pre-transition time step; they are absent on reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub tag: StepTag,
    pub recommended_action: Option<i64>,
    pub rul: Option<f64>,
}

impl StepInfo {
    pub const fn reset() -> Self {
        Self {
            tag: StepTag::Reset,
            recommended_action: None,
            rul: None,
        }
    }

    pub const fn with_auxiliary(tag: StepTag, aux: Auxiliary) -> Self {
        Self {
            tag,
            recommended_action: Some(aux.recommended_action),
            rul: Some(aux.rul),
        }
    }

    /// Flatten into a string map for consumers that expect a dict-shaped info.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("step".to_string(), self.tag.to_string());
        if let Some(action) = self.recommended_action {
            map.insert("recommended_action".to_string(), action.to_string());
        }
        if let Some(rul) = self.rul {
            map.insert("rul".to_string(), rul.to_string());
        }
        map
    }
}

/// Result of a single `step` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<O> {
    pub observation: O,
    pub reward: f64,
    pub terminated: bool,
    /// Always false: there is no time-limit wrapper.
    pub truncated: bool,
    pub info: StepInfo,
}

impl<O> Step<O> {
    /// Whether the episode is over for either reason.
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

// ============================================================================
// Tests
// ============================================================================
