//! Tool wear data sources.
//!
//! The environment never sees files or generators directly: it reads rows
//! through the [`ToolWearSource`] trait, wrapped by [`SourceAdapter`] which
//! turns rows into observations and auxiliary readings and supplies the
//! all-zero fallback when nothing is attached.

pub mod phm;
pub mod synthetic;

pub use phm::PhmDataset;
pub use synthetic::SyntheticWearProfile;

use serde::{Deserialize, Serialize};

use crate::config::ObservationLayout;
use crate::error::{EnvError, EnvResult};
use crate::types::{Auxiliary, Observation};

// ============================================================================
// Record
// ============================================================================

/// One time-indexed row of the milling dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolWearRecord {
    pub force_x: f64,
    pub force_y: f64,
    pub force_z: f64,
    pub vibration_x: f64,
    pub vibration_y: f64,
    pub vibration_z: f64,
    /// Physical wear proxy; carried but not observed
    pub tool_wear: f64,
    /// Expert-recommended action code (`ACTION_CODE` column)
    pub action_code: i64,
    /// Remaining useful life (`RUL` column)
    pub rul: f64,
}

impl ToolWearRecord {
    /// Observation channels in the given layout, narrowed to `f32`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn observation(&self, layout: ObservationLayout) -> Observation {
        let third_vibration = match layout {
            ObservationLayout::Legacy => self.vibration_y,
            ObservationLayout::FullAxes => self.vibration_z,
        };
        Observation([
            self.force_x as f32,
            self.force_y as f32,
            self.force_z as f32,
            self.vibration_x as f32,
            self.vibration_y as f32,
            third_vibration as f32,
        ])
    }

    pub const fn auxiliary(&self) -> Auxiliary {
        Auxiliary {
            recommended_action: self.action_code,
            rul: self.rul,
        }
    }
}

// ============================================================================
// Source Trait
// ============================================================================

/// A contiguous, 0-based, read-only table of tool wear records.
pub trait ToolWearSource: Send {
    /// Number of rows.
    fn len(&self) -> usize;

    /// Row at `index`, or `None` past the end.
    fn record(&self, index: usize) -> Option<&ToolWearRecord>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `Vec`-backed source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemorySource {
    records: Vec<ToolWearRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<ToolWearRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ToolWearRecord] {
        &self.records
    }
}

impl From<Vec<ToolWearRecord>> for InMemorySource {
    fn from(records: Vec<ToolWearRecord>) -> Self {
        Self::new(records)
    }
}

impl ToolWearSource for InMemorySource {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn record(&self, index: usize) -> Option<&ToolWearRecord> {
        self.records.get(index)
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Holds the optional attached source and extracts observations from it.
pub struct SourceAdapter {
    source: Option<Box<dyn ToolWearSource>>,
    layout: ObservationLayout,
}

impl SourceAdapter {
    pub fn new(layout: ObservationLayout) -> Self {
        Self {
            source: None,
            layout,
        }
    }

    /// Install a source, replacing any previous one. Returns its row count.
    pub fn attach(&mut self, source: Box<dyn ToolWearSource>) -> usize {
        let records = source.len();
        self.source = Some(source);
        records
    }

    /// Remove the attached source, falling back to zero readings.
    pub fn detach(&mut self) -> Option<Box<dyn ToolWearSource>> {
        self.source.take()
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    pub const fn layout(&self) -> ObservationLayout {
        self.layout
    }

    /// Row count of the attached source, if any.
    pub fn len(&self) -> Option<usize> {
        self.source.as_ref().map(|s| s.len())
    }

    /// Observation at `time_index`; all zeros when nothing is attached.
    pub fn read_observation(&self, time_index: usize) -> EnvResult<Observation> {
        match &self.source {
            None => Ok(Observation::zeros()),
            Some(source) => Self::row(source.as_ref(), time_index)
                .map(|record| record.observation(self.layout)),
        }
    }

    /// Recommended action and RUL at `time_index`; `(0, 0.0)` when nothing
    /// is attached.
    pub fn read_auxiliary(&self, time_index: usize) -> EnvResult<Auxiliary> {
        match &self.source {
            None => Ok(Auxiliary::default()),
            Some(source) => Self::row(source.as_ref(), time_index).map(ToolWearRecord::auxiliary),
        }
    }

    fn row(source: &dyn ToolWearSource, index: usize) -> EnvResult<&ToolWearRecord> {
        source.record(index).ok_or(EnvError::IndexOutOfRange {
            index,
            records: source.len(),
        })
    }
}

impl std::fmt::Debug for SourceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceAdapter")
            .field("records", &self.len())
            .field("layout", &self.layout)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
