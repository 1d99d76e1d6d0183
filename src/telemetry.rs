//! Per-step telemetry sinks.
//!
//! Each environment owns its sink; nothing here is process-global, so
//! parallel environments never interleave their logs. The default
//! [`NoTelemetry`] discards everything.

use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::TelemetryError;
use crate::types::{Action, StepTag};

/// One row of step telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    /// Time step after the action was applied
    pub time_step: usize,
    pub action: Action,
    pub recommended_action: i64,
    pub reward: f64,
    pub rul: f64,
    pub maintenance_cost: f64,
    pub replacement_events: u64,
    pub time_since_last_replacement: usize,
    pub tag: StepTag,
}

/// Destination for step telemetry.
pub trait TelemetrySink {
    /// Record one step.
    fn record(&mut self, entry: &TelemetryEntry);

    /// Discard anything recorded so far.
    fn reset(&mut self) {}

    /// Push buffered output to its destination.
    fn flush(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Sink that drops every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTelemetry;

impl TelemetrySink for NoTelemetry {
    fn record(&mut self, _entry: &TelemetryEntry) {}
}

// ============================================================================
// In-memory log
// ============================================================================

/// Keeps every entry in memory for post-hoc analysis.
#[derive(Debug, Clone, Default)]
pub struct EpisodeLog {
    entries: Vec<TelemetryEntry>,
}

impl EpisodeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TelemetryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all entries, leaving the log empty.
    pub fn drain(&mut self) -> Vec<TelemetryEntry> {
        std::mem::take(&mut self.entries)
    }

    pub fn rewards(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.reward).collect()
    }

    pub fn total_reward(&self) -> f64 {
        self.entries.iter().map(|e| e.reward).sum()
    }

    /// Steps where the agent's action matched the expert recommendation.
    pub fn expert_agreement(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action.code() == e.recommended_action)
            .count()
    }

    /// Write the log as CSV with a header row.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<(), TelemetryError> {
        writeln!(
            writer,
            "time_step,action,recommended_action,reward,rul,maintenance_cost,replacement_events,time_since_last_replacement,tag"
        )?;
        for e in &self.entries {
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{},{}",
                e.time_step,
                e.action.code(),
                e.recommended_action,
                e.reward,
                e.rul,
                e.maintenance_cost,
                e.replacement_events,
                e.time_since_last_replacement,
                e.tag,
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TelemetrySink for EpisodeLog {
    fn record(&mut self, entry: &TelemetryEntry) {
        self.entries.push(entry.clone());
    }

    fn reset(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// JSON lines stream
// ============================================================================

/// Streams one JSON object per step to a writer.
///
/// Write errors are counted rather than raised so a full disk cannot abort
/// an episode; `flush` reports the first one.
pub struct JsonLinesTelemetry<W: Write> {
    writer: W,
    written: usize,
    failed: usize,
    first_error: Option<TelemetryError>,
}

impl<W: Write> JsonLinesTelemetry<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failed: 0,
            first_error: None,
        }
    }

    pub const fn written(&self) -> usize {
        self.written
    }

    pub const fn failed(&self) -> usize {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_entry(&mut self, entry: &TelemetryEntry) -> Result<(), TelemetryError> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> TelemetrySink for JsonLinesTelemetry<W> {
    fn record(&mut self, entry: &TelemetryEntry) {
        match self.write_entry(entry) {
            Ok(()) => self.written += 1,
            Err(e) => {
                if self.failed == 0 {
                    tracing::warn!(error = %e, "Telemetry write failed");
                }
                self.failed += 1;
                self.first_error.get_or_insert(e);
            }
        }
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        if let Some(e) = self.first_error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> std::fmt::Debug for JsonLinesTelemetry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesTelemetry")
            .field("written", &self.written)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
