//! Milling tool degradation environment.
//!
//! ## Episode state machine
//!
//! `reset` places the tool at a random time index within the first
//! `random_start_fraction` of the records (a tool that has already seen an
//! unknown amount of use). Each `step` then:
//!
//! 1. reads the expert action and RUL at the current index,
//! 2. zeroes the per-step maintenance cost,
//! 3. terminates without applying the action if the index is past the end
//!    of data, or else if RUL is at or below the threshold,
//! 4. otherwise applies the action (both advance time by one; replace also
//!    pays the replacement cost and records the replacement),
//! 5. computes `reward = (t + 1) / (cost + lambda) / reward_scale` from
//!    whatever state results.
//!
//! On the terminating branches the cost stays at zero, so the reward there
//! is `(t + 1) / lambda / reward_scale`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info};

use super::spaces::{BoxSpace, Discrete};
use super::Environment;
use crate::config::{BookkeepingResetPolicy, ConfigError, EnvConfig, RenderMode};
use crate::data::{InMemorySource, SourceAdapter, ToolWearRecord, ToolWearSource};
use crate::error::{EnvError, EnvResult};
use crate::render::render_step_line;
use crate::telemetry::{NoTelemetry, TelemetryEntry, TelemetrySink};
use crate::types::{Action, Auxiliary, Observation, Step, StepInfo, StepTag};

/// Extra reset parameters. Accepted for API compatibility; no keys are
/// currently interpreted.
pub type ResetOptions = HashMap<String, serde_json::Value>;

pub struct MillingToolEnv<S: TelemetrySink = NoTelemetry> {
    config: EnvConfig,
    adapter: SourceAdapter,
    rng: StdRng,
    telemetry: S,

    // Episode state
    records: usize,
    current_time_step: usize,
    maintenance_cost: f64,
    replacement_events: u64,
    time_since_last_replacement: usize,
    /// Auxiliary reading from the most recent in-range step
    last_auxiliary: Auxiliary,
    episode_started: bool,
}

impl MillingToolEnv<NoTelemetry> {
    pub fn new(config: EnvConfig) -> Result<Self, ConfigError> {
        Self::with_telemetry(config, NoTelemetry)
    }

    /// Reference configuration with the two constructor parameters set.
    pub fn with_records(records: usize, rul_threshold: f64) -> Result<Self, ConfigError> {
        Self::new(EnvConfig::new(records, rul_threshold))
    }
}

impl<S: TelemetrySink> MillingToolEnv<S> {
    /// Build an environment around `config`, which must pass
    /// [`EnvConfig::validate`]. `lambda` and `reward_scale` are divisors
    /// and a NaN threshold would never terminate.
    pub fn with_telemetry(config: EnvConfig, telemetry: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let rng = match config.environment.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        info!(
            records = config.environment.records,
            rul_threshold = config.environment.rul_threshold,
            "Milling tool environment initialized"
        );
        Ok(Self {
            adapter: SourceAdapter::new(config.environment.observation_layout),
            records: config.environment.records,
            config,
            rng,
            telemetry,
            current_time_step: 0,
            maintenance_cost: 0.0,
            replacement_events: 0,
            time_since_last_replacement: 0,
            last_auxiliary: Auxiliary::default(),
            episode_started: false,
        })
    }

    // ========================================================================
    // Data attachment
    // ========================================================================

    /// Install a tool wear data source; `records` (and the config's
    /// `environment.records`) becomes its length.
    ///
    /// The current episode, if any, is invalidated: call `reset` before the
    /// next `step`.
    pub fn attach(&mut self, source: Box<dyn ToolWearSource>) -> usize {
        self.records = self.adapter.attach(source);
        self.config.environment.records = self.records;
        self.episode_started = false;
        info!(records = self.records, "Tool wear data attached");
        self.records
    }

    /// Convenience for attaching an in-memory table.
    pub fn attach_records(&mut self, records: Vec<ToolWearRecord>) -> usize {
        self.attach(Box::new(InMemorySource::new(records)))
    }

    pub fn read_observation(&self, time_index: usize) -> EnvResult<Observation> {
        self.adapter.read_observation(time_index)
    }

    pub fn read_auxiliary(&self, time_index: usize) -> EnvResult<Auxiliary> {
        self.adapter.read_auxiliary(time_index)
    }

    // ========================================================================
    // Episode API
    // ========================================================================

    /// Start a new episode.
    ///
    /// A seed reseeds this instance's RNG; without one the existing stream
    /// continues. Bookkeeping is only cleared under
    /// [`BookkeepingResetPolicy::PerEpisode`].
    pub fn reset(
        &mut self,
        seed: Option<u64>,
        _options: Option<&ResetOptions>,
    ) -> EnvResult<(Observation, StepInfo)> {
        if let Some(s) = seed {
            self.rng = StdRng::seed_from_u64(s);
        }

        if self.config.environment.bookkeeping_reset == BookkeepingResetPolicy::PerEpisode {
            self.maintenance_cost = 0.0;
            self.replacement_events = 0;
            self.time_since_last_replacement = 0;
        }

        let upper = self.start_window();
        self.current_time_step = if upper == 0 {
            0
        } else {
            self.rng.gen_range(0..upper)
        };
        self.last_auxiliary = Auxiliary::default();
        self.episode_started = true;

        debug!(
            time_step = self.current_time_step,
            start_window = upper,
            "Episode reset"
        );

        let observation = self.observe()?;
        Ok((observation, StepInfo::reset()))
    }

    /// Advance one time index under `action`.
    pub fn step(&mut self, action: Action) -> EnvResult<Step<Observation>> {
        if !self.episode_started {
            return Err(EnvError::InvalidState(
                "step called before reset".to_string(),
            ));
        }

        let aux = if self.current_time_step < self.records {
            let aux = self.adapter.read_auxiliary(self.current_time_step)?;
            self.last_auxiliary = aux;
            aux
        } else {
            self.last_auxiliary
        };
        self.maintenance_cost = 0.0;

        let costs = &self.config.costs;
        let tag = if self.current_time_step >= self.records {
            StepTag::EndOfData
        } else if aux.rul <= self.config.environment.rul_threshold {
            StepTag::RulThresholdCrossed
        } else {
            match action {
                Action::Continue => {
                    self.current_time_step += 1;
                    self.maintenance_cost += costs.continue_cost;
                    StepTag::None
                }
                Action::Replace => {
                    self.current_time_step += 1;
                    self.maintenance_cost += costs.replace_cost;
                    self.replacement_events += 1;
                    self.time_since_last_replacement = self.current_time_step;
                    StepTag::Replace
                }
            }
        };

        let reward = self.reward();
        let terminated = tag.is_terminal();

        self.telemetry.record(&TelemetryEntry {
            time_step: self.current_time_step,
            action,
            recommended_action: aux.recommended_action,
            reward,
            rul: aux.rul,
            maintenance_cost: self.maintenance_cost,
            replacement_events: self.replacement_events,
            time_since_last_replacement: self.time_since_last_replacement,
            tag,
        });

        if terminated {
            info!(
                time_step = self.current_time_step,
                rul = aux.rul,
                replacements = self.replacement_events,
                reason = %tag,
                "Episode terminated"
            );
        } else {
            debug!(time_step = self.current_time_step, %action, reward, "Step");
        }

        if self.config.render.mode == RenderMode::Human {
            eprintln!(
                "{}",
                render_step_line(action, aux.rul, self.maintenance_cost, reward)
            );
        }

        let observation = self.observe()?;
        Ok(Step {
            observation,
            reward,
            terminated,
            truncated: false,
            info: StepInfo::with_auxiliary(tag, aux),
        })
    }

    /// `step` with a raw action code, as sent by external agents.
    pub fn step_code(&mut self, action: i64) -> EnvResult<Step<Observation>> {
        let action = Action::try_from(action)?;
        self.step(action)
    }

    #[allow(clippy::cast_precision_loss)]
    fn reward(&self) -> f64 {
        let costs = &self.config.costs;
        (self.current_time_step as f64 + 1.0)
            / (self.maintenance_cost + costs.lambda)
            / costs.reward_scale
    }

    /// Exclusive upper bound of the random start index.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn start_window(&self) -> usize {
        (self.config.environment.random_start_fraction * self.records as f64).floor() as usize
    }

    /// Observation at the current index. Past the end of attached data there
    /// is no row to read, so the terminal observation is all zeros.
    fn observe(&self) -> EnvResult<Observation> {
        if self.adapter.is_attached() && self.current_time_step >= self.records {
            return Ok(Observation::zeros());
        }
        self.adapter.read_observation(self.current_time_step)
    }

    // ========================================================================
    // Spaces & accessors
    // ========================================================================

    pub const fn observation_space(&self) -> BoxSpace {
        BoxSpace::uniform(-1.0, 1.0)
    }

    pub const fn action_space(&self) -> Discrete {
        Discrete::new(Action::COUNT)
    }

    pub const fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub const fn records(&self) -> usize {
        self.records
    }

    pub const fn rul_threshold(&self) -> f64 {
        self.config.environment.rul_threshold
    }

    pub const fn current_time_step(&self) -> usize {
        self.current_time_step
    }

    pub const fn maintenance_cost(&self) -> f64 {
        self.maintenance_cost
    }

    pub const fn replacement_events(&self) -> u64 {
        self.replacement_events
    }

    pub const fn time_since_last_replacement(&self) -> usize {
        self.time_since_last_replacement
    }

    pub fn is_attached(&self) -> bool {
        self.adapter.is_attached()
    }

    pub const fn telemetry(&self) -> &S {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut S {
        &mut self.telemetry
    }

    pub fn into_telemetry(self) -> S {
        self.telemetry
    }
}

impl<S: TelemetrySink> Environment for MillingToolEnv<S> {
    type Observation = Observation;
    type Action = Action;

    fn reset(
        &mut self,
        seed: Option<u64>,
        options: Option<&ResetOptions>,
    ) -> EnvResult<(Observation, StepInfo)> {
        Self::reset(self, seed, options)
    }

    fn step(&mut self, action: Action) -> EnvResult<Step<Observation>> {
        Self::step(self, action)
    }
}

impl<S: TelemetrySink> std::fmt::Debug for MillingToolEnv<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MillingToolEnv")
            .field("adapter", &self.adapter)
            .field("records", &self.records)
            .field("current_time_step", &self.current_time_step)
            .field("maintenance_cost", &self.maintenance_cost)
            .field("replacement_events", &self.replacement_events)
            .field("time_since_last_replacement", &self.time_since_last_replacement)
            .field("episode_started", &self.episode_started)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::EpisodeLog;

    /// `n` rows with RUL counting down from `n` to 1.
    fn ramp(n: usize) -> Vec<ToolWearRecord> {
        (0..n)
            .map(|i| ToolWearRecord {
                force_x: i as f64 / n as f64,
                rul: (n - i) as f64,
                action_code: i64::from(i + 5 >= n),
                ..ToolWearRecord::default()
            })
            .collect()
    }

    fn env_with(n: usize, threshold: f64) -> MillingToolEnv {
        let mut env = MillingToolEnv::with_records(0, threshold).unwrap();
        env.attach_records(ramp(n));
        env
    }

    /// Like `env_with` but every episode starts at index 0.
    fn env_from_start(n: usize, threshold: f64) -> MillingToolEnv {
        let mut config = EnvConfig::new(0, threshold);
        config.environment.random_start_fraction = 0.0;
        let mut env = MillingToolEnv::new(config).unwrap();
        env.attach_records(ramp(n));
        env
    }

    #[test]
    fn test_step_before_reset_is_invalid_state() {
        let mut env = env_with(100, 0.0);
        assert!(matches!(env.step(Action::Continue), Err(EnvError::InvalidState(_))));
    }

    #[test]
    fn test_attach_invalidates_episode() {
        let mut env = env_with(100, 0.0);
        env.reset(Some(1), None).unwrap();
        env.attach_records(ramp(50));
        assert_eq!(env.records(), 50);
        assert_eq!(env.config().environment.records, 50);
        assert!(matches!(env.step(Action::Continue), Err(EnvError::InvalidState(_))));
    }

    #[test]
    fn test_invalid_action_code_rejected() {
        let mut env = env_with(100, 0.0);
        env.reset(Some(1), None).unwrap();
        let t = env.current_time_step();
        assert!(matches!(env.step_code(2), Err(EnvError::InvalidArgument(_))));
        assert_eq!(env.current_time_step(), t, "rejected action must not advance time");
        assert!(env.step_code(1).is_ok());
    }

    #[test]
    fn test_continue_reward_and_advance() {
        let mut env = env_with(1000, 0.0);
        env.reset(Some(3), None).unwrap();
        let t = env.current_time_step();
        let step = env.step(Action::Continue).unwrap();
        let expected = (t as f64 + 2.0) / (0.1 + 0.01) / 1000.0;
        assert!((step.reward - expected).abs() < 1e-12);
        assert_eq!(env.current_time_step(), t + 1);
        assert_eq!(step.info.tag, StepTag::None);
        assert_eq!(step.info.rul, Some((1000 - t) as f64));
        assert!(!step.terminated);
        assert!(!step.truncated);
    }

    #[test]
    fn test_replace_bookkeeping() {
        let mut env = env_with(1000, 0.0);
        env.reset(Some(3), None).unwrap();
        let step = env.step(Action::Replace).unwrap();
        assert_eq!(step.info.tag, StepTag::Replace);
        assert_eq!(env.replacement_events(), 1);
        assert_eq!(env.time_since_last_replacement(), env.current_time_step());
        assert_eq!(env.maintenance_cost(), 10.0);
    }

    #[test]
    fn test_cost_is_per_step() {
        let mut env = env_with(1000, 0.0);
        env.reset(Some(3), None).unwrap();
        env.step(Action::Replace).unwrap();
        env.step(Action::Continue).unwrap();
        assert!((env.maintenance_cost() - 0.1).abs() < 1e-12);
        assert_eq!(env.replacement_events(), 1);
    }

    #[test]
    fn test_threshold_termination_does_not_apply_action() {
        // RUL at index i is 20 - i; threshold 15 is crossed at index 5
        let mut env = env_from_start(20, 15.0);
        env.reset(Some(0), None).unwrap();
        assert_eq!(env.current_time_step(), 0);
        for _ in 0..5 {
            assert!(!env.step(Action::Continue).unwrap().terminated);
        }
        let step = env.step(Action::Replace).unwrap();
        assert!(step.terminated);
        assert_eq!(step.info.tag, StepTag::RulThresholdCrossed);
        assert_eq!(env.current_time_step(), 5);
        assert_eq!(env.replacement_events(), 0);
        assert_eq!(env.maintenance_cost(), 0.0);
        // zero cost on the terminating branch
        assert!((step.reward - 6.0 / 0.01 / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_end_of_data_returns_zero_observation() {
        let mut env = env_with(5, -1.0);
        env.reset(Some(0), None).unwrap();
        for _ in 0..4 {
            env.step(Action::Continue).unwrap();
        }
        let last = env.step(Action::Continue).unwrap();
        assert!(!last.terminated);
        assert_eq!(env.current_time_step(), 5);
        assert_eq!(last.observation, Observation::zeros());

        let end = env.step(Action::Continue).unwrap();
        assert!(end.terminated);
        assert_eq!(end.info.tag, StepTag::EndOfData);
        assert_eq!(env.current_time_step(), 5);
        // auxiliary carried over from the last row read
        assert_eq!(end.info.rul, Some(1.0));
    }

    #[test]
    fn test_no_source_terminates_on_zero_rul() {
        let mut env = MillingToolEnv::with_records(100, 0.0).unwrap();
        let (obs, info) = env.reset(Some(0), None).unwrap();
        assert_eq!(obs, Observation::zeros());
        assert_eq!(info.tag, StepTag::Reset);
        let step = env.step(Action::Continue).unwrap();
        assert!(step.terminated);
        assert_eq!(step.info.tag, StepTag::RulThresholdCrossed);
    }

    #[test]
    fn test_small_record_count_starts_at_zero() {
        let mut env = env_with(9, 0.0);
        for seed in 0..20 {
            env.reset(Some(seed), None).unwrap();
            assert_eq!(env.current_time_step(), 0);
        }
    }

    #[test]
    fn test_bookkeeping_persists_by_default() {
        let mut env = env_with(1000, 0.0);
        env.reset(Some(1), None).unwrap();
        env.step(Action::Replace).unwrap();
        env.reset(Some(2), None).unwrap();
        assert_eq!(env.replacement_events(), 1);
        assert_eq!(env.maintenance_cost(), 10.0);
    }

    #[test]
    fn test_per_episode_policy_clears_bookkeeping() {
        let mut config = EnvConfig::default();
        config.environment.bookkeeping_reset = BookkeepingResetPolicy::PerEpisode;
        let mut env = MillingToolEnv::new(config).unwrap();
        env.attach_records(ramp(1000));
        env.reset(Some(1), None).unwrap();
        env.step(Action::Replace).unwrap();
        env.reset(Some(2), None).unwrap();
        assert_eq!(env.replacement_events(), 0);
        assert_eq!(env.maintenance_cost(), 0.0);
        assert_eq!(env.time_since_last_replacement(), 0);
    }

    #[test]
    fn test_telemetry_records_each_step() {
        let mut env =
            MillingToolEnv::with_telemetry(EnvConfig::default(), EpisodeLog::new()).unwrap();
        env.attach_records(ramp(1000));
        env.reset(Some(4), None).unwrap();
        env.step(Action::Continue).unwrap();
        env.step(Action::Replace).unwrap();

        let log = env.telemetry();
        assert_eq!(log.len(), 2);
        let second = &log.entries()[1];
        assert_eq!(second.action, Action::Replace);
        assert_eq!(second.replacement_events, 1);
        assert_eq!(second.time_step, env.current_time_step());
        assert_eq!(second.time_since_last_replacement, env.current_time_step());
        assert_eq!(second.tag, StepTag::Replace);

        env.telemetry_mut().reset();
        assert!(env.telemetry().is_empty());
    }

    #[test]
    fn test_spaces() {
        let env = MillingToolEnv::with_records(0, 0.0).unwrap();
        assert_eq!(env.action_space().n, 2);
        assert_eq!(env.observation_space().shape(), [6]);
        assert_eq!(env.observation_space().low, [-1.0; 6]);
    }

    #[test]
    fn test_human_render_mode_steps_normally() {
        let mut config = EnvConfig::new(0, 0.0);
        config.environment.random_start_fraction = 0.0;
        config.render.mode = RenderMode::Human;
        let mut env = MillingToolEnv::with_telemetry(config, EpisodeLog::new()).unwrap();
        env.attach_records(ramp(10));
        env.reset(None, None).unwrap();

        let step = env.step(Action::Replace).unwrap();
        assert_eq!(step.info.tag, StepTag::Replace);
        assert!(!step.done());
        assert_eq!(env.telemetry().rewards(), vec![step.reward]);
    }
}
