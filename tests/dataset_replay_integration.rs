//! Dataset Replay Integration Test
//!
//! Exercises the full path: write a PHM-style CSV, load it, attach it to an
//! environment and run expert-driven episodes to termination with
//! telemetry attached.

use milling_tool_env::{
    Action, EnvConfig, EpisodeLog, JsonLinesTelemetry, MillingToolEnv, ObservationLayout,
    PhmDataset, StepTag, SyntheticWearProfile, TelemetryEntry, TelemetrySink, ToolWearRecord,
    ToolWearSource,
};
use std::io::Write;

/// Write records as a PHM CSV, including the columns the loader ignores.
fn write_phm_csv(records: &[ToolWearRecord]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "cut,force_x,force_y,force_z,vibration_x,vibration_y,vibration_z,acoustic_emission_rms,tool_wear,ACTION_CODE,RUL"
    )
    .unwrap();
    for (i, r) in records.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{},{},{},0.5,{},{},{}",
            i, r.force_x, r.force_y, r.force_z, r.vibration_x, r.vibration_y, r.vibration_z,
            r.tool_wear, r.action_code, r.rul
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

/// Pick the expert's recommendation for the current row.
fn expert_action<S: TelemetrySink>(env: &MillingToolEnv<S>) -> Action {
    let t = env.current_time_step();
    if t >= env.records() {
        return Action::Continue;
    }
    Action::try_from(env.read_auxiliary(t).unwrap().recommended_action).unwrap()
}

#[test]
fn csv_dataset_round_trips_into_environment() {
    let records = SyntheticWearProfile::with_records(300).seeded(8).generate().unwrap();
    let file = write_phm_csv(&records);

    let dataset = PhmDataset::load(file.path()).unwrap();
    assert_eq!(dataset.len(), 300);
    assert_eq!(dataset.skipped_rows, 0);
    for (loaded, original) in dataset.records().iter().zip(&records) {
        assert_eq!(loaded.action_code, original.action_code);
        assert!((loaded.rul - original.rul).abs() < 1e-9);
        assert!((loaded.force_z - original.force_z).abs() < 1e-9);
    }

    let mut env = MillingToolEnv::with_records(0, 0.0).unwrap();
    assert_eq!(env.attach(Box::new(dataset)), 300);
    let (obs, _) = env.reset(Some(1), None).unwrap();
    assert!(env.observation_space().contains(&obs));
}

#[test]
fn expert_policy_replaces_near_end_of_life() {
    // threshold below zero: only end of data can stop the episode
    let source = SyntheticWearProfile::with_records(400).seeded(2).build().unwrap();
    let mut env =
        MillingToolEnv::with_telemetry(EnvConfig::new(0, -1.0), EpisodeLog::new()).unwrap();
    env.attach(Box::new(source));
    env.reset(Some(10), None).unwrap();
    let start = env.current_time_step();

    let end = loop {
        let action = expert_action(&env);
        let step = env.step(action).unwrap();
        if step.done() {
            break step;
        }
    };
    assert_eq!(end.info.tag, StepTag::EndOfData);

    let log = env.telemetry();
    assert_eq!(log.len(), 400 - start + 1);
    // the end-of-data step carries the last row's recommendation, which the
    // policy cannot act on
    assert_eq!(log.expert_agreement(), log.len() - 1);
    assert!(env.replacement_events() > 0);

    // every replacement happened where the expert asked for one
    for entry in log.entries().iter().filter(|e| e.tag == StepTag::Replace) {
        assert_eq!(entry.recommended_action, 1);
        assert_eq!(entry.time_since_last_replacement, entry.time_step);
    }
}

#[test]
fn full_axes_layout_observes_vibration_z() {
    let records = SyntheticWearProfile::with_records(200).seeded(4).generate().unwrap();
    let mut legacy = MillingToolEnv::with_records(0, 0.0).unwrap();
    legacy.attach_records(records.clone());

    let mut config = EnvConfig::default();
    config.environment.observation_layout = ObservationLayout::FullAxes;
    let mut full = MillingToolEnv::new(config).unwrap();
    full.attach_records(records.clone());

    let row = &records[7];
    let a = legacy.read_observation(7).unwrap();
    let b = full.read_observation(7).unwrap();
    assert_eq!(a.0[..5], b.0[..5]);
    assert_eq!(a.0[5], row.vibration_y as f32);
    assert_eq!(b.0[5], row.vibration_z as f32);
}

#[test]
fn json_telemetry_streams_every_step() {
    let source = SyntheticWearProfile::with_records(120).seeded(6).build().unwrap();
    let mut env = MillingToolEnv::with_telemetry(
        EnvConfig::new(0, 5.0),
        JsonLinesTelemetry::new(Vec::new()),
    )
    .unwrap();
    env.attach(Box::new(source));
    env.reset(Some(0), None).unwrap();

    let mut steps = 0;
    loop {
        steps += 1;
        if env.step(Action::Continue).unwrap().terminated {
            break;
        }
    }

    env.telemetry_mut().flush().unwrap();
    assert_eq!(env.telemetry().written(), steps);
    let bytes = env.into_telemetry().into_inner();
    let entries: Vec<TelemetryEntry> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.len(), steps);
    assert_eq!(entries.last().unwrap().tag, StepTag::RulThresholdCrossed);
}
