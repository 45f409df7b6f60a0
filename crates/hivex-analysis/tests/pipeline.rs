use hivex_analysis::{select_winners, RecordKey, WinnerTable};
use hivex_core::{AnalysisConfig, Source};
use hivex_events::{load_dataset, write_scalar_file, ScalarPoint, ScanMode};
use std::fs;
use std::path::{Path, PathBuf};

const REWARD: &str = "Environment/Cumulative Reward";
const LOCAL: &str = "OceanPlasticCollector/Local Reward";

fn scratch() -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hivex_pipeline_test_{}_{}",
        std::process::id(),
        chrono::Utc::now().timestamp_micros()
    ));
    fs::create_dir_all(&dir).expect("scratch");
    dir
}

fn write_run(split: &Path, name: &str, series: &[(&str, &[f32])]) {
    let agent = split.join(name).join("Agent");
    fs::create_dir_all(&agent).expect("agent dir");
    let mut points = Vec::new();
    for (tag, values) in series {
        for (i, v) in values.iter().enumerate() {
            points.push(ScalarPoint {
                step: (i as i64 + 1) * 5000,
                tag: tag.to_string(),
                value: *v,
            });
        }
    }
    write_scalar_file(&agent.join("events.out.tfevents.1700000000.node"), &points)
        .expect("event file");
}

#[test]
fn scan_select_and_serialize_ocean_plastic_results() {
    let root = scratch();
    let split = root.join("OceanPlasticCollection").join("test");
    write_run(
        &split,
        "OceanPlasticCollection_task_1_run_id_10_test",
        &[(REWARD, &[4.0, 6.0]), (LOCAL, &[1.0, 1.0])],
    );
    write_run(
        &split,
        "OceanPlasticCollection_task_1_run_id_20_test",
        &[(REWARD, &[7.0, 7.5]), (LOCAL, &[2.0, 4.0])],
    );
    write_run(
        &split,
        "OceanPlasticCollection_task_1_run_id_30_agent_count_8_test",
        &[(REWARD, &[99.0])],
    );

    let config = AnalysisConfig::builtin().expect("config");
    let dataset = config.dataset("OceanPlasticCollection").expect("dataset");
    let table = load_dataset(&root, &dataset.name, &[Source::Test], ScanMode::Baseline)
        .expect("load");
    assert_eq!(table.len(), 8);

    let winners = select_winners(&table, dataset, &config.tag_criteria).expect("select");
    let record = &winners.records[&RecordKey::new(1, None)];
    assert_eq!(record.winning_id, 20);
    assert_eq!(record.mean_values.len(), 2);
    assert!(record.mean_values.iter().all(|m| m.id == 20 && m.task == 1));
    let local = record
        .mean_values
        .iter()
        .find(|m| m.tag == LOCAL)
        .expect("local reward");
    assert_eq!(local.mean_value, 3.0);

    let mut table_out = WinnerTable::default();
    table_out.insert(winners);
    let json = serde_json::to_value(&table_out).expect("json");
    assert_eq!(json["OceanPlasticCollection"]["1_None"]["winning_id"], 20);
    assert_eq!(
        json["OceanPlasticCollection"]["1_None"]["mean_values"][0]["difficulty_or_pattern_value"],
        serde_json::Value::Null
    );
    let _ = fs::remove_dir_all(root);
}
