use anyhow::{Context, Result};
use hivex_analysis::WinnerTable;
use hivex_core::atomic_write_json_pretty;
use std::fs;
use std::path::Path;

pub fn write_winners_json(path: &Path, table: &WinnerTable) -> Result<()> {
    atomic_write_json_pretty(path, table)
        .with_context(|| format!("writing winners to {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        datasets = table.datasets.len(),
        records = table.record_count(),
        "wrote winners"
    );
    Ok(())
}

pub fn read_winners_json(path: &Path) -> Result<WinnerTable> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading winners {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing winners {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivex_analysis::{DatasetWinners, MeanValue, RecordKey, WinnerRecord};
    use std::collections::BTreeMap;

    #[test]
    fn winners_json_is_stable_across_rewrites() {
        let dir = std::env::temp_dir().join(format!(
            "hivex_winners_test_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        ));
        let mut records = BTreeMap::new();
        for (task, axis) in [(1, Some(10)), (1, Some(2)), (0, Some(2))] {
            records.insert(
                RecordKey::new(task, axis),
                WinnerRecord {
                    winning_id: task + 1,
                    important_tags: vec!["Environment/Cumulative Reward".to_string()],
                    mean_values: vec![MeanValue {
                        difficulty_or_pattern_value: axis,
                        task,
                        id: task + 1,
                        tag: "Environment/Cumulative Reward".to_string(),
                        mean_value: 1.25,
                        std_value: Some(0.5),
                    }],
                },
            );
        }
        let mut table = WinnerTable::default();
        table.insert(DatasetWinners {
            dataset: "WildfireResourceManagement".to_string(),
            records,
            skipped: vec![],
        });

        let path = dir.join("best_models_per_task_difficulty_id.json");
        write_winners_json(&path, &table).expect("write");
        let first = fs::read_to_string(&path).expect("read");
        write_winners_json(&path, &read_winners_json(&path).expect("parse")).expect("rewrite");
        let second = fs::read_to_string(&path).expect("read");
        assert_eq!(first, second);
        let order: Vec<usize> = ["\"0_2\"", "\"1_2\"", "\"1_10\""]
            .iter()
            .map(|k| first.find(k).expect("key present"))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "keys out of order: {}", first);
        let _ = fs::remove_dir_all(dir);
    }
}
