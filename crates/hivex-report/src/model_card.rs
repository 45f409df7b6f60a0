//! Hub model cards: YAML front matter plus a short description, one card
//! directory per winning `(task, difficulty/pattern)` record.

use crate::artifacts::copy_training_artifacts;
use anyhow::{Context, Result};
use hivex_analysis::{MeanValue, RecordKey, WinnerRecord, WinnerTable};
use hivex_core::{atomic_write_bytes, AxisKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub dataset: &'static str,
    pub display_name: &'static str,
    pub abbreviation: &'static str,
    pub slug: &'static str,
    pub axis: Option<AxisKind>,
    pub task_names: &'static [&'static str],
    pub episode_length: u32,
    pub train_max_steps: u64,
    pub test_max_steps: u64,
    /// Drop metrics whose mean and std are both exactly zero.
    pub omit_zero_metrics: bool,
}

pub const PROFILES: &[EnvironmentProfile] = &[
    EnvironmentProfile {
        dataset: "WindFarmControl",
        display_name: "Wind Farm Control",
        abbreviation: "WFC",
        slug: "wind-farm-control",
        axis: Some(AxisKind::Pattern),
        task_names: &["main_task", "avoid_damage"],
        episode_length: 5000,
        train_max_steps: 8_000_000,
        test_max_steps: 8_000_000,
        omit_zero_metrics: false,
    },
    EnvironmentProfile {
        dataset: "WildfireResourceManagement",
        display_name: "Wildfire Resource Management",
        abbreviation: "WRM",
        slug: "wildfire-resource-management",
        axis: Some(AxisKind::Difficulty),
        task_names: &["main_task", "keep_all", "distribute_all"],
        episode_length: 500,
        train_max_steps: 450_000,
        test_max_steps: 45_000,
        omit_zero_metrics: false,
    },
    EnvironmentProfile {
        dataset: "DroneBasedReforestation",
        display_name: "Drone-Based Reforestation",
        abbreviation: "DBR",
        slug: "drone-based-reforestation",
        axis: Some(AxisKind::Difficulty),
        task_names: &[
            "main_task",
            "find_closest_forest_perimeter",
            "pick_up_seed_at_base",
            "drop_seed",
            "find_highest_potential_seed_drop_location",
            "find_highest_potential_seed_drop_location",
            "explore_furthest_distance_and_return_to_base",
        ],
        episode_length: 2000,
        train_max_steps: 1_200_000,
        test_max_steps: 300_000,
        omit_zero_metrics: true,
    },
    EnvironmentProfile {
        dataset: "OceanPlasticCollection",
        display_name: "Ocean Plastic Collection",
        abbreviation: "OPC",
        slug: "ocean-plastic-collection",
        axis: None,
        task_names: &[
            "main_task",
            "find_highest_polluted_area",
            "group_up",
            "avoid_plastic",
        ],
        episode_length: 5000,
        train_max_steps: 3_000_000,
        test_max_steps: 150_000,
        omit_zero_metrics: false,
    },
    EnvironmentProfile {
        dataset: "AerialWildfireSuppression",
        display_name: "Aerial Wildfire Suppression",
        abbreviation: "AWS",
        slug: "aerial-wildfire-suppression",
        axis: Some(AxisKind::Difficulty),
        task_names: &[
            "main_task",
            "maximize_extinguished_burning_trees",
            "maximize_preparing_non_burning_trees",
            "minimize_time_fire_burning",
            "protect_village",
            "pick_up_water",
            "drop_water",
            "find_fire",
            "find_village",
        ],
        episode_length: 3000,
        train_max_steps: 1_800_000,
        test_max_steps: 180_000,
        omit_zero_metrics: true,
    },
];

pub fn profile(dataset: &str) -> Option<&'static EnvironmentProfile> {
    PROFILES.iter().find(|p| p.dataset == dataset)
}

impl EnvironmentProfile {
    pub fn task_name(&self, task: u32) -> &'static str {
        self.task_names
            .get(task as usize)
            .copied()
            .unwrap_or("unknown_task")
    }

    /// Axis kind and value when both the environment and the record carry one.
    fn axis_point(&self, key: RecordKey) -> Option<(AxisKind, u32)> {
        self.axis.zip(key.axis_value)
    }

    pub fn model_name(&self, key: RecordKey) -> String {
        let mut name = format!("hivex-{}-PPO-baseline-task-{}", self.abbreviation, key.task);
        if let Some((kind, value)) = self.axis_point(key) {
            name.push_str(&format!("-{}-{}", kind.as_str(), value));
        }
        name
    }

    pub fn original_train_name(&self, key: RecordKey, winning_id: u32) -> String {
        let axis = self
            .axis_point(key)
            .map(|(kind, value)| format!("_{}_{}", kind.as_str(), value))
            .unwrap_or_default();
        format!(
            "{}{}_task_{}_run_id_{}_train",
            self.dataset, axis, key.task, winning_id
        )
    }

    pub fn hub_tag(&self) -> String {
        format!("hivex-{}", self.slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontMatter {
    pub library_name: String,
    pub original_train_name: String,
    pub tags: Vec<String>,
    #[serde(rename = "model-index")]
    pub model_index: Vec<ModelIndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelIndexEntry {
    pub name: String,
    pub results: Vec<ModelResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    pub task: TaskEntry,
    pub dataset: DatasetEntry,
    pub metrics: Vec<MetricEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "task-id")]
    pub task_id: u32,
    #[serde(rename = "pattern-id", skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<u32>,
    #[serde(rename = "difficulty-id", skip_serializing_if = "Option::is_none")]
    pub difficulty_id: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub name: String,
    pub verified: bool,
}

fn last_segment(tag: &str) -> &str {
    tag.rsplit('/').next().unwrap_or(tag)
}

pub fn metric_entry(mean: &MeanValue) -> MetricEntry {
    let name = last_segment(&mean.tag);
    let std = mean
        .std_value
        .map(|s| format!("{:?}", s))
        .unwrap_or_else(|| "nan".to_string());
    MetricEntry {
        kind: name.to_lowercase().replace([' ', '/'], "_"),
        value: format!("{:?} +/- {}", mean.mean_value, std),
        name: name.to_string(),
        verified: true,
    }
}

fn is_all_zero(mean: &MeanValue) -> bool {
    mean.mean_value == 0.0 && mean.std_value == Some(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCard {
    pub directory_name: String,
    pub front_matter: FrontMatter,
    pub description: String,
}

impl ModelCard {
    pub fn original_train_name(&self) -> &str {
        &self.front_matter.original_train_name
    }

    pub fn render(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.front_matter)?;
        Ok(format!("---\n{}---\n\n{}", yaml, self.description))
    }
}

fn description(profile: &EnvironmentProfile, key: RecordKey) -> String {
    let axis = profile.axis_point(key);
    let mut out = format!(
        "This model serves as the baseline for the **{}** environment, trained and tested on task <code>{}</code>",
        profile.display_name, key.task
    );
    if let Some((kind, value)) = axis {
        out.push_str(&format!(" with {} <code>{}</code>", kind.as_str(), value));
    }
    out.push_str(" using the Proximal Policy Optimization (PPO) algorithm.<br><br>\n\n");
    out.push_str(&format!("Environment: **{}**<br>\n", profile.display_name));
    out.push_str(&format!("Task: <code>{}</code><br>\n", key.task));
    if let Some((kind, value)) = axis {
        let label = match kind {
            AxisKind::Pattern => "Pattern",
            AxisKind::Difficulty => "Difficulty",
        };
        out.push_str(&format!("{}: <code>{}</code><br>\n", label, value));
    }
    out.push_str("Algorithm: <code>PPO</code><br>\n");
    out.push_str(&format!(
        "Episode Length: <code>{}</code><br>\n",
        profile.episode_length
    ));
    out.push_str(&format!(
        "Training <code>max_steps</code>: <code>{}</code><br>\n",
        profile.train_max_steps
    ));
    out.push_str(&format!(
        "Testing <code>max_steps</code>: <code>{}</code><br><br>\n\n",
        profile.test_max_steps
    ));
    out.push_str("Train & Test [Scripts](https://github.com/hivex-research/hivex)<br>\n");
    out.push_str("Download the [Environment](https://github.com/hivex-research/hivex-environments)\n");
    out
}

pub fn build_model_card(
    profile: &EnvironmentProfile,
    key: RecordKey,
    record: &WinnerRecord,
) -> ModelCard {
    let axis = profile.axis_point(key);
    let metrics = record
        .mean_values
        .iter()
        .filter(|m| !(profile.omit_zero_metrics && is_all_zero(m)))
        .map(metric_entry)
        .collect();
    let name = profile.model_name(key);
    let front_matter = FrontMatter {
        library_name: "hivex".to_string(),
        original_train_name: profile.original_train_name(key, record.winning_id),
        tags: vec![
            "hivex".to_string(),
            profile.hub_tag(),
            "reinforcement-learning".to_string(),
            "multi-agent-reinforcement-learning".to_string(),
        ],
        model_index: vec![ModelIndexEntry {
            name: name.clone(),
            results: vec![ModelResult {
                task: TaskEntry {
                    kind: if key.task == 0 { "main-task" } else { "sub-task" }.to_string(),
                    name: profile.task_name(key.task).to_string(),
                    task_id: key.task,
                    pattern_id: axis
                        .filter(|(k, _)| *k == AxisKind::Pattern)
                        .map(|(_, v)| v),
                    difficulty_id: axis
                        .filter(|(k, _)| *k == AxisKind::Difficulty)
                        .map(|(_, v)| v),
                },
                dataset: DatasetEntry {
                    name: profile.hub_tag(),
                    kind: profile.hub_tag(),
                },
                metrics,
            }],
        }],
    };
    ModelCard {
        directory_name: name,
        front_matter,
        description: description(profile, key),
    }
}

/// Writes `<out_root>/<card dir>/README.md` and returns the card directory.
pub fn write_model_card(out_root: &Path, card: &ModelCard) -> Result<PathBuf> {
    let dir = out_root.join(&card.directory_name);
    let path = dir.join("README.md");
    atomic_write_bytes(&path, card.render()?.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCard {
    pub dataset: String,
    pub key: RecordKey,
    pub directory: PathBuf,
    /// Files copied from the training run, `None` when the run was not found.
    pub artifacts_copied: Option<u64>,
}

pub struct CardOptions<'a> {
    pub results_root: &'a Path,
    pub out_root: &'a Path,
    /// Restrict to these datasets; empty means all.
    pub datasets: &'a [String],
    pub copy_artifacts: bool,
}

pub fn generate_model_cards(table: &WinnerTable, opts: &CardOptions<'_>) -> Result<Vec<GeneratedCard>> {
    let mut generated = Vec::new();
    for (dataset, records) in &table.datasets {
        if !opts.datasets.is_empty() && !opts.datasets.contains(dataset) {
            continue;
        }
        let Some(profile) = profile(dataset) else {
            tracing::warn!(dataset = %dataset, "no model card profile for dataset, skipping");
            continue;
        };
        for (key, record) in records {
            let card = build_model_card(profile, *key, record);
            let directory = write_model_card(opts.out_root, &card)?;
            let artifacts_copied = if opts.copy_artifacts {
                copy_training_artifacts(
                    opts.results_root,
                    dataset,
                    card.original_train_name(),
                    &directory,
                )?
            } else {
                None
            };
            tracing::info!(dataset = %dataset, %key, dir = %directory.display(), "wrote model card");
            generated.push(GeneratedCard {
                dataset: dataset.clone(),
                key: *key,
                directory,
                artifacts_copied,
            });
        }
    }
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivex_analysis::DatasetWinners;
    use hivex_core::ensure_dir;
    use std::fs;
    use std::collections::BTreeMap;

    fn mean(tag: &str, mean_value: f64, std_value: Option<f64>) -> MeanValue {
        MeanValue {
            difficulty_or_pattern_value: Some(3),
            task: 2,
            id: 5,
            tag: tag.to_string(),
            mean_value,
            std_value,
        }
    }

    fn record(values: Vec<MeanValue>) -> WinnerRecord {
        WinnerRecord {
            winning_id: 5,
            important_tags: vec!["AerialWildfireSuppression/Preparing Trees Reward".to_string()],
            mean_values: values,
        }
    }

    #[test]
    fn names_follow_environment_conventions() {
        let wfc = profile("WindFarmControl").expect("wfc");
        let key = RecordKey::new(1, Some(4));
        assert_eq!(wfc.model_name(key), "hivex-WFC-PPO-baseline-task-1-pattern-4");
        assert_eq!(
            wfc.original_train_name(key, 9),
            "WindFarmControl_pattern_4_task_1_run_id_9_train"
        );
        let opc = profile("OceanPlasticCollection").expect("opc");
        let key = RecordKey::new(2, None);
        assert_eq!(opc.model_name(key), "hivex-OPC-PPO-baseline-task-2");
        assert_eq!(
            opc.original_train_name(key, 0),
            "OceanPlasticCollection_task_2_run_id_0_train"
        );
        assert_eq!(opc.task_name(3), "avoid_plastic");
        assert_eq!(opc.task_name(42), "unknown_task");
    }

    #[test]
    fn metric_entries_use_last_tag_segment() {
        let entry = metric_entry(&mean("Environment/Cumulative Reward", 7.25, Some(0.5)));
        assert_eq!(entry.kind, "cumulative_reward");
        assert_eq!(entry.name, "Cumulative Reward");
        assert_eq!(entry.value, "7.25 +/- 0.5");
        let entry = metric_entry(&mean("Environment/Cumulative Reward", 3.0, None));
        assert_eq!(entry.value, "3.0 +/- nan");
    }

    #[test]
    fn card_front_matter_renders_in_declared_order() {
        let aws = profile("AerialWildfireSuppression").expect("aws");
        let card = build_model_card(
            aws,
            RecordKey::new(2, Some(3)),
            &record(vec![
                mean("AerialWildfireSuppression/Crash Count", 0.0, Some(0.0)),
                mean("AerialWildfireSuppression/Preparing Trees Reward", 12.5, Some(1.5)),
            ]),
        );
        let text = card.render().expect("render");
        assert!(text.starts_with("---\nlibrary_name: hivex\n"), "{}", text);
        let positions: Vec<usize> = ["library_name:", "original_train_name:", "tags:", "model-index:"]
            .iter()
            .map(|k| text.find(k).expect("key"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("original_train_name: AerialWildfireSuppression_difficulty_3_task_2_run_id_5_train"));
        assert!(text.contains("difficulty-id: 3"));
        assert!(!text.contains("pattern-id"));
        assert!(text.contains("name: maximize_preparing_non_burning_trees"));
        assert!(text.contains("type: sub-task"));
        assert!(!text.contains("crash_count"), "all-zero metric must be dropped");
        assert!(text.contains("type: preparing_trees_reward"));
        assert!(text.contains("Difficulty: <code>3</code>"));
        assert!(text.contains("Episode Length: <code>3000</code>"));

        let value: serde_yaml::Value = serde_yaml::from_str(
            text.trim_start_matches("---\n")
                .split("---\n")
                .next()
                .expect("front matter"),
        )
        .expect("front matter is valid yaml");
        assert_eq!(
            value["model-index"][0]["results"][0]["metrics"][0]["value"],
            serde_yaml::Value::String("12.5 +/- 1.5".to_string())
        );
    }

    #[test]
    fn zero_metrics_kept_where_profile_says_so() {
        let wrm = profile("WildfireResourceManagement").expect("wrm");
        let card = build_model_card(
            wrm,
            RecordKey::new(0, Some(3)),
            &record(vec![mean("WildfireResourceManagement/Individual Performance", 0.0, Some(0.0))]),
        );
        assert_eq!(card.front_matter.model_index[0].results[0].metrics.len(), 1);
        assert_eq!(card.front_matter.model_index[0].results[0].task.kind, "main-task");
    }

    #[test]
    fn generate_writes_cards_and_tolerates_missing_artifacts() {
        let root = std::env::temp_dir().join(format!(
            "hivex_cards_test_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        ));
        let results_root = root.join("results");
        let train_dir = results_root
            .join("WindFarmControl")
            .join("train")
            .join("WindFarmControl_pattern_3_task_2_run_id_5_train");
        ensure_dir(&train_dir.join("Agent")).expect("train dir");
        fs::write(train_dir.join("Agent").join("Agent.onnx"), b"onnx").expect("artifact");

        let mut table = WinnerTable::default();
        let mut wfc = BTreeMap::new();
        wfc.insert(
            RecordKey::new(2, Some(3)),
            record(vec![mean("WindFarmControl/Individual Performance", 1.0, Some(0.1))]),
        );
        table.insert(DatasetWinners {
            dataset: "WindFarmControl".to_string(),
            records: wfc,
            skipped: vec![],
        });
        let mut wrm = BTreeMap::new();
        wrm.insert(RecordKey::new(1, Some(3)), record(vec![]));
        table.insert(DatasetWinners {
            dataset: "WildfireResourceManagement".to_string(),
            records: wrm,
            skipped: vec![],
        });

        let out_root = root.join("hf_yaml_files");
        let cards = generate_model_cards(
            &table,
            &CardOptions {
                results_root: &results_root,
                out_root: &out_root,
                datasets: &[],
                copy_artifacts: true,
            },
        )
        .expect("generate");
        assert_eq!(cards.len(), 2);
        let wfc_card = cards
            .iter()
            .find(|c| c.dataset == "WindFarmControl")
            .expect("wfc card");
        assert_eq!(wfc_card.artifacts_copied, Some(1));
        assert!(wfc_card.directory.join("README.md").is_file());
        assert!(wfc_card.directory.join("Agent").join("Agent.onnx").is_file());
        let wrm_card = cards
            .iter()
            .find(|c| c.dataset == "WildfireResourceManagement")
            .expect("wrm card");
        assert_eq!(wrm_card.artifacts_copied, None);
        assert!(out_root
            .join("hivex-WRM-PPO-baseline-task-1-difficulty-3")
            .join("README.md")
            .is_file());

        let only = generate_model_cards(
            &table,
            &CardOptions {
                results_root: &results_root,
                out_root: &out_root,
                datasets: &["WildfireResourceManagement".to_string()],
                copy_artifacts: false,
            },
        )
        .expect("generate subset");
        assert_eq!(only.len(), 1);
        let _ = fs::remove_dir_all(root);
    }
}
