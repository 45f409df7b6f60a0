use crate::model::Criterion;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_YAML: &str = include_str!("../config/default.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub version: Option<String>,
    pub results_root: PathBuf,
    #[serde(default = "default_output_json")]
    pub output_json: PathBuf,
    #[serde(default = "default_model_cards_dir")]
    pub model_cards_dir: PathBuf,
    #[serde(default)]
    pub tag_criteria: BTreeMap<String, Criterion>,
    pub datasets: Vec<DatasetConfig>,
    #[serde(default)]
    pub charts: ChartConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub tags_of_interest: Vec<String>,
    #[serde(default)]
    pub difficulty_or_pattern_filter: Option<Vec<u32>>,
    #[serde(default)]
    pub important_tags: BTreeMap<u32, Vec<String>>,
}

impl DatasetConfig {
    /// The axis filter, with an empty list treated the same as no list.
    pub fn axis_filter(&self) -> Option<&[u32]> {
        self.difficulty_or_pattern_filter
            .as_deref()
            .filter(|values| !values.is_empty())
    }

    pub fn important_tags_for(&self, task: u32) -> &[String] {
        self.important_tags
            .get(&task)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn split_dir(&self, results_root: &Path, split: &str) -> PathBuf {
        results_root.join(&self.name).join(split)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_downsample")]
    pub downsample: usize,
    #[serde(default)]
    pub excluded_curve_tags: Vec<String>,
    #[serde(default)]
    pub excluded_sheet_tags: Vec<String>,
    #[serde(default)]
    pub summary_tags: Vec<SummaryTags>,
    #[serde(default)]
    pub scalability: Vec<ScalabilityPanel>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            downsample: default_downsample(),
            excluded_curve_tags: Vec::new(),
            excluded_sheet_tags: Vec::new(),
            summary_tags: Vec::new(),
            scalability: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryTags {
    pub dataset: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalabilityPanel {
    pub dataset: String,
    pub title: String,
    pub tags: Vec<String>,
}

fn default_output_json() -> PathBuf {
    PathBuf::from("best_models_per_task_difficulty_id.json")
}

fn default_model_cards_dir() -> PathBuf {
    PathBuf::from("hf_yaml_files")
}

fn default_downsample() -> usize {
    1
}

impl AnalysisConfig {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_CONFIG_YAML).context("parsing built-in config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&data).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_yaml::from_str(data)?;
        for warning in config.validate()? {
            tracing::warn!("{}", warning);
        }
        Ok(config)
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetConfig> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Hard errors are returned as `Err`; soft problems come back as warnings.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        for dataset in &self.datasets {
            if !seen.insert(dataset.name.as_str()) {
                return Err(anyhow!("duplicate dataset name: {}", dataset.name));
            }
        }
        if self.charts.downsample == 0 {
            return Err(anyhow!("charts.downsample must be >= 1"));
        }

        let mut warnings = Vec::new();
        for dataset in &self.datasets {
            for (task, tags) in &dataset.important_tags {
                if tags.is_empty() {
                    warnings.push(format!(
                        "dataset {} task {} lists no important tags",
                        dataset.name, task
                    ));
                }
                for tag in tags {
                    if !self.tag_criteria.contains_key(tag) {
                        warnings.push(format!(
                            "dataset {} task {}: important tag '{}' has no criterion",
                            dataset.name, task, tag
                        ));
                    }
                    if !dataset.tags_of_interest.contains(tag) {
                        warnings.push(format!(
                            "dataset {} task {}: important tag '{}' is not a tag of interest",
                            dataset.name, task, tag
                        ));
                    }
                }
            }
        }
        for row in &self.charts.summary_tags {
            if self.dataset(&row.dataset).is_none() {
                warnings.push(format!("charts.summary_tags names unknown dataset {}", row.dataset));
            }
        }
        for panel in &self.charts.scalability {
            if self.dataset(&panel.dataset).is_none() {
                warnings.push(format!("charts.scalability names unknown dataset {}", panel.dataset));
            }
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_parses_and_is_clean() {
        let config = AnalysisConfig::builtin().expect("built-in config");
        assert_eq!(config.datasets.len(), 5);
        assert!(config.validate().expect("valid").is_empty());
        let opc = config.dataset("OceanPlasticCollection").expect("opc");
        assert_eq!(opc.axis_filter(), None);
        let wfc = config.dataset("WindFarmControl").expect("wfc");
        assert_eq!(wfc.axis_filter().map(<[u32]>::len), Some(9));
        assert_eq!(
            wfc.important_tags_for(1),
            &["WindFarmControl/Avoid Damage Reward".to_string()]
        );
        assert!(wfc.important_tags_for(7).is_empty());
        assert_eq!(
            config.tag_criteria.get("AerialWildfireSuppression/Crash Count"),
            Some(&Criterion::Min)
        );
        assert_eq!(config.charts.scalability.len(), 3);
    }

    #[test]
    fn empty_filter_means_no_filter() {
        let dataset = DatasetConfig {
            name: "X".to_string(),
            tags_of_interest: vec![],
            difficulty_or_pattern_filter: Some(vec![]),
            important_tags: BTreeMap::new(),
        };
        assert_eq!(dataset.axis_filter(), None);
    }

    #[test]
    fn unknown_criterion_is_rejected() {
        let yaml = "results_root: r\ntag_criteria: {A: biggest}\ndatasets: []\n";
        assert!(AnalysisConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn validate_reports_soft_problems_and_duplicates() {
        let yaml = r#"
results_root: r
tag_criteria: {A: max}
datasets:
  - name: X
    tags_of_interest: [A]
    important_tags:
      0: [B]
"#;
        let config: AnalysisConfig = serde_yaml::from_str(yaml).expect("parse");
        let warnings = config.validate().expect("no hard errors");
        assert_eq!(warnings.len(), 2, "warnings: {:?}", warnings);
        assert!(warnings.iter().any(|w| w.contains("no criterion")));

        let dup = "results_root: r\ndatasets:\n  - {name: X, tags_of_interest: []}\n  - {name: X, tags_of_interest: []}\n";
        let config: AnalysisConfig = serde_yaml::from_str(dup).expect("parse");
        let err = config.validate().expect_err("duplicate");
        assert!(err.to_string().contains("duplicate dataset name"));
    }
}
