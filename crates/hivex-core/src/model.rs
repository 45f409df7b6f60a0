use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Pattern,
    Difficulty,
}

impl AxisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AxisKind::Pattern => "pattern",
            AxisKind::Difficulty => "difficulty",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pattern" => Some(AxisKind::Pattern),
            "difficulty" => Some(AxisKind::Difficulty),
            _ => None,
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a run on its environment's difficulty or pattern axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxisPoint {
    pub kind: AxisKind,
    pub value: u32,
}

/// Identity of one run, derived from its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentity {
    pub env_name: String,
    pub axis: Option<AxisPoint>,
    pub task: u32,
    pub run_id: u32,
    pub agent_count: Option<u32>,
}

impl RunIdentity {
    pub fn axis_value(&self) -> Option<u32> {
        self.axis.map(|a| a.value)
    }

    /// `"pattern"`, `"difficulty"` or the literal `"None"`.
    pub fn axis_key(&self) -> &'static str {
        axis_key_str(self.axis.map(|a| a.kind))
    }
}

pub fn axis_key_str(kind: Option<AxisKind>) -> &'static str {
    kind.map(AxisKind::as_str).unwrap_or("None")
}

pub fn axis_value_str(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Training,
    Test,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Training => "training",
            Source::Test => "test",
        }
    }

    /// Directory name of the split holding runs of this source.
    pub fn split_dir(self) -> &'static str {
        match self {
            Source::Training => "train",
            Source::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub run: Arc<RunIdentity>,
    pub source: Source,
    pub step: i64,
    pub tag: String,
    pub value: f64,
}

impl Observation {
    pub fn task(&self) -> u32 {
        self.run.task
    }

    pub fn run_id(&self) -> u32 {
        self.run.run_id
    }

    pub fn axis_value(&self) -> Option<u32> {
        self.run.axis_value()
    }
}

/// Flat, append-only table of scalar observations for one dataset.
#[derive(Debug, Clone, Default)]
pub struct ObservationTable {
    rows: Vec<Observation>,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observation: Observation) {
        self.rows.push(observation);
    }

    pub fn append(&mut self, other: ObservationTable) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    pub fn tags(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|o| o.tag.as_str()).collect()
    }

    pub fn tasks(&self) -> BTreeSet<u32> {
        self.rows.iter().map(Observation::task).collect()
    }

    pub fn axis_values(&self) -> BTreeSet<Option<u32>> {
        self.rows.iter().map(Observation::axis_value).collect()
    }

    /// First environment name seen in the table.
    pub fn env_name(&self) -> Option<&str> {
        self.rows.first().map(|o| o.run.env_name.as_str())
    }

    /// Axis kind of the first run carrying one, if any.
    pub fn axis_kind(&self) -> Option<AxisKind> {
        self.rows.iter().find_map(|o| o.run.axis.map(|a| a.kind))
    }
}

impl FromIterator<Observation> for ObservationTable {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ObservationTable {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(task: u32, axis: Option<u32>, tag: &str) -> Observation {
        Observation {
            run: Arc::new(RunIdentity {
                env_name: "WindFarmControl".to_string(),
                axis: axis.map(|value| AxisPoint {
                    kind: AxisKind::Pattern,
                    value,
                }),
                task,
                run_id: 1,
                agent_count: None,
            }),
            source: Source::Test,
            step: 0,
            tag: tag.to_string(),
            value: 1.0,
        }
    }

    #[test]
    fn table_reports_distinct_dimensions() {
        let table: ObservationTable = vec![
            obs(1, Some(3), "b"),
            obs(0, None, "a"),
            obs(1, Some(3), "a"),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 3);
        assert_eq!(table.tags().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(table.tasks().into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(
            table.axis_values().into_iter().collect::<Vec<_>>(),
            vec![None, Some(3)]
        );
        assert_eq!(table.axis_kind(), Some(AxisKind::Pattern));
        assert_eq!(table.env_name(), Some("WindFarmControl"));
    }

    #[test]
    fn axis_key_renders_none_literal() {
        let o = obs(0, None, "a");
        assert_eq!(o.run.axis_key(), "None");
        assert_eq!(axis_value_str(o.axis_value()), "None");
        let o = obs(0, Some(4), "a");
        assert_eq!(o.run.axis_key(), "pattern");
        assert_eq!(axis_value_str(o.axis_value()), "4");
    }
}
