use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// `(task, difficulty_or_pattern_value)` identifying one winner record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub task: u32,
    pub axis_value: Option<u32>,
}

impl RecordKey {
    pub fn new(task: u32, axis_value: Option<u32>) -> Self {
        Self { task, axis_value }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.axis_value {
            Some(v) => write!(f, "{}_{}", self.task, v),
            None => write!(f, "{}_None", self.task),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid record key '{0}': expected <task>_<value|None>")]
pub struct RecordKeyError(pub String);

impl FromStr for RecordKey {
    type Err = RecordKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RecordKeyError(s.to_string());
        let (task, value) = s.split_once('_').ok_or_else(err)?;
        let task = task.parse().map_err(|_| err())?;
        let axis_value = match value {
            "None" => None,
            v => Some(v.parse().map_err(|_| err())?),
        };
        Ok(RecordKey { task, axis_value })
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Mean and sample std of one tag over all steps of the winning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanValue {
    pub difficulty_or_pattern_value: Option<u32>,
    pub task: u32,
    pub id: u32,
    pub tag: String,
    pub mean_value: f64,
    pub std_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub winning_id: u32,
    pub important_tags: Vec<String>,
    pub mean_values: Vec<MeanValue>,
}

/// Why a unit of selection work produced no (or a partial) result.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    EmptySelection { axis_filter: Option<Vec<u32>> },
    NoImportantTags { task: u32 },
    TagNotOfInterest { key: RecordKey, tag: String },
    NoCriterion { key: RecordKey, tag: String },
    NoTagData { key: RecordKey, tag: String },
    InconsistentWinners {
        key: RecordKey,
        first: (String, u32),
        second: (String, u32),
    },
    NoCandidate { key: RecordKey },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptySelection { axis_filter } => {
                write!(f, "no data for tags of interest with axis filter {:?}", axis_filter)
            }
            SkipReason::NoImportantTags { task } => {
                write!(f, "no important tags configured for task {}", task)
            }
            SkipReason::TagNotOfInterest { key, tag } => {
                write!(f, "{}: important tag '{}' is not a tag of interest", key, tag)
            }
            SkipReason::NoCriterion { key, tag } => {
                write!(f, "{}: tag '{}' has no max/min criterion", key, tag)
            }
            SkipReason::NoTagData { key, tag } => write!(f, "{}: no data for tag '{}'", key, tag),
            SkipReason::InconsistentWinners { key, first, second } => write!(
                f,
                "{}: inconsistent winning ids ('{}' -> {}, '{}' -> {})",
                key, first.0, first.1, second.0, second.1
            ),
            SkipReason::NoCandidate { key } => write!(f, "{}: no consistent winning id", key),
        }
    }
}

/// Winner records of one dataset, plus everything that was skipped on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetWinners {
    pub dataset: String,
    pub records: BTreeMap<RecordKey, WinnerRecord>,
    pub skipped: Vec<SkipReason>,
}

/// `{ dataset: { "<task>_<value|None>": WinnerRecord } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinnerTable {
    pub datasets: BTreeMap<String, BTreeMap<RecordKey, WinnerRecord>>,
}

impl WinnerTable {
    pub fn insert(&mut self, winners: DatasetWinners) {
        self.datasets.insert(winners.dataset, winners.records);
    }

    pub fn dataset(&self, name: &str) -> Option<&BTreeMap<RecordKey, WinnerRecord>> {
        self.datasets.get(name)
    }

    pub fn record_count(&self) -> usize {
        self.datasets.values().map(BTreeMap::len).sum()
    }
}
