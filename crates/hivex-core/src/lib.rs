//! Shared data model, run-name parsing, configuration and filesystem helpers
//! for the HIVEX results tooling.

pub mod config;
pub mod fsutil;
pub mod model;
pub mod naming;

pub use config::{AnalysisConfig, ChartConfig, DatasetConfig, ScalabilityPanel, SummaryTags};
pub use fsutil::{atomic_write_bytes, atomic_write_json_pretty, copy_dir_contents, ensure_dir};
pub use model::{
    axis_key_str, axis_value_str, AxisKind, AxisPoint, Criterion, Observation, ObservationTable,
    RunIdentity, Source,
};
pub use naming::{parse_run_name, RunNameError};
