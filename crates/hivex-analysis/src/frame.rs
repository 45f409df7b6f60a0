//! Columnar view of an observation table for grouped aggregation.

use hivex_core::ObservationTable;
use polars::prelude::*;

pub const TASK: &str = "task";
pub const AXIS: &str = "axis";
pub const ID: &str = "id";
pub const SOURCE: &str = "source";
pub const STEP: &str = "step";
pub const TAG: &str = "tag";
pub const VALUE: &str = "value";
pub const AGENT_COUNT: &str = "agent_count";

pub const MEAN: &str = "mean";
pub const STD: &str = "std";
pub const COUNT: &str = "count";

/// One row per observation. Non-finite samples are stored as nulls so every
/// mean and std skips them.
pub fn observation_frame(table: &ObservationTable) -> PolarsResult<DataFrame> {
    let rows = table.rows();
    DataFrame::new(vec![
        Series::new(TASK, rows.iter().map(|o| o.task()).collect::<Vec<u32>>()),
        Series::new(AXIS, rows.iter().map(|o| o.axis_value()).collect::<Vec<Option<u32>>>()),
        Series::new(ID, rows.iter().map(|o| o.run_id()).collect::<Vec<u32>>()),
        Series::new(SOURCE, rows.iter().map(|o| o.source.as_str()).collect::<Vec<&str>>()),
        Series::new(STEP, rows.iter().map(|o| o.step).collect::<Vec<i64>>()),
        Series::new(TAG, rows.iter().map(|o| o.tag.as_str()).collect::<Vec<&str>>()),
        Series::new(
            VALUE,
            rows.iter()
                .map(|o| Some(o.value).filter(|v| v.is_finite()))
                .collect::<Vec<Option<f64>>>(),
        ),
        Series::new(
            AGENT_COUNT,
            rows.iter().map(|o| o.run.agent_count).collect::<Vec<Option<u32>>>(),
        ),
    ])
}

/// Mean, sample std (ddof 1) and non-null count of `value`.
pub fn value_stats() -> [Expr; 3] {
    [
        col(VALUE).mean().alias(MEAN),
        col(VALUE).std(1).alias(STD),
        col(VALUE).count().cast(DataType::UInt32).alias(COUNT),
    ]
}

/// The std column is only meaningful with two or more samples.
pub(crate) fn sample_std(std: Option<f64>, count: u32) -> Option<f64> {
    std.filter(|s| count >= 2 && s.is_finite())
}
