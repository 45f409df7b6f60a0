//! Read-only aggregations feeding the chart renderers.

use crate::frame::{sample_std, value_stats, AGENT_COUNT, AXIS, COUNT, MEAN, SOURCE, STD, STEP, TAG, TASK, VALUE};
use hivex_core::{AxisPoint, ObservationTable, Source};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Normal quantile for the two-sided 95% band around per-step means.
const Z_95: f64 = 1.96;

/// Distinct tags of the table minus `excluded`, sorted.
pub fn chart_tags(table: &ObservationTable, excluded: &[String]) -> Vec<String> {
    table
        .tags()
        .into_iter()
        .filter(|t| !excluded.iter().any(|e| e == t))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CurveGroupKey {
    pub env_name: String,
    pub axis: Option<AxisPoint>,
    pub task: u32,
}

impl CurveGroupKey {
    fn predicate(&self) -> Expr {
        let axis = match self.axis {
            Some(point) => col(AXIS).eq(lit(point.value)),
            None => col(AXIS).is_null(),
        };
        col(TASK).eq(lit(self.task)).and(axis)
    }
}

/// `(env, axis, task)` groups present in the table, one training-curve sheet each.
pub fn curve_groups(table: &ObservationTable) -> BTreeSet<CurveGroupKey> {
    table
        .iter()
        .map(|obs| CurveGroupKey {
            env_name: obs.run.env_name.clone(),
            axis: obs.run.axis,
            task: obs.task(),
        })
        .collect()
}

/// Rows of `frame` belonging to one curve group.
pub fn curve_frame(frame: &DataFrame, key: &CurveGroupKey) -> PolarsResult<DataFrame> {
    frame.clone().lazy().filter(key.predicate()).collect()
}

/// Mean across runs at one step, with a 95% normal band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPoint {
    pub step: i64,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Per-step mean of `tag` for one source, ascending by step.
pub fn step_means(frame: &DataFrame, tag: &str, source: Source) -> PolarsResult<Vec<StepPoint>> {
    let stats = frame
        .clone()
        .lazy()
        .filter(col(TAG).eq(lit(tag)).and(col(SOURCE).eq(lit(source.as_str()))))
        .group_by([col(STEP)])
        .agg(value_stats())
        .sort([STEP], SortMultipleOptions::default())
        .collect()?;
    let steps = stats.column(STEP)?.i64()?;
    let means = stats.column(MEAN)?.f64()?;
    let stds = stats.column(STD)?.f64()?;
    let counts = stats.column(COUNT)?.u32()?;
    let mut points = Vec::with_capacity(stats.height());
    for i in 0..stats.height() {
        let (Some(step), Some(mean)) = (steps.get(i), means.get(i)) else {
            continue;
        };
        let count = counts.get(i).unwrap_or(0);
        let half = sample_std(stds.get(i), count)
            .map(|s| Z_95 * s / f64::from(count).sqrt())
            .unwrap_or(0.0);
        points.push(StepPoint {
            step,
            mean,
            lower: mean - half,
            upper: mean + half,
        });
    }
    Ok(points)
}

/// Keeps every `factor`-th point, always including the first.
pub fn downsample<T: Clone>(points: &[T], factor: usize) -> Vec<T> {
    if factor <= 1 {
        return points.to_vec();
    }
    points.iter().step_by(factor).cloned().collect()
}

/// Mean of one tag over a task × difficulty/pattern grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanMatrix {
    pub tag: String,
    pub tasks: Vec<u32>,
    pub axis_values: Vec<Option<u32>>,
    /// `cells[row][col]` for `tasks[row]` and `axis_values[col]`, rounded to 3 decimals.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl MeanMatrix {
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for v in self.cells.iter().flatten().flatten() {
            range = Some(match range {
                None => (*v, *v),
                Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
            });
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }
}

pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// `0.0` for zero, three decimals below one, one decimal otherwise.
pub fn format_cell(v: f64) -> String {
    if v == 0.0 {
        "0.0".to_string()
    } else if v < 1.0 {
        format!("{:.3}", v)
    } else {
        format!("{:.1}", v)
    }
}

/// The grid axes come from the whole frame so every tag shares one layout.
pub fn mean_matrix(frame: &DataFrame, tag: &str) -> PolarsResult<MeanMatrix> {
    let tasks: BTreeSet<u32> = frame.column(TASK)?.u32()?.into_iter().flatten().collect();
    let axis_values: BTreeSet<Option<u32>> = frame.column(AXIS)?.u32()?.into_iter().collect();

    let means = frame
        .clone()
        .lazy()
        .filter(col(TAG).eq(lit(tag)))
        .group_by([col(TASK), col(AXIS)])
        .agg([col(VALUE).mean().alias(MEAN)])
        .collect()?;
    let mut acc: BTreeMap<(u32, Option<u32>), f64> = BTreeMap::new();
    let (group_tasks, group_axes, group_means) = (
        means.column(TASK)?.u32()?,
        means.column(AXIS)?.u32()?,
        means.column(MEAN)?.f64()?,
    );
    for i in 0..means.height() {
        if let (Some(task), Some(mean)) = (group_tasks.get(i), group_means.get(i)) {
            acc.insert((task, group_axes.get(i)), mean);
        }
    }

    let cells = tasks
        .iter()
        .map(|task| {
            axis_values
                .iter()
                .map(|axis| acc.get(&(*task, *axis)).map(|m| round3(*m)))
                .collect()
        })
        .collect();
    Ok(MeanMatrix {
        tag: tag.to_string(),
        tasks: tasks.into_iter().collect(),
        axis_values: axis_values.into_iter().collect(),
        cells,
    })
}

/// Mean value of `tag` per agent count, ascending by agent count.
pub fn agent_count_means(frame: &DataFrame, tag: &str) -> PolarsResult<Vec<(u32, f64)>> {
    let means = frame
        .clone()
        .lazy()
        .filter(col(TAG).eq(lit(tag)).and(col(AGENT_COUNT).is_not_null()))
        .group_by([col(AGENT_COUNT)])
        .agg([col(VALUE).mean().alias(MEAN)])
        .sort([AGENT_COUNT], SortMultipleOptions::default())
        .collect()?;
    let counts = means.column(AGENT_COUNT)?.u32()?;
    let values = means.column(MEAN)?.f64()?;
    Ok((0..means.height())
        .filter_map(|i| counts.get(i).zip(values.get(i)))
        .collect())
}
