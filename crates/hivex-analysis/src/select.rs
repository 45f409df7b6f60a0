//! Per-task winner selection.
//!
//! Rows are restricted to the dataset's tags of interest (and axis filter)
//! and reduced to one mean/std row per `(task, axis value, id, tag)`. Inside
//! each `(task, axis value)` group every important tag nominates the id whose
//! mean is the extremum for that tag's criterion. A record is emitted only
//! when every nomination names the same id.

use crate::frame::{observation_frame, sample_std, value_stats, AXIS, COUNT, ID, MEAN, STD, TAG, TASK};
use crate::records::{DatasetWinners, MeanValue, RecordKey, SkipReason, WinnerRecord};
use hivex_core::{Criterion, DatasetConfig, ObservationTable};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const WINNER: &str = "winner";

struct WinnersBuilder {
    dataset: String,
    records: BTreeMap<RecordKey, WinnerRecord>,
    skipped: Vec<SkipReason>,
}

impl WinnersBuilder {
    fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            records: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    fn skip(&mut self, reason: SkipReason) {
        tracing::warn!(dataset = %self.dataset, "{}", reason);
        self.skipped.push(reason);
    }

    fn finish(self) -> DatasetWinners {
        DatasetWinners {
            dataset: self.dataset,
            records: self.records,
            skipped: self.skipped,
        }
    }
}

/// Aggregate of one tag for one run inside one group.
#[derive(Debug, Clone, PartialEq)]
struct TagStats {
    key: RecordKey,
    id: u32,
    tag: String,
    mean: Option<f64>,
    std: Option<f64>,
}

/// Filters to the tags of interest and axis values, then aggregates per
/// `(task, axis, id, tag)`.
fn group_stats(table: &ObservationTable, interest: &[&str], filter: Option<&[u32]>) -> PolarsResult<DataFrame> {
    let mut predicate = col(TAG).is_in(lit(Series::new("interest", interest)));
    if let Some(values) = filter {
        predicate = predicate.and(col(AXIS).is_in(lit(Series::new("filter", values))));
    }
    observation_frame(table)?
        .lazy()
        .filter(predicate)
        .group_by([col(TASK), col(AXIS), col(ID), col(TAG)])
        .agg(value_stats())
        .collect()
}

fn collect_stats(stats: &DataFrame) -> PolarsResult<Vec<TagStats>> {
    let tasks = stats.column(TASK)?.u32()?;
    let axes = stats.column(AXIS)?.u32()?;
    let ids = stats.column(ID)?.u32()?;
    let tags = stats.column(TAG)?.str()?;
    let means = stats.column(MEAN)?.f64()?;
    let stds = stats.column(STD)?.f64()?;
    let counts = stats.column(COUNT)?.u32()?;
    let mut rows = Vec::with_capacity(stats.height());
    for i in 0..stats.height() {
        let (Some(task), Some(id), Some(tag)) = (tasks.get(i), ids.get(i), tags.get(i)) else {
            continue;
        };
        rows.push(TagStats {
            key: RecordKey::new(task, axes.get(i)),
            id,
            tag: tag.to_string(),
            mean: means.get(i).filter(|m| m.is_finite()),
            std: sample_std(stds.get(i), counts.get(i).unwrap_or(0)),
        });
    }
    rows.sort_by(|a, b| (a.key, a.id, &a.tag).cmp(&(b.key, b.id, &b.tag)));
    Ok(rows)
}

/// Id holding the extremum mean of `tag` in every group. Rows are ordered
/// by id first, so ties keep the lowest id; that is an accident of ordering
/// and not a contract.
fn extremum_ids(stats: &DataFrame, tag: &str, criterion: Criterion) -> PolarsResult<BTreeMap<RecordKey, u32>> {
    let pick = match criterion {
        Criterion::Max => col(MEAN).arg_max(),
        Criterion::Min => col(MEAN).arg_min(),
    };
    let winners = stats
        .clone()
        .lazy()
        .filter(col(TAG).eq(lit(tag)).and(col(MEAN).is_not_null()))
        .sort([ID], SortMultipleOptions::default())
        .group_by_stable([col(TASK), col(AXIS)])
        .agg([col(ID).get(pick).alias(WINNER)])
        .collect()?;
    let tasks = winners.column(TASK)?.u32()?;
    let axes = winners.column(AXIS)?.u32()?;
    let ids = winners.column(WINNER)?.u32()?;
    let mut out = BTreeMap::new();
    for i in 0..winners.height() {
        if let (Some(task), Some(id)) = (tasks.get(i), ids.get(i)) {
            out.insert(RecordKey::new(task, axes.get(i)), id);
        }
    }
    Ok(out)
}

fn winner_means(rows: &[TagStats], key: RecordKey, winning_id: u32) -> Vec<MeanValue> {
    rows.iter()
        .filter(|r| r.key == key && r.id == winning_id)
        .filter_map(|r| {
            r.mean.map(|mean_value| MeanValue {
                difficulty_or_pattern_value: key.axis_value,
                task: key.task,
                id: winning_id,
                tag: r.tag.clone(),
                mean_value,
                std_value: r.std,
            })
        })
        .collect()
}

struct GroupInputs<'a> {
    important: &'a [String],
    interest: &'a BTreeSet<&'a str>,
    criteria: &'a BTreeMap<String, Criterion>,
    candidates: &'a BTreeMap<&'a str, BTreeMap<RecordKey, u32>>,
}

fn select_group(builder: &mut WinnersBuilder, key: RecordKey, rows: &[TagStats], inputs: &GroupInputs<'_>) -> Option<WinnerRecord> {
    let mut winner: Option<(&str, u32)> = None;
    for tag in inputs.important {
        if !inputs.interest.contains(tag.as_str()) {
            builder.skip(SkipReason::TagNotOfInterest {
                key,
                tag: tag.clone(),
            });
            continue;
        }
        if !inputs.criteria.contains_key(tag) {
            builder.skip(SkipReason::NoCriterion {
                key,
                tag: tag.clone(),
            });
            continue;
        }
        let Some(candidate) = inputs
            .candidates
            .get(tag.as_str())
            .and_then(|by_key| by_key.get(&key))
            .copied()
        else {
            builder.skip(SkipReason::NoTagData {
                key,
                tag: tag.clone(),
            });
            continue;
        };
        match winner {
            None => winner = Some((tag.as_str(), candidate)),
            Some((first_tag, first_id)) if first_id != candidate => {
                builder.skip(SkipReason::InconsistentWinners {
                    key,
                    first: (first_tag.to_string(), first_id),
                    second: (tag.clone(), candidate),
                });
                return None;
            }
            Some(_) => {}
        }
    }

    let Some((_, winning_id)) = winner else {
        builder.skip(SkipReason::NoCandidate { key });
        return None;
    };
    Some(WinnerRecord {
        winning_id,
        important_tags: inputs.important.to_vec(),
        mean_values: winner_means(rows, key, winning_id),
    })
}

/// Runs winner selection for one dataset.
pub fn select_winners(
    table: &ObservationTable,
    dataset: &DatasetConfig,
    criteria: &BTreeMap<String, Criterion>,
) -> PolarsResult<DatasetWinners> {
    let mut builder = WinnersBuilder::new(&dataset.name);
    let filter = dataset.axis_filter();
    let interest: BTreeSet<&str> = dataset
        .tags_of_interest
        .iter()
        .map(String::as_str)
        .collect();
    let interest_list: Vec<&str> = interest.iter().copied().collect();

    let stats = group_stats(table, &interest_list, filter)?;
    let rows = collect_stats(&stats)?;
    if rows.is_empty() {
        builder.skip(SkipReason::EmptySelection {
            axis_filter: filter.map(<[u32]>::to_vec),
        });
        return Ok(builder.finish());
    }

    let mut groups: BTreeMap<u32, BTreeSet<Option<u32>>> = BTreeMap::new();
    for row in &rows {
        groups.entry(row.key.task).or_default().insert(row.key.axis_value);
    }

    let mut candidates: BTreeMap<&str, BTreeMap<RecordKey, u32>> = BTreeMap::new();
    for tag in groups.keys().flat_map(|task| dataset.important_tags_for(*task)) {
        if candidates.contains_key(tag.as_str()) || !interest.contains(tag.as_str()) {
            continue;
        }
        if let Some(criterion) = criteria.get(tag) {
            candidates.insert(tag.as_str(), extremum_ids(&stats, tag, *criterion)?);
        }
    }

    for (task, axis_values) in groups {
        let important = dataset.important_tags_for(task);
        if important.is_empty() {
            builder.skip(SkipReason::NoImportantTags { task });
            continue;
        }
        let inputs = GroupInputs {
            important,
            interest: &interest,
            criteria,
            candidates: &candidates,
        };
        for axis_value in axis_values {
            let key = RecordKey::new(task, axis_value);
            if let Some(record) = select_group(&mut builder, key, &rows, &inputs) {
                tracing::debug!(dataset = %dataset.name, %key, winning_id = record.winning_id, "selected winner");
                builder.records.insert(key, record);
            }
        }
    }
    Ok(builder.finish())
}
