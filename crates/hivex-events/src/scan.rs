use crate::record::read_scalars;
use anyhow::Result;
use hivex_core::naming::is_scalability_run;
use hivex_core::{parse_run_name, Observation, ObservationTable, RunIdentity, Source};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub const AGENT_DIR_SUFFIX: &str = "Agent";
pub const EVENT_FILE_PREFIX: &str = "events.out.tfevents";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Runs without an `agent_count` segment.
    Baseline,
    /// Only `agent_count` runs.
    Scalability,
    All,
}

impl ScanMode {
    pub fn accepts(self, run_name: &str) -> bool {
        match self {
            ScanMode::Baseline => !is_scalability_run(run_name),
            ScanMode::Scalability => is_scalability_run(run_name),
            ScanMode::All => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub runs: usize,
    pub event_files: usize,
    pub skipped_runs: usize,
    pub failed_files: usize,
}

fn event_files(agent_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(agent_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(EVENT_FILE_PREFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    Ok(files)
}

/// Appends every readable event file of one `*Agent` directory. An unlistable
/// directory counts as one failed file.
fn read_agent_dir(
    agent_dir: &Path,
    identity: &Arc<RunIdentity>,
    source: Source,
    table: &mut ObservationTable,
    stats: &mut ScanStats,
) {
    let files = match event_files(agent_dir) {
        Ok(files) => files,
        Err(err) => {
            tracing::warn!(dir = %agent_dir.display(), error = %err, "skipping unreadable agent directory");
            stats.failed_files += 1;
            return;
        }
    };
    for file in files {
        match read_scalars(&file) {
            Ok(points) => {
                stats.event_files += 1;
                for p in points {
                    table.push(Observation {
                        run: Arc::clone(identity),
                        source,
                        step: p.step,
                        tag: p.tag,
                        value: f64::from(p.value),
                    });
                }
            }
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "skipping unreadable event file");
                stats.failed_files += 1;
            }
        }
    }
}

/// Reads every run below `root` into one table, labelling rows with `source`.
pub fn scan_split(root: &Path, source: Source, mode: ScanMode) -> Result<(ObservationTable, ScanStats)> {
    let mut table = ObservationTable::new();
    let mut stats = ScanStats::default();
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "results directory does not exist");
        return Ok((table, stats));
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_agent_dir = entry
            .file_name()
            .to_str()
            .map(|n| n.ends_with(AGENT_DIR_SUFFIX))
            .unwrap_or(false);
        if !is_agent_dir {
            continue;
        }
        let Some(run_name) = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        else {
            continue;
        };
        if !mode.accepts(run_name) {
            continue;
        }
        let identity = match parse_run_name(run_name) {
            Ok(id) => Arc::new(id),
            Err(err) => {
                tracing::warn!(error = %err, "skipping run directory");
                stats.skipped_runs += 1;
                continue;
            }
        };
        stats.runs += 1;
        tracing::debug!(
            run = run_name,
            axis = identity.axis_key(),
            task = identity.task,
            id = identity.run_id,
            "processing run"
        );

        read_agent_dir(entry.path(), &identity, source, &mut table, &mut stats);
    }
    tracing::info!(
        root = %root.display(),
        source = source.as_str(),
        runs = stats.runs,
        observations = table.len(),
        "scanned split"
    );
    Ok((table, stats))
}

/// Loads `<results_root>/<dataset>/<split>` for each requested source.
pub fn load_dataset(
    results_root: &Path,
    dataset: &str,
    sources: &[Source],
    mode: ScanMode,
) -> Result<ObservationTable> {
    let mut table = ObservationTable::new();
    for source in sources {
        let root = results_root.join(dataset).join(source.split_dir());
        let (part, _) = scan_split(&root, *source, mode)?;
        table.append(part);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{write_scalar_file, ScalarPoint};
    use chrono::Utc;

    fn scratch() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "hivex_scan_test_{}_{}",
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&dir).expect("scratch");
        dir
    }

    fn make_run(split: &Path, run_name: &str, values: &[(i64, &str, f32)]) {
        let agent = split.join(run_name).join("Agent");
        fs::create_dir_all(&agent).expect("agent dir");
        let points: Vec<ScalarPoint> = values
            .iter()
            .map(|(step, tag, value)| ScalarPoint {
                step: *step,
                tag: tag.to_string(),
                value: *value,
            })
            .collect();
        write_scalar_file(&agent.join("events.out.tfevents.1700000000.host"), &points)
            .expect("event file");
    }

    #[test]
    fn scan_split_labels_rows_with_identity_and_source() {
        let root = scratch();
        let split = root.join("WindFarmControl").join("test");
        make_run(
            &split,
            "WindFarmControl_pattern_2_task_1_run_id_4_test",
            &[(10, "Environment/Cumulative Reward", 1.5), (20, "Environment/Cumulative Reward", 2.5)],
        );
        make_run(
            &split,
            "WindFarmControl_pattern_2_task_1_run_id_5_agent_count_4_test",
            &[(10, "Environment/Cumulative Reward", 9.0)],
        );
        fs::create_dir_all(split.join("notes_without_task").join("Agent")).expect("bad run");

        let (table, stats) = scan_split(&split, Source::Test, ScanMode::Baseline).expect("scan");
        assert_eq!(table.len(), 2);
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.skipped_runs, 1);
        let row = &table.rows()[0];
        assert_eq!(row.run.env_name, "WindFarmControl");
        assert_eq!(row.axis_value(), Some(2));
        assert_eq!(row.task(), 1);
        assert_eq!(row.run_id(), 4);
        assert_eq!(row.source, Source::Test);
        assert_eq!(row.value, 1.5);

        let (scal, _) = scan_split(&split, Source::Test, ScanMode::Scalability).expect("scan");
        assert_eq!(scal.len(), 1);
        assert_eq!(scal.rows()[0].run.agent_count, Some(4));

        let (all, _) = scan_split(&split, Source::Test, ScanMode::All).expect("scan");
        assert_eq!(all.len(), 3);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn corrupt_event_file_is_skipped() {
        let root = scratch();
        let agent = root.join("Env_task_0_run_id_1").join("Agent");
        fs::create_dir_all(&agent).expect("agent");
        fs::write(agent.join("events.out.tfevents.bad"), vec![0xffu8; 64]).expect("write");
        let (table, stats) = scan_split(&root, Source::Training, ScanMode::All).expect("scan");
        assert!(table.is_empty());
        assert_eq!(stats.failed_files, 1);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unlistable_agent_dir_counts_as_failure_and_scan_continues() {
        let root = scratch();
        make_run(&root, "Env_task_0_run_id_2", &[(5, "R", 3.0)]);
        let identity = Arc::new(parse_run_name("Env_task_0_run_id_1").expect("name"));
        let mut table = ObservationTable::new();
        let mut stats = ScanStats::default();
        read_agent_dir(&root.join("gone").join("Agent"), &identity, Source::Test, &mut table, &mut stats);
        assert_eq!(stats.failed_files, 1);
        assert!(table.is_empty());

        let identity = Arc::new(parse_run_name("Env_task_0_run_id_2").expect("name"));
        read_agent_dir(&root.join("Env_task_0_run_id_2").join("Agent"), &identity, Source::Test, &mut table, &mut stats);
        assert_eq!((stats.failed_files, stats.event_files), (1, 1));
        assert_eq!(table.rows()[0].value, 3.0);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_split_yields_empty_table() {
        let root = scratch();
        let table = load_dataset(&root, "Nope", &[Source::Training, Source::Test], ScanMode::All)
            .expect("load");
        assert!(table.is_empty());
        let _ = fs::remove_dir_all(root);
    }
}
