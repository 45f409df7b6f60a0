use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hivex_analysis::{select_winners, DatasetWinners, WinnerTable};
use hivex_core::config::DEFAULT_CONFIG_YAML;
use hivex_core::{AnalysisConfig, ObservationTable, Source};
use hivex_events::{load_dataset, ScanMode};
use hivex_report::charts::{
    render_average_sheet, render_scalability, render_summary_sheet, render_training_curves,
    ScalabilityData, SummaryRow,
};
use hivex_report::{generate_model_cards, read_winners_json, write_winners_json, CardOptions};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hivex", version = "0.3.0", about = "HIVEX results tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in configuration to a file.
    Init {
        #[arg(long, default_value = "hivex.yaml")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Select the winning run per task and difficulty/pattern.
    FindBest {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        results_root: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Generate hub model cards from a winners file.
    ModelCards {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        results_root: Option<PathBuf>,
        #[arg(long)]
        winners: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long = "dataset")]
        datasets: Vec<String>,
        #[arg(long)]
        no_copy: bool,
        #[arg(long)]
        json: bool,
    },
    /// Training curves, average sheets and the cross-environment summary.
    PlotBaseline {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        results_root: Option<PathBuf>,
        #[arg(long, default_value = "plots")]
        out: PathBuf,
        #[arg(long)]
        downsample: Option<usize>,
    },
    /// Mean metric value by agent count.
    PlotScalability {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        results_root: Option<PathBuf>,
        #[arg(long, default_value = "plots")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let json_mode = command_json_mode(&cli.command);
    let result = run_command(cli.command);
    match result {
        Ok(Some(payload)) => {
            println!("{}", payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) if json_mode => {
            println!("{}", failure_payload(&err));
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(command: Commands) -> Result<Option<Value>> {
    match command {
        Commands::Init { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            hivex_core::atomic_write_bytes(&path, DEFAULT_CONFIG_YAML.as_bytes())?;
            println!("wrote {}", path.display());
        }
        Commands::FindBest {
            config,
            results_root,
            out,
            json,
        } => {
            let config = load_config(config.as_deref(), results_root)?;
            let out = out.unwrap_or_else(|| config.output_json.clone());
            let mut table = WinnerTable::default();
            let mut per_dataset = Vec::new();
            for dataset in &config.datasets {
                let observations = load_dataset(
                    &config.results_root,
                    &dataset.name,
                    &[Source::Test],
                    ScanMode::Baseline,
                )?;
                let winners = select_winners(&observations, dataset, &config.tag_criteria)?;
                per_dataset.push(winners_summary(&winners, observations.len()));
                table.insert(winners);
            }
            write_winners_json(&out, &table)?;
            if json {
                return Ok(Some(json!({
                    "ok": true,
                    "command": "find-best",
                    "output": out.display().to_string(),
                    "records": table.record_count(),
                    "datasets": per_dataset
                })));
            }
            for entry in &per_dataset {
                println!(
                    "{}: observations={} records={} skipped={}",
                    entry["dataset"].as_str().unwrap_or_default(),
                    entry["observations"],
                    entry["records"],
                    entry["skipped"].as_array().map(Vec::len).unwrap_or(0)
                );
            }
            println!("output: {}", out.display());
        }
        Commands::ModelCards {
            config,
            results_root,
            winners,
            out,
            datasets,
            no_copy,
            json,
        } => {
            let config = load_config(config.as_deref(), results_root)?;
            let winners_path = winners.unwrap_or_else(|| config.output_json.clone());
            let out_root = out.unwrap_or_else(|| config.model_cards_dir.clone());
            let table = read_winners_json(&winners_path)?;
            let cards = generate_model_cards(
                &table,
                &CardOptions {
                    results_root: &config.results_root,
                    out_root: &out_root,
                    datasets: &datasets,
                    copy_artifacts: !no_copy,
                },
            )?;
            if json {
                let entries: Vec<Value> = cards
                    .iter()
                    .map(|c| {
                        json!({
                            "dataset": c.dataset,
                            "key": c.key.to_string(),
                            "dir": c.directory.display().to_string(),
                            "artifacts_copied": c.artifacts_copied
                        })
                    })
                    .collect();
                return Ok(Some(json!({
                    "ok": true,
                    "command": "model-cards",
                    "winners": winners_path.display().to_string(),
                    "out": out_root.display().to_string(),
                    "cards": entries
                })));
            }
            for card in &cards {
                println!("{}", card.directory.display());
            }
            println!("cards: {}", cards.len());
        }
        Commands::PlotBaseline {
            config,
            results_root,
            out,
            downsample,
        } => {
            let config = load_config(config.as_deref(), results_root)?;
            let factor = downsample.unwrap_or(config.charts.downsample);
            if factor == 0 {
                bail!("--downsample must be >= 1");
            }
            print_written(&plot_baseline(&config, &out, factor)?);
        }
        Commands::PlotScalability {
            config,
            results_root,
            out,
        } => {
            let config = load_config(config.as_deref(), results_root)?;
            let mut tables: BTreeMap<&str, ObservationTable> = BTreeMap::new();
            for panel in &config.charts.scalability {
                if !tables.contains_key(panel.dataset.as_str()) {
                    let table = load_dataset(
                        &config.results_root,
                        &panel.dataset,
                        &[Source::Test],
                        ScanMode::Scalability,
                    )?;
                    tables.insert(&panel.dataset, table);
                }
            }
            let panels: Vec<ScalabilityData<'_>> = config
                .charts
                .scalability
                .iter()
                .filter_map(|panel| {
                    tables
                        .get(panel.dataset.as_str())
                        .map(|table| ScalabilityData { panel, table })
                })
                .collect();
            let written: Vec<PathBuf> = render_scalability(&panels, &out)?.into_iter().collect();
            print_written(&written);
        }
    }
    Ok(None)
}

fn load_config(path: Option<&Path>, results_root: Option<PathBuf>) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => AnalysisConfig::load(p)?,
        None => AnalysisConfig::builtin()?,
    };
    if let Some(root) = results_root {
        config.results_root = root;
    }
    Ok(config)
}

fn load_tables(
    config: &AnalysisConfig,
    sources: &[Source],
    mode: ScanMode,
) -> Result<BTreeMap<String, ObservationTable>> {
    let mut tables = BTreeMap::new();
    for dataset in &config.datasets {
        let table = load_dataset(&config.results_root, &dataset.name, sources, mode)?;
        if table.is_empty() {
            tracing::warn!(dataset = %dataset.name, "no observations, skipping charts");
            continue;
        }
        tables.insert(dataset.name.clone(), table);
    }
    Ok(tables)
}

/// Training curves read both splits; the average and summary sheets only
/// the test split.
fn plot_baseline(config: &AnalysisConfig, out: &Path, factor: usize) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let curves = load_tables(config, &[Source::Training, Source::Test], ScanMode::Baseline)?;
    for table in curves.values() {
        written.extend(render_training_curves(
            table,
            &config.charts.excluded_curve_tags,
            out,
            factor,
        )?);
    }

    let sheets = load_tables(config, &[Source::Test], ScanMode::Baseline)?;
    for table in sheets.values() {
        written.extend(render_average_sheet(table, &config.charts.excluded_sheet_tags, out)?);
    }
    let rows: Vec<SummaryRow<'_>> = config
        .charts
        .summary_tags
        .iter()
        .filter_map(|entry| {
            sheets.get(&entry.dataset).map(|table| SummaryRow {
                env_name: &entry.dataset,
                table,
                tags: &entry.tags,
            })
        })
        .collect();
    written.extend(render_summary_sheet(&rows, out)?);
    Ok(written)
}

fn winners_summary(winners: &DatasetWinners, observations: usize) -> Value {
    json!({
        "dataset": winners.dataset,
        "observations": observations,
        "records": winners.records.len(),
        "skipped": winners.skipped.iter().map(ToString::to_string).collect::<Vec<_>>()
    })
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
    println!("charts: {}", paths.len());
}

/// `--json` failure envelope; `causes` lists the context chain below the top message.
fn failure_payload(err: &anyhow::Error) -> Value {
    let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    json!({
        "ok": false,
        "error": {
            "code": "command_failed",
            "message": err.to_string(),
            "causes": causes
        }
    })
}

fn command_json_mode(command: &Commands) -> bool {
    match command {
        Commands::FindBest { json, .. } | Commands::ModelCards { json, .. } => *json,
        _ => false,
    }
}
