use super::palette::{TEST_TEAL, TRAINING_RED};
use super::{capitalize, grid_rows, padded_range, save_chart, tag_segment, SvgArea, FONT};
use anyhow::Result;
use hivex_analysis::chart_data::{
    chart_tags, curve_frame, curve_groups, downsample, step_means, CurveGroupKey, StepPoint,
};
use hivex_analysis::frame::{observation_frame, TAG};
use hivex_core::{axis_key_str, axis_value_str, ObservationTable, Source};
use polars::prelude::DataFrame;
use plotters::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const COLUMNS: usize = 6;
const CELL_W: u32 = 360;
const CELL_H: u32 = 280;

fn source_color(source: Source) -> RGBColor {
    match source {
        Source::Training => TRAINING_RED,
        Source::Test => TEST_TEAL,
    }
}

/// File stem shared by the `.svg` and `.pdf` of one curve sheet.
pub fn curve_file_stem(key: &CurveGroupKey) -> String {
    format!(
        "{}_results_{}_{}_task_{}",
        key.env_name,
        axis_key_str(key.axis.map(|a| a.kind)),
        axis_value_str(key.axis.map(|a| a.value)),
        key.task
    )
}

fn sheet_title(key: &CurveGroupKey) -> String {
    match key.axis {
        Some(axis) => format!(
            "{} Train & Test Metrics: {}: {}, Task: {}",
            key.env_name,
            capitalize(axis.kind.as_str()),
            axis.value,
            key.task
        ),
        None => format!("{} Train & Test Metrics: Task: {}", key.env_name, key.task),
    }
}

/// Mean line per source over a shaded 95% band.
fn draw_curve(area: &SvgArea<'_>, group: &DataFrame, tag: &str, factor: usize) -> Result<()> {
    let mut series: Vec<(Source, Vec<StepPoint>)> = Vec::new();
    for source in [Source::Training, Source::Test] {
        let points = downsample(&step_means(group, tag, source)?, factor);
        if !points.is_empty() {
            series.push((source, points));
        }
    }

    let all = series.iter().flat_map(|(_, p)| p.iter());
    let x_range = padded_range(all.clone().map(|p| p.step as f64));
    let y_range = padded_range(all.flat_map(|p| [p.lower, p.upper]));

    let mut chart = ChartBuilder::on(area)
        .caption(tag_segment(tag), (FONT, 16))
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc("Step")
        .label_style((FONT, 10))
        .draw()?;

    for (source, points) in series {
        let color = source_color(source);
        let band: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p.step as f64, p.upper))
            .chain(points.iter().rev().map(|p| (p.step as f64, p.lower)))
            .collect();
        chart.draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))?;
        chart
            .draw_series(LineSeries::new(
                points.iter().map(|p| (p.step as f64, p.mean)),
                color.stroke_width(2),
            ))?
            .label(source.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font((FONT, 10))
        .draw()?;
    Ok(())
}

/// One sheet per `(env, difficulty/pattern, task)` group with a line plot per
/// tag; returns the PDFs written.
pub fn render_training_curves(
    table: &ObservationTable,
    excluded_tags: &[String],
    out_dir: &Path,
    factor: usize,
) -> Result<Vec<PathBuf>> {
    let allowed: BTreeSet<String> = chart_tags(table, excluded_tags).into_iter().collect();
    let frame = observation_frame(table)?;
    let mut written = Vec::new();
    for key in curve_groups(table) {
        let group = curve_frame(&frame, &key)?;
        let tags: BTreeSet<&str> = group
            .column(TAG)?
            .str()?
            .into_iter()
            .flatten()
            .filter(|t| allowed.contains(*t))
            .collect();
        if tags.is_empty() {
            continue;
        }
        let grid_h = grid_rows(tags.len(), COLUMNS);
        let size = (CELL_W * COLUMNS as u32, CELL_H * grid_h as u32 + 60);
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&WHITE)?;
            let body = root.titled(&sheet_title(&key), (FONT, 28))?;
            let cells = body.split_evenly((grid_h, COLUMNS));
            for (tag, cell) in tags.iter().zip(cells.iter()) {
                draw_curve(cell, &group, tag, factor)?;
            }
            root.present()?;
        }
        let path = save_chart(out_dir, &curve_file_stem(&key), &svg)?;
        tracing::info!(path = %path.display(), tags = tags.len(), "wrote training curves");
        written.push(path);
    }
    Ok(written)
}
