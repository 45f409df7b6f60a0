use super::palette::{gradient, EMPTY_CELL};
use super::{capitalize, grid_rows, save_chart, tag_segment, SvgArea, FONT};
use anyhow::Result;
use hivex_analysis::chart_data::{chart_tags, format_cell, mean_matrix, MeanMatrix};
use hivex_analysis::frame::observation_frame;
use hivex_core::{axis_value_str, ObservationTable};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

const SHEET_COLUMNS: usize = 2;
const CELL_W: u32 = 640;
const CELL_H: u32 = 420;

/// Task rows top to bottom, difficulty/pattern columns left to right, each
/// cell coloured on the matrix's own value range and labelled with its mean.
fn draw_mean_matrix(area: &SvgArea<'_>, matrix: &MeanMatrix, title: &str, x_desc: &str) -> Result<()> {
    let cols = matrix.axis_values.len();
    let rows = matrix.tasks.len();
    let (lo, hi) = matrix.value_range().unwrap_or((0.0, 0.0));

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..cols as f64 - 0.5, -0.5..rows as f64 - 0.5)?;

    let x_label = |x: &f64| {
        if x.fract() != 0.0 || *x < 0.0 {
            return String::new();
        }
        matrix
            .axis_values
            .get(*x as usize)
            .map(|v| axis_value_str(*v))
            .unwrap_or_default()
    };
    // Row 0 is drawn at the top.
    let y_label = |y: &f64| {
        if y.fract() != 0.0 || *y < 0.0 || *y as usize >= rows {
            return String::new();
        }
        matrix.tasks[rows - 1 - *y as usize].to_string()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(cols + 1)
        .y_labels(rows + 1)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .x_desc(x_desc)
        .y_desc("Task")
        .label_style((FONT, 12))
        .draw()?;

    let cells: Vec<(f64, f64, Option<f64>)> = matrix
        .cells
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            let y = (rows - 1 - r) as f64;
            row.iter().enumerate().map(move |(c, v)| (c as f64, y, *v))
        })
        .collect();

    chart.draw_series(cells.iter().map(|(x, y, v)| {
        let fill = match v {
            Some(v) => gradient(*v, lo, hi),
            None => EMPTY_CELL,
        };
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], fill.filled())
    }))?;

    let label_style = TextStyle::from((FONT, 12).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(cells.iter().filter_map(|(x, y, v)| {
        v.map(|v| Text::new(format_cell(v), (*x, *y), label_style.clone()))
    }))?;
    Ok(())
}

/// Strips a leading `<env>/` from a tag.
fn sheet_tag_name<'a>(env_name: &str, tag: &'a str) -> &'a str {
    tag.strip_prefix(env_name)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(tag)
}

fn axis_desc(table: &ObservationTable) -> String {
    table
        .axis_kind()
        .map(|k| capitalize(k.as_str()))
        .unwrap_or_else(|| "Difficulty".to_string())
}

/// Heatmap of every non-excluded tag of one environment, two per row.
/// Returns `None` when the table has nothing to draw.
pub fn render_average_sheet(
    table: &ObservationTable,
    excluded_tags: &[String],
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(env_name) = table.env_name() else {
        return Ok(None);
    };
    let frame = observation_frame(table)?;
    let mut matrices: Vec<MeanMatrix> = Vec::new();
    for tag in chart_tags(table, excluded_tags) {
        let matrix = mean_matrix(&frame, &tag)?;
        if !matrix.is_empty() {
            matrices.push(matrix);
        }
    }
    if matrices.is_empty() {
        tracing::warn!(env = env_name, "no tags left for the average sheet");
        return Ok(None);
    }

    let grid_h = grid_rows(matrices.len(), SHEET_COLUMNS);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CELL_W * SHEET_COLUMNS as u32, CELL_H * grid_h as u32 + 60))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let body = root.titled(&format!("Average Values for All Tags: {}", env_name), (FONT, 28))?;
        for (matrix, cell) in matrices.iter().zip(body.split_evenly((grid_h, SHEET_COLUMNS)).iter()) {
            let title = format!("Average Values for Tag: {}", sheet_tag_name(env_name, &matrix.tag));
            draw_mean_matrix(cell, matrix, &title, "Pattern/Difficulty")?;
        }
        root.present()?;
    }
    let path = save_chart(out_dir, &format!("{}_average_sheet", env_name), &svg)?;
    tracing::info!(path = %path.display(), tags = matrices.len(), "wrote average sheet");
    Ok(Some(path))
}

/// One environment's row of the cross-environment summary.
pub struct SummaryRow<'a> {
    pub env_name: &'a str,
    pub table: &'a ObservationTable,
    pub tags: &'a [String],
}

/// One row per environment with a heatmap per configured tag.
pub fn render_summary_sheet(rows: &[SummaryRow<'_>], out_dir: &Path) -> Result<Option<PathBuf>> {
    let cols = rows.iter().map(|r| r.tags.len()).max().unwrap_or(0);
    if rows.is_empty() || cols == 0 {
        return Ok(None);
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CELL_W * cols as u32, CELL_H * rows.len() as u32))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let cells = root.split_evenly((rows.len(), cols));
        for (r, row) in rows.iter().enumerate() {
            let x_desc = axis_desc(row.table);
            let frame = observation_frame(row.table)?;
            for (c, tag) in row.tags.iter().enumerate() {
                let matrix = mean_matrix(&frame, tag)?;
                if matrix.is_empty() {
                    tracing::warn!(env = row.env_name, tag = %tag, "no data for summary tag");
                    continue;
                }
                let title = format!("{}: {}", row.env_name, tag_segment(tag));
                draw_mean_matrix(&cells[r * cols + c], &matrix, &title, &x_desc)?;
            }
        }
        root.present()?;
    }
    let path = save_chart(out_dir, "cumulative_reward_multiple", &svg)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote summary sheet");
    Ok(Some(path))
}
