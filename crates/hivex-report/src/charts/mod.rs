//! Renderings of the aggregated results: training curves, average heatmap
//! sheets, the cross-environment summary and agent-count scaling. Each chart
//! is drawn to SVG and converted to a PDF of the same stem.

pub mod curves;
pub mod heatmap;
pub mod palette;
pub mod scaling;

pub use curves::{curve_file_stem, render_training_curves};
pub use heatmap::{render_average_sheet, render_summary_sheet, SummaryRow};
pub use scaling::{render_scalability, ScalabilityData};

use anyhow::{anyhow, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};

pub(crate) type SvgArea<'a> = DrawingArea<SVGBackend<'a>, Shift>;

pub(crate) const FONT: &str = "sans-serif";

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options).context("parse rendered svg")?;
    svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
        .map_err(|err| anyhow!("convert svg to pdf: {:?}", err))
}

/// Writes `<stem>.svg` and `<stem>.pdf` under `out_dir`; returns the PDF path.
pub(crate) fn save_chart(out_dir: &Path, stem: &str, svg: &str) -> Result<PathBuf> {
    hivex_core::ensure_dir(out_dir)?;
    hivex_core::atomic_write_bytes(&out_dir.join(format!("{}.svg", stem)), svg.as_bytes())?;
    let pdf = out_dir.join(format!("{}.pdf", stem));
    hivex_core::atomic_write_bytes(&pdf, &svg_to_pdf(svg)?)?;
    Ok(pdf)
}

/// `[lo, hi]` of the values, widened so a flat series still gets an axis.
pub(crate) fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.5 };
    (lo - pad)..(hi + pad)
}

/// Second path segment of a tag (`Environment/Cumulative Reward` -> `Cumulative Reward`).
pub(crate) fn tag_segment(tag: &str) -> &str {
    tag.split('/').nth(1).unwrap_or(tag)
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn grid_rows(items: usize, cols: usize) -> usize {
    items.div_ceil(cols).max(1)
}
