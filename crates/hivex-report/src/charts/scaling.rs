use super::palette::SERIES;
use super::{padded_range, save_chart, tag_segment, FONT};
use anyhow::Result;
use hivex_analysis::chart_data::agent_count_means;
use hivex_analysis::frame::observation_frame;
use hivex_core::{ObservationTable, ScalabilityPanel};
use plotters::prelude::*;
use std::path::{Path, PathBuf};

const PANEL_W: u32 = 560;
const PANEL_H: u32 = 480;

/// A configured panel and the scalability runs loaded for its dataset.
pub struct ScalabilityData<'a> {
    pub panel: &'a ScalabilityPanel,
    pub table: &'a ObservationTable,
}

/// Side-by-side panels of mean value per agent count, a line per tag.
pub fn render_scalability(panels: &[ScalabilityData<'_>], out_dir: &Path) -> Result<Option<PathBuf>> {
    if panels.is_empty() {
        return Ok(None);
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (PANEL_W * panels.len() as u32, PANEL_H)).into_drawing_area();
        root.fill(&WHITE)?;
        let areas = root.split_evenly((1, panels.len()));
        for (data, area) in panels.iter().zip(areas.iter()) {
            let frame = observation_frame(data.table)?;
            let mut lines: Vec<(&String, Vec<(f64, f64)>)> = Vec::new();
            for tag in &data.panel.tags {
                let points: Vec<(f64, f64)> = agent_count_means(&frame, tag)?
                    .into_iter()
                    .map(|(count, mean)| (f64::from(count), mean))
                    .collect();
                if points.is_empty() {
                    tracing::warn!(dataset = %data.panel.dataset, tag = %tag, "no scalability data for tag");
                    continue;
                }
                lines.push((tag, points));
            }

            let all = lines.iter().flat_map(|(_, p)| p.iter());
            let mut chart = ChartBuilder::on(area)
                .caption(&data.panel.title, (FONT, 20))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(
                    padded_range(all.clone().map(|(x, _)| *x)),
                    padded_range(all.map(|(_, y)| *y)),
                )?;
            chart
                .configure_mesh()
                .x_desc("Agent Count")
                .y_desc("Average Value")
                .label_style((FONT, 12))
                .draw()?;

            for (i, (tag, points)) in lines.into_iter().enumerate() {
                let color = SERIES[i % SERIES.len()];
                chart
                    .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
                    .label(tag_segment(tag))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
                chart.draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))?;
            }
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .label_font((FONT, 11))
                .draw()?;
        }
        root.present()?;
    }
    let path = save_chart(out_dir, "scalability_agent_count", &svg)?;
    tracing::info!(path = %path.display(), panels = panels.len(), "wrote scalability chart");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hivex_core::{Observation, RunIdentity, Source};
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn one_panel_per_dataset() {
        let dir = std::env::temp_dir().join(format!(
            "hivex_scaling_test_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        ));
        let mut table = ObservationTable::new();
        for (count, value) in [(2, 1.0), (4, 3.0), (8, 2.5)] {
            table.push(Observation {
                run: Arc::new(RunIdentity {
                    env_name: "WindFarmControl".to_string(),
                    axis: None,
                    task: 0,
                    run_id: count,
                    agent_count: Some(count),
                }),
                source: Source::Test,
                step: 0,
                tag: "Environment/Cumulative Reward".to_string(),
                value,
            });
        }
        let panel = ScalabilityPanel {
            dataset: "WindFarmControl".to_string(),
            title: "Wind Farm Control".to_string(),
            tags: vec![
                "Environment/Cumulative Reward".to_string(),
                "WindFarmControl/Missing".to_string(),
            ],
        };
        let path = render_scalability(
            &[ScalabilityData {
                panel: &panel,
                table: &table,
            }],
            &dir,
        )
        .expect("render")
        .expect("written");
        assert_eq!(path, dir.join("scalability_agent_count.pdf"));
        assert!(fs::read(&path).expect("pdf").starts_with(b"%PDF"));
        let svg = fs::read_to_string(path.with_extension("svg")).expect("svg");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Agent Count"));
        assert!(svg.contains("Wind Farm Control"));
        assert!(render_scalability(&[], &dir).expect("render").is_none());
        let _ = fs::remove_dir_all(dir);
    }
}
