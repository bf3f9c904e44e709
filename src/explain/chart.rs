//! Horizontal bar chart of a ranking, written as SVG.

use std::fs;
use std::path::Path;

use plotters::prelude::*;

use crate::common::error::{RiskError, RiskResult};

use super::domain::Ranking;

const WIDTH: u32 = 1000;
const ROW_HEIGHT: u32 = 22;
const CHROME_HEIGHT: u32 = 120;

/// Overwrite `path` with a bar chart of `ranking`, highest bar on top.
pub fn render_chart(ranking: &Ranking, path: &Path) -> RiskResult<()> {
    if ranking.is_empty() {
        return Err(RiskError::Render {
            path: path.to_path_buf(),
            details: "nothing to plot".to_string(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| RiskError::Render {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;
    }
    draw(ranking, path).map_err(|err| RiskError::Render {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn draw(ranking: &Ranking, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let n = ranking.len();
    let height = CHROME_HEIGHT + ROW_HEIGHT * n as u32;
    let root = SVGBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let max = ranking
        .iter()
        .map(|f| f.importance)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    // Row 0 sits at the bottom, so the top-ranked feature takes row n - 1.
    let label = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(row) | SegmentValue::Exact(row) if *row < n => {
            ranking[n - 1 - row].feature.clone()
        }
        _ => String::new(),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(220)
        .build_cartesian_2d(0.0..(max * 1.05).max(1e-6), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&label)
        .x_desc("importance")
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(3)
            .data(ranking.iter().enumerate().map(|(rank, f)| (n - 1 - rank, f.importance))),
    )?;

    root.present()?;
    Ok(())
}
