//! Persists the metrics table and its chart.

use std::fs;
use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::aggregate::MetricsTable;
use crate::config::PipelineConfig;
use crate::error::MetricsError;
use crate::visualization::{self, ChartConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub metrics_csv: PathBuf,
    pub chart_html: PathBuf,
}

/// Write the metrics CSV and chart page into `config.out_dir`.
///
/// Both artifacts are rendered in memory first so a rendering failure
/// leaves nothing behind.
pub fn write_report(
    table: &MetricsTable,
    config: &PipelineConfig,
) -> Result<ReportPaths, MetricsError> {
    let report = &config.report;
    let mut frame = table.to_frame(&report.list_separator)?;

    let mut csv: Vec<u8> = Vec::new();
    CsvWriter::new(&mut csv)
        .include_header(true)
        .finish(&mut frame)?;

    let fragment =
        visualization::generate_bar_chart_html(&frame, &ChartConfig::titled(&report.chart_title))?;
    let page = visualization::render_page(&report.chart_title, &fragment);

    fs::create_dir_all(&config.out_dir)?;
    let paths = ReportPaths {
        metrics_csv: config.out_dir.join(&report.metrics_file),
        chart_html: config.out_dir.join(&report.chart_file),
    };
    fs::write(&paths.metrics_csv, &csv)?;
    fs::write(&paths.chart_html, page)?;

    info!(
        "Wrote {} and {}",
        paths.chart_html.display(),
        paths.metrics_csv.display()
    );
    Ok(paths)
}
