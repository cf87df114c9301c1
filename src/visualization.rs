/// Visualization module: grouped bar chart of DA-Pre vs DA-Post per region.
///
/// Produces a self-contained HTML string with inline JS that handles:
/// - One group per region, one bar per series
/// - A value axis scaled to the largest count
/// - Legend and hover tooltips
///
/// All SVG rendering is done client-side by bar_chart.js. This module
/// extracts data from the metrics DataFrame, serializes it to JSON, and
/// emits the HTML shell.
use serde::Serialize;

use polars::prelude::*;

use crate::error::MetricsError;
use crate::schema::metrics;

const CHART_JS: &str = include_str!("bar_chart.js");

// ── Config ──────────────────────────────────────────────────────────────────

/// Configuration for the bar chart.
pub struct ChartConfig {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    /// Pixel height of the plotting area
    pub height_px: u32,
    /// Pixel width reserved per region group
    pub group_width_px: u32,
}

impl ChartConfig {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "DA Pre vs Post by Region".to_string(),
            x_axis_title: "Region".to_string(),
            y_axis_title: "Count".to_string(),
            height_px: 360,
            group_width_px: 96,
        }
    }
}

// ── Intermediate data structures ────────────────────────────────────────────

#[derive(Serialize)]
struct BarSeries {
    name: &'static str,
    color: &'static str,
    values: Vec<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartData<'a> {
    title: &'a str,
    x_axis_title: &'a str,
    y_axis_title: &'a str,
    height: u32,
    group_width: u32,
    categories: Vec<String>,
    series: Vec<BarSeries>,
}

// ── Data extraction ─────────────────────────────────────────────────────────

/// Region names and their pre/post counts, TOTAL excluded.
fn extract_counts(frame: &DataFrame) -> Result<(Vec<String>, Vec<u64>, Vec<u64>), MetricsError> {
    let regions = frame.column(metrics::REGION)?.str()?;
    let pre = count_column(frame, metrics::DA_PRE)?;
    let post = count_column(frame, metrics::DA_POST)?;

    let mut names = Vec::with_capacity(frame.height());
    let mut pre_counts = Vec::with_capacity(frame.height());
    let mut post_counts = Vec::with_capacity(frame.height());
    for i in 0..frame.height() {
        let Some(region) = regions.get(i) else {
            continue;
        };
        if region == metrics::TOTAL {
            continue;
        }
        names.push(region.to_string());
        pre_counts.push(pre.get(i).unwrap_or(0));
        post_counts.push(post.get(i).unwrap_or(0));
    }
    Ok((names, pre_counts, post_counts))
}

fn count_column(frame: &DataFrame, name: &str) -> Result<UInt64Chunked, MetricsError> {
    let column = frame
        .column(name)
        .map_err(|_| MetricsError::ColumnNotFound(name.to_string()))?;
    Ok(column.cast(&DataType::UInt64)?.u64()?.clone())
}

// ── HTML generation ─────────────────────────────────────────────────────────

/// Main entry point: generates a self-contained HTML fragment.
pub fn generate_bar_chart_html(
    metrics_frame: &DataFrame,
    config: &ChartConfig,
) -> Result<String, MetricsError> {
    let (categories, pre, post) = extract_counts(metrics_frame)?;

    if categories.is_empty() {
        return Ok("<div>No regions to visualize.</div>".to_string());
    }

    let data = ChartData {
        title: &config.title,
        x_axis_title: &config.x_axis_title,
        y_axis_title: &config.y_axis_title,
        height: config.height_px,
        group_width: config.group_width_px,
        categories,
        series: vec![
            BarSeries {
                name: metrics::DA_PRE,
                color: "#4dabf7",
                values: pre,
            },
            BarSeries {
                name: metrics::DA_POST,
                color: "#f59f00",
                values: post,
            },
        ],
    };
    let data_json = script_safe(&serde_json::to_string(&data)?);

    let html = format!(
        r##"<div style="position:relative; width:100%; border:1px solid #dee2e6; border-radius:4px; background:#fff;">
  <div style="padding:4px 8px; border-bottom:1px solid #dee2e6; font-family:sans-serif; font-size:12px; color:#495057;">
    <span style="font-weight:600;">{title}</span>
  </div>
  <div id="da-chart-container" style="overflow-x:auto;">
    <svg id="da-chart-svg" xmlns="http://www.w3.org/2000/svg" width="100" height="100">
      <style>
        .axis-label {{ font-family: sans-serif; font-size: 12px; fill: #495057; }}
        .tick-label {{ font-family: sans-serif; font-size: 10px; fill: #868e96; }}
        .category-label {{ font-family: sans-serif; font-size: 11px; fill: #495057; text-anchor: middle; }}
        .bar {{ cursor: pointer; }}
        .bar:hover {{ opacity: 0.8; }}
        .grid-line {{ stroke: #f1f3f5; stroke-width: 1; }}
      </style>
    </svg>
  </div>
</div>
<script>
{chart_js}
DaBarChart.create(document.getElementById("da-chart-svg"), {data_json});
</script>"##,
        title = escape_html(&config.title),
        chart_js = CHART_JS,
        data_json = data_json,
    );

    Ok(html)
}

/// Wrap a chart fragment in a standalone HTML document.
pub fn render_page(title: &str, fragment: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body style="margin:24px;">
{fragment}
</body>
</html>
"##,
        title = escape_html(title),
        fragment = fragment,
    )
}

/// Keeps serialized JSON from closing the surrounding script element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
