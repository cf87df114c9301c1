use std::path::Path;

use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::config::PipelineConfig;
use crate::error::MetricsError;
use crate::pipeline;
use crate::reader::RawUnit;
use crate::schema;
use crate::visualization::{self, ChartConfig};

fn load_config(config_path: Option<&str>) -> Result<PipelineConfig, MetricsError> {
    match config_path {
        Some(path) => PipelineConfig::load(Path::new(path)),
        None => Ok(PipelineConfig::default()),
    }
}

/// Build the metrics frame from `(source_id, DataFrame)` pairs.
///
/// Returns `None` when the frames hold no rows.
#[pyfunction]
#[pyo3(signature = (units, config_path=None))]
fn build_metrics(
    units: Vec<(String, PyDataFrame)>,
    config_path: Option<&str>,
) -> PyResult<Option<PyDataFrame>> {
    let config = load_config(config_path)?;
    let units: Vec<RawUnit> = units
        .into_iter()
        .map(|(source_id, df)| RawUnit::new(source_id, df.0))
        .collect();

    let Some(table) = pipeline::build_metrics(&units, &config)? else {
        return Ok(None);
    };
    let frame = table.to_frame(&config.report.list_separator)?;
    Ok(Some(PyDataFrame(frame)))
}

/// Render the grouped bar chart for a metrics frame as an HTML fragment.
///
/// Use with `IPython.display.HTML(render_chart(metrics))` in Jupyter.
#[pyfunction]
#[pyo3(signature = (metrics, title=None))]
fn render_chart(metrics: PyDataFrame, title: Option<String>) -> PyResult<String> {
    let config = title.map(ChartConfig::titled).unwrap_or_default();
    Ok(visualization::generate_bar_chart_html(&metrics.0, &config)?)
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let record = PyModule::new(m.py(), "record")?;
    for name in schema::record::ALL {
        record.add(name.to_uppercase(), name)?;
    }
    m.add_submodule(&record)?;

    let flags = PyModule::new(m.py(), "flags")?;
    for name in schema::flags::ALL {
        flags.add(name.to_uppercase(), name)?;
    }
    m.add_submodule(&flags)?;

    let metrics = PyModule::new(m.py(), "metrics")?;
    metrics.add("ALL", schema::metrics::ALL.to_vec())?;
    metrics.add("TOTAL", schema::metrics::TOTAL)?;
    m.add_submodule(&metrics)?;

    Ok(())
}

#[pymodule]
#[pyo3(name = "_core")]
fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(build_metrics, m)?)?;
    m.add_function(wrap_pyfunction!(render_chart, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
