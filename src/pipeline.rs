//! Batch entry point: sources → normalized → flagged → metrics → report.

use tracing::info;

use crate::aggregate::{self, MetricsTable};
use crate::config::PipelineConfig;
use crate::error::MetricsError;
use crate::normalize;
use crate::reader::{self, RawUnit};
use crate::report::{self, ReportPaths};
use crate::rules;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No source produced any rows; nothing was written.
    Empty,
    Written(ReportPaths),
}

/// Normalize, classify and aggregate already-loaded units.
///
/// Returns `None` when the units hold no rows at all.
pub fn build_metrics(
    units: &[RawUnit],
    config: &PipelineConfig,
) -> Result<Option<MetricsTable>, MetricsError> {
    let frames = units
        .iter()
        .map(|unit| normalize::normalize(unit, &config.aliases))
        .collect::<Result<Vec<_>, _>>()?;
    let unified = normalize::concat(&frames)?;
    if unified.height() == 0 {
        return Ok(None);
    }
    info!(
        "Unified {} record(s) from {} unit(s)",
        unified.height(),
        units.len()
    );

    let flagged = rules::classify(&unified, config)?;
    let table = aggregate::aggregate(&flagged, config)?;
    Ok(Some(table))
}

/// Full run over `config.data_dir`.
pub fn run(config: &PipelineConfig) -> Result<RunOutcome, MetricsError> {
    info!("Loading data...");
    let units = reader::load_directory(&config.data_dir);

    let Some(table) = build_metrics(&units, config)? else {
        info!("No data found in {}", config.data_dir.display());
        return Ok(RunOutcome::Empty);
    };

    let paths = report::write_report(&table, config)?;
    Ok(RunOutcome::Written(paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn units_without_rows_are_empty() {
        let header_only = RawUnit::new(
            "north",
            DataFrame::new(vec![Column::new("Region".into(), Vec::<&str>::new())]).unwrap(),
        );
        let config = PipelineConfig::default();
        assert!(build_metrics(&[], &config).unwrap().is_none());
        assert!(build_metrics(&[header_only], &config).unwrap().is_none());
    }

    #[test]
    fn library_rows_count_people_but_not_sessions() {
        let unit = RawUnit::new(
            "north",
            DataFrame::new(vec![
                Column::new("Region".into(), ["North", "North"]),
                Column::new("Ignator".into(), ["IG-1", "IG-2"]),
                Column::new("Student".into(), ["S1", "S2"]),
                Column::new("Session".into(), ["LIB-1", "M-1"]),
                Column::new("Program".into(), ["Library", "Maths"]),
            ])
            .unwrap(),
        );
        let table = build_metrics(&[unit], &PipelineConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(table.total.unique_students, 2);
        assert_eq!(table.total.unique_ignators, 2);
        assert_eq!(table.total.eligible_session_count, 1);
        assert_eq!(table.region("North").unwrap().no_da_ignator_list, vec!["IG-2"]);
    }

    #[test]
    fn empty_data_dir_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            data_dir: dir.path().join("data"),
            out_dir: dir.path().join("docs"),
            ..PipelineConfig::default()
        };
        std::fs::create_dir_all(&config.data_dir).unwrap();

        assert_eq!(run(&config).unwrap(), RunOutcome::Empty);
        assert!(!config.out_dir.exists());
    }
}
