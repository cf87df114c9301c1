//! Program-session DA completeness metrics.
//!
//! Spreadsheet rows with inconsistent headers are normalized onto one
//! canonical schema, flagged by business rules and reduced to per-region
//! metrics plus an organization-wide TOTAL row.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod rules;
pub mod schema;
pub mod visualization;

#[cfg(feature = "python")]
mod python;

pub use aggregate::{MetricsTable, RegionMetrics};
pub use config::{AliasTable, DenominatorPolicy, ExclusionSet, PipelineConfig};
pub use error::MetricsError;
pub use pipeline::{build_metrics, run, RunOutcome};
pub use reader::RawUnit;
