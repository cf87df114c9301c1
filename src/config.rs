//! Immutable pipeline configuration.
//!
//! Defaults reproduce the column aliases and program exclusions the dashboard
//! has always shipped with. A TOML file may override any part of it; alias
//! entries override per canonical field, every other key replaces the default.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::MetricsError;
use crate::schema::record;

const DEFAULT_ALIASES: [(&str, &[&str]); 10] = [
    (record::REGION, &["Region", "region"]),
    (
        record::IGNATOR_ID,
        &["IgnatorID", "Ignator Id", "Q-Card ID", "Ignator"],
    ),
    (record::STUDENT_ID, &["StudentID", "Student Id", "Student"]),
    (record::SESSION_ID, &["SessionID", "Session Id", "Session"]),
    (record::PROGRAM, &["Program", "Program Name"]),
    (record::SESSION_DATE, &["SessionDate", "Date"]),
    (
        record::DA_PRE_SCORE,
        &["DA_Pre_Score", "DA Pre Score", "DA Pre"],
    ),
    (
        record::DA_POST_SCORE,
        &["DA_Post_Score", "DA Post Score", "DA Post"],
    ),
    (record::DA_PRE_DATE, &["DA_Pre_Date", "DA Pre Date"]),
    (record::DA_POST_DATE, &["DA_Post_Date", "DA Post Date"]),
];

const DEFAULT_EXCLUDED_PROGRAMS: [&str; 18] = [
    "Digikshetra",
    "Financial Literacy",
    "I-code",
    "IMSL-MATH",
    "Young Instructor Training",
    "Jignyasa",
    "Ecology",
    "Library",
    "Art & Craft",
    "Science Model Making",
    "Debate/Quiz",
    "Campus Tour",
    "None",
    "Plastic Waste Management",
    "Circle Time",
    "YAP Program",
    "IA Pre/Post",
    "Team Building Activity",
];

const DEFAULT_DATE_FORMATS: [&str; 14] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

// ── Alias table ─────────────────────────────────────────────────────────────

/// Canonical field → source column names, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<String>>")]
pub struct AliasTable {
    entries: Vec<(String, Vec<String>)>,
}

impl AliasTable {
    /// Aliases for `field`, or an empty slice for a non-canonical name.
    pub fn aliases_for(&self, field: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the alias list of one canonical field.
    pub fn with_aliases(
        mut self,
        field: &str,
        aliases: Vec<String>,
    ) -> Result<Self, MetricsError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|(name, _)| name == field)
            .ok_or_else(|| {
                MetricsError::InvalidConfig(format!("'{field}' is not a canonical field"))
            })?;
        entry.1 = aliases;
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, aliases)| (name.as_str(), aliases.as_slice()))
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        let entries = DEFAULT_ALIASES
            .iter()
            .map(|(field, aliases)| {
                (
                    field.to_string(),
                    aliases.iter().map(|a| a.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for AliasTable {
    type Error = MetricsError;

    fn try_from(overrides: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        overrides
            .into_iter()
            .try_fold(Self::default(), |table, (field, aliases)| {
                table.with_aliases(&field, aliases)
            })
    }
}

// ── Exclusion set ───────────────────────────────────────────────────────────

/// Programs whose sessions never count as eligible. Exact, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn new<I, S>(programs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(programs.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, program: &str) -> bool {
        self.0.contains(program)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PROGRAMS)
    }
}

// ── Denominator policy ──────────────────────────────────────────────────────

/// How a percentage behaves when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenominatorPolicy {
    /// The percentage is reported as 0.0.
    ZeroWhenEmpty,
    /// The denominator is clamped to 1.
    FloorOfOne,
}

// ── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub metrics_file: String,
    pub chart_file: String,
    pub chart_title: String,
    /// Joins the missing-DA ignator list into a single CSV cell.
    pub list_separator: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            metrics_file: "aggregated_metrics.csv".to_string(),
            chart_file: "index.html".to_string(),
            chart_title: "DA Pre vs Post by Region".to_string(),
            list_separator: "; ".to_string(),
        }
    }
}

// ── Pipeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub aliases: AliasTable,
    pub excluded_programs: ExclusionSet,
    pub date_formats: Vec<String>,
    /// Applies to the TOTAL row only; region rows always use `ZeroWhenEmpty`.
    pub total_denominator_policy: DenominatorPolicy,
    pub unknown_region_label: String,
    pub report: ReportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("docs"),
            aliases: AliasTable::default(),
            excluded_programs: ExclusionSet::default(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            total_denominator_policy: DenominatorPolicy::FloorOfOne,
            unknown_region_label: "Unknown".to_string(),
            report: ReportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a TOML config file. Keys absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, MetricsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, MetricsError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MetricsError> {
        if self.unknown_region_label.is_empty() {
            return Err(MetricsError::InvalidConfig(
                "unknown_region_label must not be empty".into(),
            ));
        }
        if self.report.metrics_file.is_empty() || self.report.chart_file.is_empty() {
            return Err(MetricsError::InvalidConfig(
                "report file names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aliases_follow_canonical_order() {
        let table = AliasTable::default();
        let fields: Vec<&str> = table.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, record::ALL.to_vec());
        assert_eq!(
            table.aliases_for(record::IGNATOR_ID),
            ["IgnatorID", "Ignator Id", "Q-Card ID", "Ignator"]
        );
        assert_eq!(table.aliases_for(record::SESSION_DATE), ["SessionDate", "Date"]);
    }

    #[test]
    fn default_exclusions_are_exact() {
        let set = ExclusionSet::default();
        assert_eq!(set.len(), 18);
        assert!(set.contains("Art & Craft"));
        assert!(set.contains("None"));
        assert!(!set.contains("library"));
        assert!(!set.contains("Library "));
    }

    #[test]
    fn empty_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.total_denominator_policy, DenominatorPolicy::FloorOfOne);
    }

    #[test]
    fn alias_override_touches_only_named_field() {
        let config = PipelineConfig::from_toml(
            r#"
            data_dir = "input"
            total_denominator_policy = "zero_when_empty"

            [aliases]
            region = ["Zone"]

            [report]
            chart_title = "Pre/Post"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("input"));
        assert_eq!(config.aliases.aliases_for(record::REGION), ["Zone"]);
        assert_eq!(
            config.aliases.aliases_for(record::PROGRAM),
            ["Program", "Program Name"]
        );
        assert_eq!(config.total_denominator_policy, DenominatorPolicy::ZeroWhenEmpty);
        assert_eq!(config.report.chart_title, "Pre/Post");
        assert_eq!(config.report.metrics_file, "aggregated_metrics.csv");
    }

    #[test]
    fn unknown_alias_field_is_rejected() {
        let err = PipelineConfig::from_toml("[aliases]\ncoach = [\"Coach\"]").unwrap_err();
        assert!(err.to_string().contains("coach"));
    }

    #[test]
    fn excluded_programs_replace_defaults() {
        let config = PipelineConfig::from_toml(r#"excluded_programs = ["Chess"]"#).unwrap();
        assert!(config.excluded_programs.contains("Chess"));
        assert!(!config.excluded_programs.contains("Library"));
    }
}
