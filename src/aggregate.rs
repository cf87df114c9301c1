//! Region metrics over the flagged record set.
//!
//! Unique counts are not additive, so the TOTAL row is a separate reduction
//! over every record rather than a sum of region rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use polars::prelude::*;
use tracing::info;

use crate::config::{DenominatorPolicy, PipelineConfig};
use crate::error::MetricsError;
use crate::schema::{flags, metrics, record};

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionMetrics {
    pub region: String,
    pub unique_students: u64,
    pub unique_ignators: u64,
    pub eligible_session_count: u64,
    pub da_pre_count: u64,
    pub da_post_count: u64,
    pub completion_rate_pct: f64,
    pub prepost_gap: i64,
    pub wastage_pct: f64,
    pub no_da_ignator_count: u64,
    pub no_da_ignator_list: Vec<String>,
}

/// Region rows in ascending order, then TOTAL.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    pub regions: Vec<RegionMetrics>,
    pub total: RegionMetrics,
}

impl MetricsTable {
    pub fn rows(&self) -> impl Iterator<Item = &RegionMetrics> {
        self.regions.iter().chain(std::iter::once(&self.total))
    }

    pub fn region(&self, name: &str) -> Option<&RegionMetrics> {
        self.regions.iter().find(|r| r.region == name)
    }

    /// Report frame with the `schema::metrics` columns in their fixed order.
    pub fn to_frame(&self, list_separator: &str) -> Result<DataFrame, MetricsError> {
        let rows: Vec<&RegionMetrics> = self.rows().collect();
        let pick_u64 = |f: fn(&RegionMetrics) -> u64| rows.iter().map(|r| f(r)).collect::<Vec<u64>>();
        let pick_f64 = |f: fn(&RegionMetrics) -> f64| rows.iter().map(|r| f(r)).collect::<Vec<f64>>();

        let df = DataFrame::new(vec![
            Column::new(
                metrics::REGION.into(),
                rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(metrics::UNIQUE_STUDENTS.into(), pick_u64(|r| r.unique_students)),
            Column::new(metrics::UNIQUE_IGNATORS.into(), pick_u64(|r| r.unique_ignators)),
            Column::new(
                metrics::SESSION_COUNT.into(),
                pick_u64(|r| r.eligible_session_count),
            ),
            Column::new(metrics::DA_PRE.into(), pick_u64(|r| r.da_pre_count)),
            Column::new(metrics::DA_POST.into(), pick_u64(|r| r.da_post_count)),
            Column::new(
                metrics::COMPLETION_RATE.into(),
                pick_f64(|r| r.completion_rate_pct),
            ),
            Column::new(
                metrics::PREPOST_GAP.into(),
                rows.iter().map(|r| r.prepost_gap).collect::<Vec<i64>>(),
            ),
            Column::new(metrics::WASTAGE.into(), pick_f64(|r| r.wastage_pct)),
            Column::new(
                metrics::NO_DA_IGNATOR_COUNT.into(),
                pick_u64(|r| r.no_da_ignator_count),
            ),
            Column::new(
                metrics::NO_DA_IGNATOR_LIST.into(),
                rows.iter()
                    .map(|r| r.no_da_ignator_list.join(list_separator))
                    .collect::<Vec<String>>(),
            ),
        ])?;
        Ok(df)
    }
}

/// Reduce the flagged table to one row per region plus TOTAL.
///
/// Region rows report 0.0 for a percentage whose denominator is zero; TOTAL
/// follows `config.total_denominator_policy`.
///
/// Records whose region is still null are not dropped: they form their own
/// row under `config.unknown_region_label`, with real counts, and also count
/// toward TOTAL.
pub fn aggregate(flagged: &DataFrame, config: &PipelineConfig) -> Result<MetricsTable, MetricsError> {
    let labelled = flagged
        .clone()
        .lazy()
        .with_column(col(record::REGION).fill_null(lit(config.unknown_region_label.as_str())))
        .collect()?;

    let names: BTreeSet<String> = labelled
        .column(record::REGION)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

    let mut regions = Vec::with_capacity(names.len());
    for name in names {
        let group = labelled
            .clone()
            .lazy()
            .filter(col(record::REGION).eq(lit(name.as_str())))
            .collect()?;
        let row = GroupColumns::from_frame(&group)?
            .reduce(name, DenominatorPolicy::ZeroWhenEmpty, true);
        info!(
            "{}: {} eligible session(s), {} pre / {} post",
            row.region, row.eligible_session_count, row.da_pre_count, row.da_post_count
        );
        regions.push(row);
    }

    let total = GroupColumns::from_frame(&labelled)?.reduce(
        metrics::TOTAL.to_string(),
        config.total_denominator_policy,
        false,
    );

    Ok(MetricsTable { regions, total })
}

/// Borrowed views of the columns a reduction reads.
struct GroupColumns<'a> {
    student: &'a StringChunked,
    ignator: &'a StringChunked,
    session: &'a StringChunked,
    excluded: &'a BooleanChunked,
    has_pre: &'a BooleanChunked,
    has_post: &'a BooleanChunked,
}

impl<'a> GroupColumns<'a> {
    fn from_frame(df: &'a DataFrame) -> Result<Self, MetricsError> {
        Ok(Self {
            student: df.column(record::STUDENT_ID)?.str()?,
            ignator: df.column(record::IGNATOR_ID)?.str()?,
            session: df.column(record::SESSION_ID)?.str()?,
            excluded: df.column(flags::IS_EXCLUDED_PROGRAM)?.bool()?,
            has_pre: df.column(flags::HAS_PRE)?.bool()?,
            has_post: df.column(flags::HAS_POST)?.bool()?,
        })
    }

    fn height(&self) -> usize {
        self.student.len()
    }

    fn is_eligible(&self, i: usize) -> bool {
        self.excluded.get(i) != Some(true)
    }

    fn has_any_da(&self, i: usize) -> bool {
        self.has_pre.get(i) == Some(true) || self.has_post.get(i) == Some(true)
    }

    fn reduce(&self, region: String, policy: DenominatorPolicy, with_no_da: bool) -> RegionMetrics {
        let unique_students = distinct(self.student) as u64;
        let unique_ignators = distinct(self.ignator) as u64;

        let eligible_session_count = (0..self.height())
            .filter(|&i| self.is_eligible(i))
            .filter_map(|i| self.session.get(i))
            .collect::<HashSet<&str>>()
            .len() as u64;

        let da_pre_count = count_true(self.has_pre);
        let da_post_count = count_true(self.has_post);
        let prepost_gap = da_pre_count as i64 - da_post_count as i64;

        let no_da_ignator_list = if with_no_da {
            self.ignators_without_da()
        } else {
            Vec::new()
        };

        RegionMetrics {
            region,
            unique_students,
            unique_ignators,
            eligible_session_count,
            da_pre_count,
            da_post_count,
            completion_rate_pct: percent(da_post_count as i64, eligible_session_count, policy),
            prepost_gap,
            wastage_pct: percent(prepost_gap, da_pre_count, policy),
            no_da_ignator_count: no_da_ignator_list.len() as u64,
            no_da_ignator_list,
        }
    }

    /// Ignators with eligible rows, none of which carries a pre or post score.
    /// Order of first appearance.
    fn ignators_without_da(&self) -> Vec<String> {
        let mut order: Vec<&str> = Vec::new();
        let mut silent: HashMap<&str, bool> = HashMap::new();

        for i in (0..self.height()).filter(|&i| self.is_eligible(i)) {
            let Some(ignator) = self.ignator.get(i) else {
                continue;
            };
            let no_da = !self.has_any_da(i);
            silent
                .entry(ignator)
                .and_modify(|all| *all &= no_da)
                .or_insert_with(|| {
                    order.push(ignator);
                    no_da
                });
        }

        order
            .into_iter()
            .filter(|ignator| silent.get(ignator).copied().unwrap_or(false))
            .map(str::to_string)
            .collect()
    }
}

fn distinct(values: &StringChunked) -> usize {
    values.into_iter().flatten().collect::<HashSet<&str>>().len()
}

fn count_true(values: &BooleanChunked) -> u64 {
    values.into_iter().filter(|v| *v == Some(true)).count() as u64
}

/// `numerator / denominator * 100`, rounded to one decimal.
fn percent(numerator: i64, denominator: u64, policy: DenominatorPolicy) -> f64 {
    let denominator = match policy {
        DenominatorPolicy::ZeroWhenEmpty if denominator == 0 => return 0.0,
        DenominatorPolicy::ZeroWhenEmpty => denominator,
        DenominatorPolicy::FloorOfOne => denominator.max(1),
    };
    round1(numerator as f64 / denominator as f64 * 100.0)
}

/// Rounds the exact binary value, ties to even: 6.25 -> 6.2, 0.35 -> 0.3.
fn round1(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}
