//! Business rules: date coercion and per-record completeness flags.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::datatypes::TimeUnit;
use polars::prelude::*;
use tracing::debug;

use crate::config::{ExclusionSet, PipelineConfig};
use crate::error::MetricsError;
use crate::schema::{flags, record};

/// Parse a free-form date. Anything unparseable is `None`, never an error.
///
/// RFC 3339 is tried first, then each format as a date-time, then as a bare
/// date (midnight).
pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    })
}

/// Derived flags of a single record. Depends on nothing outside the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordFlags {
    pub is_excluded_program: bool,
    pub has_pre: bool,
    pub has_post: bool,
    pub prepost_same_date: bool,
    pub valid_prepost_pair: bool,
}

impl RecordFlags {
    pub fn evaluate(
        program: Option<&str>,
        pre_score: Option<&str>,
        post_score: Option<&str>,
        pre_date: Option<NaiveDateTime>,
        post_date: Option<NaiveDateTime>,
        excluded: &ExclusionSet,
    ) -> Self {
        let is_excluded_program = program.is_some_and(|p| excluded.contains(p));
        let has_pre = pre_score.is_some();
        let has_post = post_score.is_some();
        let prepost_same_date = match (pre_date, post_date) {
            (Some(pre), Some(post)) => pre.date() == post.date(),
            _ => false,
        };
        Self {
            is_excluded_program,
            has_pre,
            has_post,
            prepost_same_date,
            valid_prepost_pair: has_pre && has_post && prepost_same_date,
        }
    }
}

/// Cast the date columns and append the five flag columns.
///
/// Date columns become `Datetime(µs)`; unparseable values are null.
pub fn classify(unified: &DataFrame, config: &PipelineConfig) -> Result<DataFrame, MetricsError> {
    let height = unified.height();

    let mut parsed: Vec<Vec<Option<NaiveDateTime>>> = Vec::with_capacity(record::DATES.len());
    for field in record::DATES {
        let raw = unified.column(field)?.str()?;
        let values: Vec<Option<NaiveDateTime>> = raw
            .into_iter()
            .map(|v| v.and_then(|s| parse_date(s, &config.date_formats)))
            .collect();
        let unparsed = raw.len() - raw.null_count() - values.iter().flatten().count();
        if unparsed > 0 {
            debug!("{field}: {unparsed} value(s) could not be parsed, set to null");
        }
        parsed.push(values);
    }
    let [_, pre_dates, post_dates] = parsed.as_slice() else {
        return Err(MetricsError::General("date columns out of sync".into()));
    };

    let program = unified.column(record::PROGRAM)?.str()?;
    let pre_score = unified.column(record::DA_PRE_SCORE)?.str()?;
    let post_score = unified.column(record::DA_POST_SCORE)?.str()?;

    let mut columns: [Vec<bool>; 5] = Default::default();
    for i in 0..height {
        let row = RecordFlags::evaluate(
            program.get(i),
            pre_score.get(i),
            post_score.get(i),
            pre_dates[i],
            post_dates[i],
            &config.excluded_programs,
        );
        columns[0].push(row.is_excluded_program);
        columns[1].push(row.has_pre);
        columns[2].push(row.has_post);
        columns[3].push(row.prepost_same_date);
        columns[4].push(row.valid_prepost_pair);
    }

    let mut df = unified.clone();
    for (field, values) in record::DATES.iter().zip(&parsed) {
        df.with_column(datetime_column(field, values)?)?;
    }
    for (name, values) in flags::ALL.iter().zip(columns) {
        df.with_column(Column::new((*name).into(), values))?;
    }
    Ok(df)
}

fn datetime_column(name: &str, values: &[Option<NaiveDateTime>]) -> Result<Column, MetricsError> {
    let micros: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.map(|dt| dt.and_utc().timestamp_micros()))
        .collect();
    let column = Column::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    Ok(column)
}
