//! Schema normalization: maps raw units onto the ten canonical columns.

use polars::prelude::*;
use tracing::debug;

use crate::config::AliasTable;
use crate::error::MetricsError;
use crate::reader::RawUnit;
use crate::schema::record;

/// First alias present in `frame`, matched exactly (case and whitespace).
pub fn resolve_column<'a>(frame: &'a DataFrame, aliases: &[String]) -> Option<&'a Column> {
    aliases
        .iter()
        .find_map(|alias| frame.column(alias.as_str()).ok())
}

/// Project one raw unit onto the canonical schema.
///
/// Output columns are exactly `record::ALL`, in order, all String typed.
/// Unresolved fields are null for every row. When the region column ends
/// up entirely null, every row takes the unit's source identifier instead.
pub fn normalize(unit: &RawUnit, aliases: &AliasTable) -> Result<DataFrame, MetricsError> {
    let frame = &unit.frame;
    let height = frame.height();

    let mut columns = Vec::with_capacity(record::ALL.len());
    for field in record::ALL {
        let column = match resolve_column(frame, aliases.aliases_for(field)) {
            Some(source) => {
                debug!(
                    "{}{}: {field} <- '{}'",
                    unit.source_id,
                    sheet_suffix(unit),
                    source.name()
                );
                source.cast(&DataType::String)?.with_name(field.into())
            }
            None => Column::full_null(field.into(), height, &DataType::String),
        };
        columns.push(column);
    }

    if columns[0].null_count() == height {
        debug!(
            "{}{}: no region values, falling back to source id",
            unit.source_id,
            sheet_suffix(unit)
        );
        columns[0] = Column::new(record::REGION.into(), vec![unit.source_id.clone(); height]);
    }

    Ok(DataFrame::new(columns)?)
}

/// Zero-row frame with the canonical schema.
pub fn empty_table() -> Result<DataFrame, MetricsError> {
    let columns = record::ALL
        .iter()
        .map(|field| Column::full_null((*field).into(), 0, &DataType::String))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Stack normalized frames in order of appearance. No deduplication.
pub fn concat(frames: &[DataFrame]) -> Result<DataFrame, MetricsError> {
    let mut unified = empty_table()?;
    for frame in frames {
        unified.vstack_mut(frame)?;
    }
    unified.as_single_chunk_par();
    Ok(unified)
}

fn sheet_suffix(unit: &RawUnit) -> String {
    unit.sheet
        .as_deref()
        .map(|sheet| format!(" [{sheet}]"))
        .unwrap_or_default()
}
