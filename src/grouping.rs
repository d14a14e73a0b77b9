//! Choosing the columns that identify one investment series, and splitting a
//! table into those series.
//!
//! Result tables carry every OSeMOSYS set as a column, but capital investment
//! is only reported against a few of them (typically region and technology).
//! Grouping by every set column would put each row into its own group and no
//! payment would ever accumulate, so the key is derived from the rows that
//! actually hold investments.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    table::{ColumnIndex, Table, is_missing, parse_number},
};

/// Used when no row has a positive investment to learn the key from.
const FALLBACK_GROUPING: &[&str] = &["TECHNOLOGY", "REGION"];

/// Cell values of the key columns for one row, `None` for missing cells.
/// Missing values compare equal, so such rows group together.
pub type GroupKey = Vec<Option<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: String,
    pub index: ColumnIndex,
}

/// What the key is derived from.
#[derive(Debug, Clone, Copy)]
pub struct GroupingRequest<'a> {
    /// Candidate columns, in preference order. Absent columns are skipped.
    pub candidates: &'a [String],
    /// Used as-is when every one of these columns turns out to be effective.
    pub primary: &'a [String],
    /// Columns never used as keys (year, investment, output).
    pub excluded: &'a [ColumnIndex],
}

/// Picks the key columns from the rows whose investment is positive.
///
/// `investments` holds the parsed investment of every table row.
pub fn effective_grouping(
    table: &Table,
    investments: &[Option<f64>],
    request: GroupingRequest<'_>,
) -> Result<Vec<KeyColumn>> {
    let positive_rows: Vec<usize> = investments
        .iter()
        .enumerate()
        .filter(|(_, investment)| investment.is_some_and(|v| v > 0.0))
        .map(|(row, _)| row)
        .collect();

    let columns = if positive_rows.is_empty() {
        warn!("No rows with a positive investment, trying {FALLBACK_GROUPING:?}");
        fallback_grouping(table)
    } else {
        info!("Found {} rows with a positive investment", positive_rows.len());
        let effective = columns_with_data(table, &positive_rows, request);
        prefer_primary(effective, request.primary)
    };

    if columns.is_empty() {
        return Err(Error::DegenerateInput(format!(
            "none of the grouping columns [{}] carries data where investments are positive",
            request.candidates.join(", ")
        )));
    }

    info!(
        "Grouping by {:?}",
        columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );
    Ok(columns)
}

fn fallback_grouping(table: &Table) -> Vec<KeyColumn> {
    let columns: Vec<_> = FALLBACK_GROUPING
        .iter()
        .filter_map(|name| {
            table.find_column(name).map(|index| KeyColumn { name: name.to_string(), index })
        })
        .collect();

    if columns.len() == FALLBACK_GROUPING.len() { columns } else { Vec::new() }
}

fn columns_with_data(
    table: &Table,
    positive_rows: &[usize],
    request: GroupingRequest<'_>,
) -> Vec<KeyColumn> {
    let mut effective = Vec::new();

    for name in request.candidates {
        let Some(index) = table.find_column(name) else {
            warn!("Column \"{name}\" not found in dataset");
            continue;
        };
        let already_used = effective.iter().any(|c: &KeyColumn| c.index == index);
        if request.excluded.contains(&index) || already_used {
            continue;
        }

        let values: Vec<&str> = positive_rows
            .iter()
            .map(|&row| table.cell(row, index))
            .filter(|cell| !is_missing(cell))
            .collect();
        let distinct: BTreeSet<&str> = values.iter().copied().collect();

        if values.is_empty() {
            debug!("  \"{name}\": blank wherever an investment exists");
        } else if distinct.iter().all(|v| parse_number(v) == Ok(Some(0.0))) {
            debug!("  \"{name}\": zero wherever an investment exists");
        } else {
            debug!(
                "  \"{name}\": {} distinct values, {}/{} non-empty",
                distinct.len(),
                values.len(),
                positive_rows.len()
            );
            if distinct.len() <= 5 {
                debug!("     values: {distinct:?}");
            }
            effective.push(KeyColumn { name: name.clone(), index });
        }
    }

    effective
}

fn prefer_primary(effective: Vec<KeyColumn>, primary: &[String]) -> Vec<KeyColumn> {
    if primary.is_empty() {
        return effective;
    }

    let primary_columns: Option<Vec<KeyColumn>> = primary
        .iter()
        .map(|name| effective.iter().find(|c| &c.name == name).cloned())
        .collect();

    primary_columns.unwrap_or(effective)
}

/// Row indices of each group, in table order.
pub fn group_rows(table: &Table, key_columns: &[KeyColumn]) -> BTreeMap<GroupKey, Vec<usize>> {
    let mut groups = BTreeMap::<GroupKey, Vec<usize>>::new();
    for row in 0..table.len() {
        let key = key_columns
            .iter()
            .map(|c| {
                let cell = table.cell(row, c.index);
                (!is_missing(cell)).then(|| cell.to_string())
            })
            .collect();
        groups.entry(key).or_default().push(row);
    }
    groups
}
