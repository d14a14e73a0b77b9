//! Merging the per-parameter result files of one model run into a single wide
//! table, one column per parameter.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use calamine::Reader;
use log::{info, warn};

use crate::{
    error::{Error, Result},
    table::{ColumnIndex, Table, list_files},
};

/// OSeMOSYS sets the parameter files are joined on, in output order.
pub const SET_COLUMNS: &[&str] = &[
    "YEAR",
    "TECHNOLOGY",
    "TIMESLICE",
    "FUEL",
    "EMISSION",
    "MODE_OF_OPERATION",
    "REGION",
    "SEASON",
    "DAYTYPE",
    "DAILYTIMEBRACKET",
    "STORAGE",
];

const VALUE_COLUMN: &str = "VALUE";

/// Written for sets a parameter is not indexed over.
const ABSENT_DIMENSION: &str = "nan";

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatSummary {
    pub parameters: Vec<String>,
    pub rows: usize,
    pub output: PathBuf,
}

/// Outer-joins every `.csv`/`.xlsx` file of `input_dir` on [`SET_COLUMNS`] and
/// writes the result to `output` (with `.csv` appended when missing).
pub fn concatenate_dir(input_dir: &Path, output: &Path) -> Result<ConcatSummary> {
    let files = list_files(input_dir, &["csv", "xlsx"])?;
    if files.is_empty() {
        return Err(Error::DegenerateInput(format!("no parameter files in {input_dir:?}")));
    }

    let mut parameters = Vec::new();
    let mut merged = BTreeMap::<Vec<String>, Vec<Option<String>>>::new();

    for path in &files {
        info!("Loading {path:?}...");
        let parameter = parameter_name(path);
        let table = read_parameter_table(path)?;
        let value = table.column(VALUE_COLUMN)?;
        let dimensions: Vec<Option<ColumnIndex>> =
            SET_COLUMNS.iter().map(|set| table.find_column(set)).collect();

        let slot = parameters.len();
        for row in 0..table.len() {
            let key = dimensions
                .iter()
                .map(|dim| dim.map_or(ABSENT_DIMENSION, |column| table.cell(row, column)))
                .map(str::to_string)
                .collect();

            let values = merged.entry(key).or_default();
            values.resize(slot + 1, None);
            if values[slot].replace(table.cell(row, value).to_string()).is_some() {
                warn!("{parameter}: repeated set combination in row {}, keeping the last", row + 1);
            }
        }
        parameters.push(parameter);
    }

    let headers = SET_COLUMNS.iter().map(|s| s.to_string()).chain(parameters.iter().cloned());
    let rows: Vec<Vec<String>> = merged
        .into_iter()
        .map(|(mut key, mut values)| {
            values.resize(parameters.len(), None);
            key.extend(values.into_iter().map(Option::unwrap_or_default));
            key
        })
        .collect();
    let row_count = rows.len();

    let output = output_path(output);
    Table::new(headers.collect(), rows).write(&output)?;
    info!("Wrote {} parameters and {row_count} rows to {output:?}", parameters.len());

    Ok(ConcatSummary { parameters, rows: row_count, output })
}

fn parameter_name(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}

fn output_path(output: &Path) -> PathBuf {
    if output.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
        return output.to_path_buf();
    }

    let mut name = output.as_os_str().to_owned();
    name.push(".csv");
    PathBuf::from(name)
}

fn read_parameter_table(path: &Path) -> Result<Table> {
    let is_workbook = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if !is_workbook {
        return Table::read(path);
    }

    let mut workbook = calamine::open_workbook_auto(path).map_err(|e| Error::format(path, e))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::format(path, "workbook has no worksheets"))?
        .map_err(|e| Error::format(path, e))?;

    let mut rows = sheet
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect::<Vec<_>>());
    let headers = rows.next().ok_or_else(|| Error::format(path, "empty worksheet"))?;

    Ok(Table::new(headers, rows.collect()))
}
