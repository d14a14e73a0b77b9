//! In-memory CSV tables.
//!
//! Cells are kept as the (trimmed) text found in the file. Numeric meaning is
//! given to a cell only by the code that needs it, so columns this crate does
//! not touch are written back exactly as they were read.

use std::{
    cmp::Ordering,
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::error::{Error, Result};

/// Cell contents that pandas reads as NaN.
const MISSING_MARKERS: &[&str] =
    &["", "nan", "NaN", "NAN", "-nan", "NA", "N/A", "n/a", "<NA>", "#N/A", "null", "NULL", "None"];

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// `Ok(None)` for a missing cell, the parsed value otherwise.
pub fn parse_number(cell: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if is_missing(cell) { Ok(None) } else { cell.trim().parse().map(Some) }
}

/// Decimal places of the number in a cell, measured on its shortest
/// representation ("12.50" has one, "1.25e3" none). Zero for text and
/// missing cells.
pub fn decimal_places(cell: &str) -> usize {
    match parse_number(cell) {
        Ok(Some(value)) if value.is_finite() => value
            .to_string()
            .split_once('.')
            .map_or(0, |(_, decimals)| decimals.len()),
        _ => 0,
    }
}

/// Shortest text that reads back as `value`; missing values become empty cells.
pub fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// How the cells of one column compare when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOrder {
    /// Every present cell parses as a number.
    Numeric,
    Text,
}

impl CellOrder {
    pub fn of_cells<'a>(mut cells: impl Iterator<Item = &'a str>) -> Self {
        if cells.all(|cell| parse_number(cell).is_ok()) { Self::Numeric } else { Self::Text }
    }

    /// Missing cells sort last in either order.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match (is_missing(a), is_missing(b)) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        match (self, parse_number(a), parse_number(b)) {
            (Self::Numeric, Ok(Some(x)), Ok(Some(y))) => x.total_cmp(&y),
            _ => a.cmp(b),
        }
    }
}

/// `;` when the header line contains one, `,` otherwise.
pub fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or_default();
    if first_line.contains(';') { b';' } else { b',' }
}

/// Position of a column that was checked to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnIndex(usize);

impl ColumnIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: u8,
}

impl Table {
    /// Builds a comma separated table. Every row must have one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        Self { headers, rows, delimiter: b',' }
    }

    /// Reads a CSV file, detecting `,` or `;` from its first line.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound { path: path.to_path_buf() });
        }

        let content = fs::read_to_string(path).map_err(|e| Error::format(path, e))?;
        let delimiter = sniff_delimiter(&content);
        Self::from_reader(content.as_bytes(), delimiter, path)
    }

    /// Parses CSV data; `origin` only names the source in error messages.
    pub fn from_reader(reader: impl Read, delimiter: u8, origin: &Path) -> Result<Self> {
        let mut csv_reader =
            ReaderBuilder::new().delimiter(delimiter).trim(Trim::All).from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| Error::format(origin, e))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(Error::format(origin, "no header row"));
        }

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result.map_err(|e| Error::format(origin, e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows, delimiter })
    }

    /// Overwrites `path` using the delimiter the table was read with.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().delimiter(self.delimiter).from_path(path)?;
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn find_column(&self, name: &str) -> Option<ColumnIndex> {
        self.headers.iter().position(|h| h == name).map(ColumnIndex)
    }

    pub fn column(&self, name: &str) -> Result<ColumnIndex> {
        self.find_column(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            available: self.headers.join(", "),
        })
    }

    pub fn cell(&self, row: usize, column: ColumnIndex) -> &str {
        &self.rows[row][column.0]
    }

    pub fn column_cells(&self, column: ColumnIndex) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[column.0].as_str())
    }

    /// Replaces the column called `name`, appending it when it does not exist yet.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> ColumnIndex {
        assert_eq!(values.len(), self.rows.len(), "column length must match row count");

        match self.find_column(name) {
            Some(index) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index.0] = value;
                }
                index
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                ColumnIndex(self.headers.len() - 1)
            }
        }
    }

    /// Stable sort of all rows by every column, left to right. A column sorts
    /// numerically only when all of its present cells are numbers.
    pub fn sort_by_all_columns(&mut self) {
        let orders: Vec<CellOrder> = (0..self.headers.len())
            .map(|column| CellOrder::of_cells(self.column_cells(ColumnIndex(column))))
            .collect();

        self.rows.sort_by(|a, b| {
            orders
                .iter()
                .zip(a.iter().zip(b))
                .map(|(order, (x, y))| order.compare(x, y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

/// Lists the files directly inside `dir` whose extension is one of
/// `extensions`, ordered by file name.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound { path: dir.to_path_buf() });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
