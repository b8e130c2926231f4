//! In-memory tabular source.
//!
//! A [`Sheet`] is one spreadsheet: a header row and string cells, indexed
//! by AphiaID. Workbooks (`.xlsx`, `.xls` and friends) are read from their
//! first worksheet. Files ending in `.tsv` or `.txt` are tab separated and
//! everything else is read as comma separated, with cells decoded lossily
//! so a file saved in a legacy encoding still loads.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use seatrait_core::{AphiaId, Error, Result};

/// Cells read as null.
const NULL_MARKERS: &[&str] = &["", "nan", "na", "n/a", "null", "none"];

/// True when a raw cell holds no value.
pub fn is_null_cell(cell: &str) -> bool {
    let cell = cell.trim();
    NULL_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m))
}

/// Parse an AphiaID written as an integer or an integral float (`148984.0`).
pub fn parse_key(cell: &str) -> Option<AphiaId> {
    let cell = cell.trim();
    if let Ok(key) = cell.parse::<AphiaId>() {
        return Some(key);
    }
    let value = cell.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as AphiaId)
    } else {
        None
    }
}

/// Reduce a header to lowercase ASCII so that the same logical column
/// matches whatever code point encodes its unit suffix.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii)
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// On-disk layout of a tabular source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// Spreadsheet workbook; the first worksheet is read.
    Workbook,
    /// Delimited text with the given field separator.
    Delimited(u8),
}

/// Layout inferred from the file extension.
pub fn format_for(path: &Path) -> SheetFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            SheetFormat::Workbook
        }
        Some("tsv") | Some("txt") | Some("tab") => SheetFormat::Delimited(b'\t'),
        _ => SheetFormat::Delimited(b','),
    }
}

/// A workbook cell as text; empty and error cells are null.
fn workbook_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        other => Some(other.to_string()),
    }
}

/// A raw cell with null markers mapped to `None`.
fn clean_cell(cell: &str) -> Option<String> {
    if is_null_cell(cell) {
        None
    } else {
        Some(cell.trim().to_string())
    }
}

/// A loaded tabular source.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    keys: Vec<Option<AphiaId>>,
    index: HashMap<AphiaId, Vec<usize>>,
}

impl Sheet {
    /// A sheet with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a source from disk, choosing the reader by extension.
    ///
    /// `key_columns` lists candidate names of the AphiaID column; the first
    /// header equal to one of them is used. A source with none of them is
    /// an error.
    pub fn from_path(path: &Path, key_columns: &[&str]) -> Result<Self> {
        match format_for(path) {
            SheetFormat::Workbook => Self::from_workbook(path, key_columns),
            SheetFormat::Delimited(delimiter) => {
                let file = std::fs::File::open(path)?;
                Self::from_reader(file, delimiter, key_columns)
            }
        }
    }

    /// Read the first worksheet of a workbook.
    pub fn from_workbook(path: &Path, key_columns: &[&str]) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|e| Error::Source(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Source(format!("{} has no worksheets", path.display())))?
            .map_err(|e| Error::Source(e.to_string()))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| workbook_cell(cell).unwrap_or_default().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let cells = rows.map(|row| -> Result<Vec<Option<String>>> {
            Ok(row
                .iter()
                .map(|cell| workbook_cell(cell).and_then(|c| clean_cell(&c)))
                .collect())
        });

        Self::from_rows(headers, cells, key_columns)
    }

    /// Read a delimited export from any reader.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8, key_columns: &[&str]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| Error::Source(e.to_string()))?
            .iter()
            .map(|h| {
                String::from_utf8_lossy(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let cells = reader
            .into_byte_records()
            .map(|record| -> Result<Vec<Option<String>>> {
                let record = record.map_err(|e| Error::Source(e.to_string()))?;
                Ok(record
                    .iter()
                    .map(|cell| clean_cell(&String::from_utf8_lossy(cell)))
                    .collect())
            });

        Self::from_rows(headers, cells, key_columns)
    }

    fn from_rows<I>(headers: Vec<String>, rows: I, key_columns: &[&str]) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Vec<Option<String>>>>,
    {
        let key_index = key_columns
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
            .ok_or_else(|| {
                Error::Source(format!("no key column among {}", key_columns.join(", ")))
            })?;

        let mut sheet = Sheet {
            headers,
            ..Default::default()
        };

        for cells in rows {
            let mut cells = cells?;
            cells.resize(sheet.headers.len(), None);

            let key = cells
                .get(key_index)
                .cloned()
                .flatten()
                .and_then(|cell| parse_key(&cell));
            if let Some(key) = key {
                sheet.index.entry(key).or_default().push(sheet.rows.len());
            }
            sheet.keys.push(key);
            sheet.rows.push(cells);
        }

        debug!(
            subsystem = "lookup",
            component = "sheet",
            op = "load",
            columns = sheet.headers.len(),
            result_count = sheet.rows.len(),
            "Sheet parsed"
        );
        Ok(sheet)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct keys across all rows.
    pub fn unique_keys(&self) -> usize {
        self.index.len()
    }

    /// Position of the column named exactly `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of the first column whose header satisfies `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| pred(h))
    }

    /// Rows carrying `key`, in file order.
    pub fn rows_for(&self, key: AphiaId) -> Vec<SheetRow<'_>> {
        self.index
            .get(&key)
            .map(|positions| positions.iter().map(|&i| self.row(i)).collect())
            .unwrap_or_default()
    }

    /// All rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = SheetRow<'_>> {
        (0..self.rows.len()).map(move |i| self.row(i))
    }

    fn row(&self, i: usize) -> SheetRow<'_> {
        SheetRow {
            cells: &self.rows[i],
            key: self.keys[i],
        }
    }
}

/// A borrowed row of a [`Sheet`].
#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    cells: &'a [Option<String>],
    key: Option<AphiaId>,
}

impl<'a> SheetRow<'a> {
    pub fn key(&self) -> Option<AphiaId> {
        self.key
    }

    /// Non-null cell at a column position.
    pub fn cell(&self, column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|i| self.cells.get(i))
            .and_then(|c| c.as_deref())
    }

    /// Cell at a column position read as a number; text that does not parse
    /// is treated as null.
    pub fn number(&self, column: Option<usize>) -> Option<f64> {
        self.cell(column)
            .and_then(|c| c.parse::<f64>().ok())
            .filter(|v| !v.is_nan())
    }

    pub fn owned(&self, column: Option<usize>) -> Option<String> {
        self.cell(column).map(str::to_string)
    }
}
