//! First-sheet extraction for uploaded transaction spreadsheets.
//!
//! Workbooks (XLSX, XLSM, XLS, ODS) are read with `calamine`; `.csv` files
//! with the `csv` crate. The first non-empty row is the header row, every
//! following non-empty row becomes a [`SheetRow`] keyed by those headers.

use std::io::Cursor;

use calamine::{Data, Reader};
use chrono::NaiveDate;

use crate::error::CoreError;

/// File extensions accepted as workbooks.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A single spreadsheet cell, reduced to the shapes row mapping cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Textual rendering. Whole numbers drop their fractional part so phone
    /// numbers stored as numeric cells come back as digits.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(|d| Cell::Date(d.date()))
                .unwrap_or(Cell::Number(dt.as_f64())),
        }
    }
}

/// One data row: header/cell pairs in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: Vec<(String, Cell)>,
}

impl SheetRow {
    pub fn new(cells: Vec<(String, Cell)>) -> Self {
        Self { cells }
    }

    /// Look a column up by any of `aliases`, ignoring case and surrounding
    /// whitespace. Aliases are tried in order; the first non-empty hit wins.
    pub fn get_any(&self, aliases: &[&str]) -> Option<&Cell> {
        aliases.iter().find_map(|alias| {
            self.cells
                .iter()
                .find(|(header, cell)| header.trim().eq_ignore_ascii_case(alias) && !cell.is_empty())
                .map(|(_, cell)| cell)
        })
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, cell)| cell.is_empty())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Read the first sheet of an uploaded file into data rows.
///
/// The reader is chosen by the file name's extension; anything that is not
/// `.csv` is treated as a workbook.
pub fn read_first_sheet(file_name: &str, bytes: &[u8]) -> Result<Vec<SheetRow>, CoreError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let grid = if extension == "csv" {
        read_csv_grid(bytes)?
    } else {
        read_workbook_grid(bytes)?
    };

    Ok(rows_from_grid(grid))
}

fn read_workbook_grid(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, CoreError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| CoreError::Internal(format!("Unable to open spreadsheet: {e}")))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CoreError::Internal("Spreadsheet contains no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CoreError::Internal(format!("Unable to read sheet '{sheet_name}': {e}")))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(Cell::from).collect())
        .collect())
}

fn read_csv_grid(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, CoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader
        .records()
        .map(|record| {
            record
                .map(|r| {
                    r.iter()
                        .map(|field| {
                            if field.is_empty() {
                                Cell::Empty
                            } else {
                                Cell::Text(field.to_string())
                            }
                        })
                        .collect()
                })
                .map_err(|e| CoreError::Internal(format!("Unable to read CSV: {e}")))
        })
        .collect()
}

/// Turn a raw cell grid into header-keyed rows. Leading blank rows are
/// skipped, as is every blank data row.
fn rows_from_grid(grid: Vec<Vec<Cell>>) -> Vec<SheetRow> {
    let mut rows = grid
        .into_iter()
        .skip_while(|row| row.iter().all(Cell::is_empty));

    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.as_text().unwrap_or_default())
        .collect();

    rows.map(|row| {
        SheetRow::new(
            headers
                .iter()
                .zip(row)
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell))
                .collect(),
        )
    })
    .filter(|row| !row.is_blank())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_first_row_is_header() {
        let csv = b"Mobile Number,Amount,Date\n9876543210,120.5,2026-03-01\n9123456780,80,\n";
        let rows = read_first_sheet("upload.csv", csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get_any(&["mobile number"]),
            Some(&Cell::Text("9876543210".into()))
        );
        assert_eq!(rows[1].get_any(&["Date"]), None);
    }

    #[test]
    fn csv_blank_rows_are_skipped() {
        let csv = b"\n,,\nAmount,Description\n10,a\n,\n20,b\n";
        let rows = read_first_sheet("UPLOAD.CSV", csv).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn header_only_sheet_has_no_rows() {
        let rows = read_first_sheet("upload.csv", b"Amount,Date\n").unwrap();
        assert!(rows.is_empty());
        assert!(read_first_sheet("upload.csv", b"").unwrap().is_empty());
    }

    #[test]
    fn garbage_workbook_is_an_internal_error() {
        let err = read_first_sheet("upload.xlsx", b"definitely not a zip").unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }

    #[test]
    fn alias_lookup_prefers_first_alias_and_skips_empty_cells() {
        let row = SheetRow::new(vec![
            ("Mobile".into(), Cell::Text("111".into())),
            ("mobile_number".into(), Cell::Empty),
            (" MOBILE NUMBER ".into(), Cell::Text("222".into())),
        ]);
        let hit = row.get_any(&["Mobile Number", "mobile_number", "Mobile"]);
        assert_eq!(hit, Some(&Cell::Text("222".into())));
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(9876543210.0).as_text().unwrap(), "9876543210");
        assert_eq!(Cell::Number(12.5).as_text().unwrap(), "12.5");
        assert_eq!(Cell::Text("  ".into()).as_text(), None);
    }
}
