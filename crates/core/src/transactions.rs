//! Mapping from spreadsheet rows to the transaction payload sent to the
//! processing backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::spreadsheet::{Cell, SheetRow};

// ── Header aliases ───────────────────────────────────────────────────

pub const MOBILE_NUMBER_HEADERS: &[&str] = &["Mobile Number", "mobile_number", "Mobile"];
pub const AMOUNT_HEADERS: &[&str] = &["Amount", "amount"];
pub const DATE_HEADERS: &[&str] = &["Date", "transaction_date", "Transaction Date"];
pub const DESCRIPTION_HEADERS: &[&str] = &["Description", "description"];

/// Description used when a row carries none.
pub const DEFAULT_DESCRIPTION: &str = "Excel Upload";

/// Text date layouts tried in order. Day-first wins over month-first when
/// both would parse.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// A single loyalty transaction extracted from an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub mobile_number: String,
    pub amount: f64,
    pub transaction_date: NaiveDate,
    pub description: String,
}

impl TransactionRow {
    /// Build a transaction from a sheet row, applying the column defaults.
    /// `today` stands in for a missing or unreadable date.
    pub fn from_row(row: &SheetRow, today: NaiveDate) -> Self {
        let mobile_number = row
            .get_any(MOBILE_NUMBER_HEADERS)
            .and_then(Cell::as_text)
            .unwrap_or_default();

        let amount = row.get_any(AMOUNT_HEADERS).map(parse_amount).unwrap_or(0.0);

        let transaction_date = row
            .get_any(DATE_HEADERS)
            .and_then(parse_date)
            .unwrap_or(today);

        let description = row
            .get_any(DESCRIPTION_HEADERS)
            .and_then(Cell::as_text)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Self {
            mobile_number,
            amount,
            transaction_date,
            description,
        }
    }
}

/// Map every row, preserving count and order.
pub fn map_rows(rows: &[SheetRow], today: NaiveDate) -> Vec<TransactionRow> {
    rows.iter().map(|row| TransactionRow::from_row(row, today)).collect()
}

/// Numeric value of an amount cell. Anything unreadable or non-finite is 0.
pub fn parse_amount(cell: &Cell) -> f64 {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Largest Excel serial day, 9999-12-31.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Calendar date of a date cell, if it can be read.
///
/// Numeric cells are Excel serial days (a date column saved without a date
/// format); the time-of-day fraction is dropped.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date_text(s.trim()),
        Cell::Number(n) => date_from_excel_serial(*n),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

/// Counting from 1899-12-30 matches Excel for every serial after
/// February 1900, past its phantom 1900-02-29.
fn date_from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
