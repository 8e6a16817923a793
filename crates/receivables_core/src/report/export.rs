//! Flat tabular export of titles with derived status.
//!
//! # Invariants
//! - Column order is fixed: `title_id,customer,amount,issue_date,due_date,status,paid_date`.
//! - Rows are ordered by due date, then title id.
//! - `paid_date` is an empty field for unpaid titles.

use super::status::{title_status, TitleStatus};
use crate::model::title::TitleId;
use crate::repo::title_repo::TitleWithCustomer;
use chrono::NaiveDate;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;

/// One exported line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub title_id: TitleId,
    pub customer: String,
    pub amount: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: TitleStatus,
    pub paid_date: Option<NaiveDate>,
}

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(err) => write!(f, "csv export failed: {err}"),
            Self::Io(err) => write!(f, "export write failed: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub fn build_export_rows(titles: &[TitleWithCustomer], today: NaiveDate) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = titles
        .iter()
        .map(|row| ExportRow {
            title_id: row.title.id,
            customer: row.customer_name.clone(),
            amount: row.title.amount.to_string(),
            issue_date: row.title.issue_date,
            due_date: row.title.due_date,
            status: title_status(&row.title, today),
            paid_date: row.title.paid_date,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.title_id.cmp(&b.title_id))
    });
    rows
}

/// Writes `rows` as CSV with a header line and returns the number of data rows.
pub fn write_csv<W: Write>(writer: W, rows: &[ExportRow]) -> Result<usize, ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record([
        "title_id",
        "customer",
        "amount",
        "issue_date",
        "due_date",
        "status",
        "paid_date",
    ])?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(rows.len())
}
