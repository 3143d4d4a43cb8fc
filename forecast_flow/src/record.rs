//! Transaction records and input validation

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Categories accepted on imported rows
pub const ALLOWED_CATEGORIES: [&str; 5] = ["sales", "rent", "salary", "tax", "misc"];

/// Maximum length of a free-text description
pub const MAX_DESCRIPTION_LEN: usize = 120;

/// A transaction as it arrives on the wire, before any validation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionDraft {
    /// Calendar date in `YYYY-MM-DD` form
    pub date: String,
    /// Signed amount; inflows positive, outflows negative
    pub amount: f64,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional category tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A validated transaction ready for aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// Calendar date of the transaction
    pub date: NaiveDate,
    /// Signed amount; inflows positive, outflows negative
    pub amount: f64,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional category tag
    pub category: Option<String>,
}

impl TransactionRecord {
    /// Convenience constructor for a dated amount without metadata
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self {
            date,
            amount,
            description: None,
            category: None,
        }
    }
}

/// Parse a date that must be in strict `YYYY-MM-DD` form.
///
/// chrono alone would also accept unpadded forms like `2024-1-5`,
/// so the shape is checked explicitly first.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let shaped = trimmed.len() == 10
        && trimmed.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(ForecastError::Validation(format!(
            "invalid date '{raw}', expected YYYY-MM-DD"
        )));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ForecastError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// Validate a batch of drafts strictly, failing on the first bad row.
///
/// This is the path used for API payloads: a single malformed row
/// rejects the whole request.
pub fn parse_records(drafts: &[TransactionDraft]) -> Result<Vec<TransactionRecord>> {
    let mut records = Vec::with_capacity(drafts.len());
    for (index, draft) in drafts.iter().enumerate() {
        let date = parse_iso_date(&draft.date)
            .map_err(|_| ForecastError::Validation(format!(
                "row {index}: invalid date '{}', expected YYYY-MM-DD",
                draft.date
            )))?;
        if !draft.amount.is_finite() {
            return Err(ForecastError::Validation(format!(
                "row {index}: amount must be a finite number"
            )));
        }
        records.push(TransactionRecord {
            date,
            amount: draft.amount,
            description: draft.description.clone(),
            category: draft.category.clone(),
        });
    }
    Ok(records)
}

/// One raw CSV row; amounts stay textual so a bad cell rejects the row
/// rather than the whole file
#[derive(Debug, Clone, Deserialize)]
struct CsvRow {
    date: String,
    amount: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// A row rejected during CSV import, with every reason it failed
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// Zero-based data row index (header excluded)
    pub index: usize,
    /// All validation failures found on the row
    pub reasons: Vec<String>,
}

/// Result of a lenient CSV import: valid rows kept, bad rows reported
#[derive(Debug, Clone, Default)]
pub struct CsvImport {
    /// Rows that passed every check, in file order
    pub accepted: Vec<TransactionRecord>,
    /// Rows that failed at least one check
    pub rejected: Vec<RowError>,
}

/// Load transactions from a CSV file with `date,amount[,description][,category]`
/// columns. Rows are validated independently; the import only fails as a
/// whole when the file itself cannot be read or parsed.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<CsvImport> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut import = CsvImport::default();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        match validate_row(index, &row) {
            Ok(record) => import.accepted.push(record),
            Err(error) => import.rejected.push(error),
        }
    }
    Ok(import)
}

/// Apply the per-row import rules, collecting every failure reason
fn validate_row(index: usize, row: &CsvRow) -> std::result::Result<TransactionRecord, RowError> {
    let mut reasons = Vec::new();

    let date = match parse_iso_date(&row.date) {
        Ok(date) => Some(date),
        Err(_) => {
            reasons.push(format!("invalid date '{}', expected YYYY-MM-DD", row.date));
            None
        }
    };

    let amount = match row.amount.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            reasons.push(format!("invalid amount '{}'", row.amount));
            None
        }
    };

    let description = row
        .description
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    if let Some(text) = description {
        if text.chars().count() > MAX_DESCRIPTION_LEN {
            reasons.push(format!(
                "description longer than {MAX_DESCRIPTION_LEN} characters"
            ));
        }
    }

    let category = row
        .category
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_lowercase);
    if let Some(tag) = category.as_deref() {
        if !ALLOWED_CATEGORIES.contains(&tag) {
            reasons.push(format!(
                "unknown category '{tag}', expected one of {}",
                ALLOWED_CATEGORIES.join(", ")
            ));
        }
    }

    if !reasons.is_empty() {
        return Err(RowError { index, reasons });
    }

    Ok(TransactionRecord {
        // Both unwraps guarded by the reasons check above
        date: date.unwrap(),
        amount: amount.unwrap(),
        description: description.map(str::to_string),
        category,
    })
}
