//! Bulk order import from tabular rows.
//!
//! Rows are processed independently. A bad row is reported by its spreadsheet row number (header on row 1, so the
//! first data row is row 2) and never stops the rest of the import.
use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

/// How many row errors [`ImportReport::to_admin_text`] lists before summarising the rest.
pub const MAX_LISTED_ERRORS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRow {
    pub order_id: String,
    #[serde(default)]
    pub client_name: String,
    /// Derived from the order id prefix when blank.
    #[serde(default)]
    pub country: String,
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ImportRow {
    pub fn new<S1, S2, S3>(order_id: S1, client_name: S2, status: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            order_id: order_id.into(),
            client_name: client_name.into(),
            country: String::new(),
            status: status.into(),
            note: None,
            phone: None,
        }
    }

    /// Parses a JSON array of row objects.
    pub fn from_json_rows(json: &str) -> Result<Vec<ImportRow>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    /// Spreadsheet-style row number: data index + 2.
    pub row: usize,
    pub order_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub imported: Vec<OrderId>,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }

    pub fn record_success(&mut self, order_id: OrderId) {
        self.succeeded += 1;
        self.imported.push(order_id);
    }

    /// `index` is the zero-based position of the row in the input.
    pub fn record_error<S: Into<String>>(&mut self, index: usize, order_id: &str, reason: S) {
        self.failed += 1;
        self.errors.push(ImportRowError { row: index + 2, order_id: order_id.to_string(), reason: reason.into() });
    }

    pub fn to_admin_text(&self) -> String {
        let mut lines = vec![
            "📊 Import finished:".to_string(),
            format!("✅ Imported: {}", self.succeeded),
            format!("❌ Errors: {}", self.failed),
            format!("📁 Total rows: {}", self.total),
        ];
        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push("Errors:".to_string());
            for error in self.errors.iter().take(MAX_LISTED_ERRORS) {
                lines.push(format!("Row {}: {} ({})", error.row, error.reason, error.order_id));
            }
            if self.errors.len() > MAX_LISTED_ERRORS {
                lines.push(format!("... and {} more", self.errors.len() - MAX_LISTED_ERRORS));
            }
        }
        lines.join("\n")
    }
}
