//! Validation report: result plus file summary, rendered as text or JSON

use crate::reconciliation::FileTotals;
use crate::types::{Severity, SeverityCounts, ValidationError, ValidationResult};
use crate::Result;
use serde::Serialize;
use std::fmt::Write as _;

/// What the scan saw, independent of the errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Physical lines read
    pub total_lines: usize,
    /// Type-1 records
    pub detail_records: u64,
    /// First line is a header record
    pub header_ok: bool,
    /// Last line is a trailer record
    pub trailer_ok: bool,
    /// Bank code from the header, when present
    pub bank_code: Option<String>,
    /// Detail totals used for reconciliation
    pub totals: FileTotals,
}

/// Outcome of one file run
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Every error found, in report order
    pub result: ValidationResult,
    /// Counts and totals seen by the scan
    pub summary: FileSummary,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    valid: bool,
    errors: Vec<&'a ValidationError>,
    counts: SeverityCounts,
    summary: &'a FileSummary,
}

impl ValidationReport {
    /// Pair a result with its summary
    pub fn new(result: ValidationResult, summary: FileSummary) -> Self {
        Self { result, summary }
    }

    /// True when no error reaches `min_severity`
    pub fn is_valid_at(&self, min_severity: Severity) -> bool {
        self.result.is_valid_at(min_severity)
    }

    /// Errors at or above `min_severity`
    pub fn errors(&self, min_severity: Severity) -> Vec<&ValidationError> {
        self.result.filtered(min_severity)
    }

    /// Pretty JSON `{valid, errors, counts, summary}` filtered by severity
    pub fn to_json(&self, min_severity: Severity) -> Result<String> {
        let report = JsonReport {
            valid: self.is_valid_at(min_severity),
            errors: self.errors(min_severity),
            counts: self.result.count_by_severity(),
            summary: &self.summary,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Human-readable listing filtered by severity
    pub fn render_text(&self, min_severity: Severity) -> String {
        let errors = self.errors(min_severity);
        let mut out = String::new();
        if errors.is_empty() {
            out.push_str("File is valid (no errors within the severity filter).\n");
            return out;
        }
        let _ = writeln!(
            out,
            "Found {} errors (after severity filter):",
            errors.len()
        );
        for error in errors {
            let _ = writeln!(out, "{}", error);
        }
        out
    }
}
