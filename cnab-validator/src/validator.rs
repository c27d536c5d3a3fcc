//! File-level validation
//!
//! A single sequential pass: every line goes through the record dispatcher,
//! then detail totals, the sequence tracker and the trailer declaration are
//! updated from the line's context. Structural checks, sequence errors and
//! trailer reconciliation are appended after the last line, in that order.

use crate::config::ValidationConfig;
use crate::dispatcher::RecordDispatcher;
use crate::layout::{Layout, DETAIL, HEADER, TRAILER};
use crate::line::{read_lines, Line};
use crate::reconciliation::{reconcile, tolerance_from_cents, FileTotals, TrailerDeclaration};
use crate::report::{FileSummary, ValidationReport};
use crate::types::{ErrorDetail, ErrorKind, ValidationError, ValidationResult};
use crate::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Strictly increasing sequence-number tracker
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceTracker {
    previous: u64,
}

impl SequenceTracker {
    /// Record a value; returns an error when it does not exceed the previous one
    ///
    /// The tracker always moves to the observed value, so one out-of-order
    /// number yields one error.
    pub fn observe(&mut self, line: usize, found: u64) -> Option<ValidationError> {
        let previous = self.previous;
        self.previous = found;
        if found <= previous {
            Some(ValidationError::global(
                ErrorKind::NonIncreasingSequencialRegistro,
                Some(line),
                ErrorDetail::Sequence { found, previous },
            ))
        } else {
            None
        }
    }
}

/// Validates whole files against a layout
#[derive(Debug, Clone)]
pub struct FileValidator<'l> {
    layout: &'l Layout,
    config: ValidationConfig,
}

impl<'l> FileValidator<'l> {
    /// Validator for `layout` with a run configuration
    pub fn new(layout: &'l Layout, config: ValidationConfig) -> Self {
        Self { layout, config }
    }

    /// Run configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Layout in use
    pub fn layout(&self) -> &'l Layout {
        self.layout
    }

    /// Validate a file on disk
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<ValidationReport> {
        let path = path.as_ref();
        info!(path = %path.display(), layout = self.layout.name(), "Validating file");
        let file = File::open(path)?;
        self.validate_reader(BufReader::new(file))
    }

    /// Validate an in-memory file
    pub fn validate_bytes(&self, bytes: &[u8]) -> Result<ValidationReport> {
        self.validate_reader(bytes)
    }

    /// Validate a byte stream
    pub fn validate_reader<R: BufRead>(&self, reader: R) -> Result<ValidationReport> {
        self.config.validate()?;

        let dispatcher = RecordDispatcher::new(self.layout);
        let (seq_start, seq_end) = self.layout.sequence_field();
        let mut result = ValidationResult::new();
        let mut totals = FileTotals::default();
        let mut sequence = SequenceTracker::default();
        let mut sequence_errors = Vec::new();
        let mut trailer: Option<TrailerDeclaration> = None;
        let mut bank_code: Option<String> = None;
        let mut first_type: Option<char> = None;
        let mut last_type: Option<char> = None;
        let mut total_lines = 0usize;

        for (index, line) in read_lines(reader).enumerate() {
            let line = line?;
            let line_number = index + 1;
            let record_type = line.record_type();
            total_lines = line_number;

            if line_number == 1 {
                first_type = record_type;
                if record_type == Some(HEADER) {
                    bank_code = self.detect_bank_code(&line);
                    debug!(bank_code = ?bank_code, "Detected bank code");
                }
            }
            last_type = record_type;

            let ctx = dispatcher.dispatch(
                &line,
                line_number,
                &self.config,
                bank_code.as_deref(),
                &mut result,
            );

            match record_type {
                Some(DETAIL) => totals.add_detail(&ctx),
                Some(TRAILER) => trailer = Some(TrailerDeclaration::from_context(line_number, &ctx)),
                _ => {}
            }

            if line.is_full_length() {
                if let Some(found) = parse_sequence(&line.slice(seq_start, seq_end)) {
                    sequence_errors.extend(sequence.observe(line_number, found));
                }
            }
        }

        if total_lines == 0 {
            warn!("Empty file");
            result.push(ValidationError::global(ErrorKind::EmptyFile, None, ErrorDetail::Empty {}));
            return Ok(ValidationReport::new(result, FileSummary::default()));
        }

        let header_ok = first_type == Some(HEADER);
        let trailer_ok = last_type == Some(TRAILER);
        let mut structural = Vec::new();
        if !header_ok {
            structural.push(ErrorKind::MissingHeaderFirstLine);
        }
        if !trailer_ok {
            structural.push(ErrorKind::MissingTrailerLastLine);
        }
        if totals.detail_records == 0 {
            structural.push(ErrorKind::NoDetailRecordsTipo1);
        }
        for kind in structural {
            warn!(kind = %kind, "Structural error");
            result.push(ValidationError::global(kind, None, ErrorDetail::Empty {}));
        }

        if !sequence_errors.is_empty() {
            warn!(count = sequence_errors.len(), "Non-increasing sequence numbers");
        }
        result.extend(sequence_errors);

        if let Some(trailer) = &trailer {
            let tolerance = tolerance_from_cents(self.config.tolerance_cents);
            result.extend(reconcile(trailer, &totals, total_lines, tolerance));
        }

        let counts = result.count_by_severity();
        info!(
            lines = total_lines,
            details = totals.detail_records,
            fatal = counts.fatal,
            business = counts.business,
            field = counts.field,
            "Validation finished"
        );

        let summary = FileSummary {
            total_lines,
            detail_records: totals.detail_records,
            header_ok,
            trailer_ok,
            bank_code,
            totals,
        };
        Ok(ValidationReport::new(result, summary))
    }

    fn detect_bank_code(&self, line: &Line) -> Option<String> {
        let (start, end) = self.layout.bank_code_field();
        let code = line.slice(start, end);
        let code = code.trim();
        if code.is_empty() {
            None
        } else {
            Some(code.to_string())
        }
    }
}

// Blank or non-numeric values are not sequence numbers
fn parse_sequence(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Validate a file with the built-in Bradesco CNAB400 layout
pub fn validate_file(path: impl AsRef<Path>, config: &ValidationConfig) -> Result<ValidationReport> {
    FileValidator::new(Layout::bradesco_cnab400(), config.clone()).validate_path(path)
}
