//! Record dispatch: one physical line through its fields and record rules

use crate::config::ValidationConfig;
use crate::field::RecordContext;
use crate::layout::Layout;
use crate::line::{Line, RECORD_LENGTH};
use crate::types::{ErrorDetail, ErrorKind, Severity, ValidationError, ValidationResult};
use tracing::warn;

/// Runs the field pipeline and record rules for each line
#[derive(Debug, Clone, Copy)]
pub struct RecordDispatcher<'l> {
    layout: &'l Layout,
}

impl<'l> RecordDispatcher<'l> {
    /// Dispatcher over a layout
    pub fn new(layout: &'l Layout) -> Self {
        Self { layout }
    }

    /// Validate one line, appending its errors to `result`
    ///
    /// Returns the line's context so the caller can read transformed values
    /// (totals, trailer declarations) before it is dropped.
    pub fn dispatch<'c>(
        &self,
        line: &Line,
        line_number: usize,
        config: &'c ValidationConfig,
        bank_code: Option<&'c str>,
        result: &mut ValidationResult,
    ) -> RecordContext<'c> {
        let record_type = line.record_type();

        if !line.has_tolerated_length() {
            result.push(
                ValidationError::global(
                    ErrorKind::InvalidLineLength,
                    Some(line_number),
                    ErrorDetail::Length {
                        expected_length: RECORD_LENGTH,
                        found_length: line.original_len(),
                    },
                )
                .with_severity(Severity::Field)
                .at(line_number, record_type),
            );
        }

        let mut ctx = RecordContext::new(config, bank_code);
        for spec in self.layout.fields(record_type) {
            let errors = spec.validate(line, &mut ctx);
            result.extend(errors.into_iter().map(|e| e.at(line_number, record_type)));
        }

        for rule in self.layout.rules(record_type) {
            match rule.apply(&ctx) {
                Ok(errors) => {
                    result.extend(errors.into_iter().map(|e| e.at(line_number, record_type)))
                }
                Err(err) => {
                    warn!(line = line_number, rule = rule.name(), error = %err, "Record rule failed");
                    result.push(
                        ValidationError::record(
                            ErrorKind::RecordValidatorException,
                            Severity::Field,
                            ErrorDetail::Message {
                                detail: format!("{}: {}", rule.name(), err),
                            },
                        )
                        .at(line_number, record_type),
                    );
                }
            }
        }

        ctx
    }
}
