//! Trailer reconciliation
//!
//! Detail amounts are accumulated as exact 2-decimal values and compared with
//! the totals the trailer declares. A declared total of exactly zero is not
//! asserted and never compared.

use crate::field::RecordContext;
use crate::types::{ErrorDetail, ErrorKind, ValidationError};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

/// Running totals over the detail records of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTotals {
    /// Number of type-1 records
    pub detail_records: u64,
    /// Sum of `valor_titulo`
    pub principal: Decimal,
    /// Sum of `valor_abatimento`
    pub rebate: Decimal,
    /// Sum of `valor_desconto`
    pub discount: Decimal,
    /// Sum of `juros_dia`
    pub interest: Decimal,
    /// Sum of `valor_iof`
    pub iof: Decimal,
    /// Other charges; no detail field feeds it, so it stays zero
    pub other: Decimal,
}

impl Default for FileTotals {
    fn default() -> Self {
        Self {
            detail_records: 0,
            principal: Decimal::new(0, 2),
            rebate: Decimal::new(0, 2),
            discount: Decimal::new(0, 2),
            interest: Decimal::new(0, 2),
            iof: Decimal::new(0, 2),
            other: Decimal::new(0, 2),
        }
    }
}

impl FileTotals {
    /// Count a detail record and add its transformed amounts
    pub fn add_detail(&mut self, ctx: &RecordContext<'_>) {
        let amount = |name: &str| ctx.amount(name).ok().flatten().unwrap_or(Decimal::ZERO);
        self.detail_records += 1;
        self.principal += amount("valor_titulo");
        self.rebate += amount("valor_abatimento");
        self.discount += amount("valor_desconto");
        self.interest += amount("juros_dia");
        self.iof += amount("valor_iof");
    }
}

/// Declared record count as found in the trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredCount {
    /// Field left blank or not part of the layout
    NotAsserted,
    /// Field present but not a number
    Invalid,
    /// Parsed value
    Value(u64),
}

/// Values declared by the trailer record, captured before its context is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailerDeclaration {
    /// Trailer line number
    pub line: usize,
    /// `total_registros`
    pub total_records: DeclaredCount,
    /// `total_titulos_cobranca`
    pub detail_records: Option<u64>,
    /// `valor_total_titulos`
    pub principal: Option<Decimal>,
    /// `valor_total_abatimentos`
    pub rebate: Option<Decimal>,
    /// `valor_total_descontos`
    pub discount: Option<Decimal>,
    /// `valor_total_juros`
    pub interest: Option<Decimal>,
    /// `valor_total_iof`
    pub iof: Option<Decimal>,
    /// `valor_total_outros`
    pub other: Option<Decimal>,
}

impl TrailerDeclaration {
    /// Capture the trailer values from its line context
    pub fn from_context(line: usize, ctx: &RecordContext<'_>) -> Self {
        let total_records = match ctx.raw("total_registros") {
            Some(raw) if !raw.trim().is_empty() => match ctx.integer("total_registros") {
                Ok(Some(value)) => DeclaredCount::Value(value),
                _ => DeclaredCount::Invalid,
            },
            _ => DeclaredCount::NotAsserted,
        };
        let amount = |name: &str| ctx.amount(name).ok().flatten();
        Self {
            line,
            total_records,
            detail_records: ctx.integer("total_titulos_cobranca").ok().flatten(),
            principal: amount("valor_total_titulos"),
            rebate: amount("valor_total_abatimentos"),
            discount: amount("valor_total_descontos"),
            interest: amount("valor_total_juros"),
            iof: amount("valor_total_iof"),
            other: amount("valor_total_outros"),
        }
    }
}

/// Tolerance in currency units for a tolerance in cents
pub fn tolerance_from_cents(cents: u64) -> Decimal {
    Decimal::new(i64::try_from(cents).unwrap_or(i64::MAX), 2)
}

/// Mismatch payload when `declared` and `summed` differ by more than `tolerance`
///
/// Returns `None` when `declared` is zero (not asserted).
pub fn compare_amount(declared: Decimal, summed: Decimal, tolerance: Decimal) -> Option<ErrorDetail> {
    if declared.is_zero() {
        return None;
    }
    let diff = (declared - summed).abs();
    if diff > tolerance {
        Some(ErrorDetail::Amount {
            declared,
            summed,
            diff,
            tolerance,
        })
    } else {
        None
    }
}

/// Cross-check the trailer against what the scan counted and summed
pub fn reconcile(
    trailer: &TrailerDeclaration,
    totals: &FileTotals,
    physical_lines: usize,
    tolerance: Decimal,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let line = Some(trailer.line);

    match trailer.total_records {
        DeclaredCount::NotAsserted => {}
        DeclaredCount::Invalid => {
            errors.push(ValidationError::global(
                ErrorKind::TrailerTotalRegistrosInvalid,
                line,
                ErrorDetail::Empty {},
            ));
        }
        DeclaredCount::Value(declared) => {
            if declared != physical_lines as u64 {
                errors.push(ValidationError::global(
                    ErrorKind::TrailerTotalRegistrosMismatch,
                    line,
                    ErrorDetail::Count {
                        declared,
                        found: physical_lines as u64,
                    },
                ));
            }
        }
    }

    if let Some(declared) = trailer.detail_records {
        if declared != 0 && declared != totals.detail_records {
            errors.push(ValidationError::global(
                ErrorKind::TrailerTotalTitulosMismatch,
                line,
                ErrorDetail::Count {
                    declared,
                    found: totals.detail_records,
                },
            ));
        }
    }

    let amounts = [
        (ErrorKind::TrailerValorTotalTitulosMismatch, trailer.principal, totals.principal),
        (ErrorKind::TrailerTotalAbatimentoMismatch, trailer.rebate, totals.rebate),
        (ErrorKind::TrailerTotalDescontosMismatch, trailer.discount, totals.discount),
        (ErrorKind::TrailerTotalJurosMismatch, trailer.interest, totals.interest),
        (ErrorKind::TrailerTotalIofMismatch, trailer.iof, totals.iof),
        (ErrorKind::TrailerTotalOutrosMismatch, trailer.other, totals.other),
    ];
    for (kind, declared, summed) in amounts {
        let Some(declared) = declared else { continue };
        match compare_amount(declared, summed, tolerance) {
            Some(detail) => {
                debug!(kind = %kind, %declared, %summed, "Trailer total mismatch");
                errors.push(ValidationError::global(kind, line, detail));
            }
            None => debug!(kind = %kind, %declared, %summed, "Trailer total reconciled"),
        }
    }

    errors
}
