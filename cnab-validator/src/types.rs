//! Result model: classified validation errors and their ordered collection

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field marker used for errors raised by record-level rules
pub const RECORD_MARKER: &str = "__record__";

/// Error severity
///
/// Ordered from most to least severe: `Fatal < Business < Field`. Filtering
/// with a minimum severity keeps every error that sorts at or before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Structural defect; the file cannot be interpreted in that respect
    Fatal,
    /// Cross-field or cross-record domain rule violation
    Business,
    /// Single-field syntactic defect
    Field,
}

impl Severity {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Business => "business",
            Severity::Field => "field",
        }
    }

    /// True when `self` is at least as severe as `threshold`
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        *self <= threshold
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Field
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Severity::Fatal),
            "business" => Ok(Severity::Business),
            "field" => Ok(Severity::Field),
            other => Err(crate::Error::Config(format!("unknown severity '{}'", other))),
        }
    }
}

/// Error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Field pipeline
    InvalidLength,
    RequiredBlank,
    UnexpectedValue,
    PatternMismatch,
    TransformError,
    BusinessRule,

    // Line and record level
    InvalidLineLength,
    RecordValidatorException,
    DataVencimentoMenorEmissao,
    DataDesconto1MaiorVencimento,
    DataDesconto1MenorEmissao,
    DataDesconto2MaiorVencimento,
    DataDesconto2MenorEmissao,
    Desconto2AnteriorDesconto1,
    NossoNumeroDvInvalido,
    TelefoneIncompleto,

    // File level
    EmptyFile,
    MissingHeaderFirstLine,
    MissingTrailerLastLine,
    NoDetailRecordsTipo1,
    NonIncreasingSequencialRegistro,
    TrailerTotalRegistrosMismatch,
    TrailerTotalRegistrosInvalid,
    TrailerTotalTitulosMismatch,
    TrailerValorTotalTitulosMismatch,
    TrailerTotalAbatimentoMismatch,
    TrailerTotalDescontosMismatch,
    TrailerTotalJurosMismatch,
    TrailerTotalIofMismatch,
    TrailerTotalOutrosMismatch,
}

impl ErrorKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidLength => "invalid_length",
            ErrorKind::RequiredBlank => "required_blank",
            ErrorKind::UnexpectedValue => "unexpected_value",
            ErrorKind::PatternMismatch => "pattern_mismatch",
            ErrorKind::TransformError => "transform_error",
            ErrorKind::BusinessRule => "business_rule",
            ErrorKind::InvalidLineLength => "invalid_line_length",
            ErrorKind::RecordValidatorException => "record_validator_exception",
            ErrorKind::DataVencimentoMenorEmissao => "data_vencimento_menor_emissao",
            ErrorKind::DataDesconto1MaiorVencimento => "data_desconto1_maior_vencimento",
            ErrorKind::DataDesconto1MenorEmissao => "data_desconto1_menor_emissao",
            ErrorKind::DataDesconto2MaiorVencimento => "data_desconto2_maior_vencimento",
            ErrorKind::DataDesconto2MenorEmissao => "data_desconto2_menor_emissao",
            ErrorKind::Desconto2AnteriorDesconto1 => "desconto2_anterior_desconto1",
            ErrorKind::NossoNumeroDvInvalido => "nosso_numero_dv_invalido",
            ErrorKind::TelefoneIncompleto => "telefone_incompleto",
            ErrorKind::EmptyFile => "empty_file",
            ErrorKind::MissingHeaderFirstLine => "missing_header_first_line",
            ErrorKind::MissingTrailerLastLine => "missing_trailer_last_line",
            ErrorKind::NoDetailRecordsTipo1 => "no_detail_records_tipo1",
            ErrorKind::NonIncreasingSequencialRegistro => "non_increasing_sequencial_registro",
            ErrorKind::TrailerTotalRegistrosMismatch => "trailer_total_registros_mismatch",
            ErrorKind::TrailerTotalRegistrosInvalid => "trailer_total_registros_invalid",
            ErrorKind::TrailerTotalTitulosMismatch => "trailer_total_titulos_mismatch",
            ErrorKind::TrailerValorTotalTitulosMismatch => "trailer_valor_total_titulos_mismatch",
            ErrorKind::TrailerTotalAbatimentoMismatch => "trailer_total_abatimento_mismatch",
            ErrorKind::TrailerTotalDescontosMismatch => "trailer_total_descontos_mismatch",
            ErrorKind::TrailerTotalJurosMismatch => "trailer_total_juros_mismatch",
            ErrorKind::TrailerTotalIofMismatch => "trailer_total_iof_mismatch",
            ErrorKind::TrailerTotalOutrosMismatch => "trailer_total_outros_mismatch",
        }
    }

    /// Structural kinds that are always fatal
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyFile
                | ErrorKind::MissingHeaderFirstLine
                | ErrorKind::MissingTrailerLastLine
                | ErrorKind::NoDetailRecordsTipo1
                | ErrorKind::NonIncreasingSequencialRegistro
                | ErrorKind::TrailerTotalRegistrosInvalid
        )
    }

    /// Severity assigned to file-level errors of this kind
    pub fn global_severity(&self) -> Severity {
        if self.is_structural() {
            Severity::Fatal
        } else {
            Severity::Business
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload, flattened into the serialized error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    /// No payload
    Empty {},
    /// Extracted width differs from the declared width
    Length {
        expected_length: usize,
        found_length: usize,
    },
    /// Value outside the allowed set (sorted)
    Allowed { expected: Vec<String>, found: String },
    /// Value does not fully match the pattern
    Pattern { pattern: String, found: String },
    /// Transform failed
    Transform { detail: String, raw: String },
    /// Cross-field rule message
    Rule { detail: String, found: String },
    /// Free-form message
    Message { detail: String },
    /// Offending text only
    Found { found: String },
    /// Check digit mismatch
    CheckDigit { expected: char, found: char },
    /// Due date before issue date
    IssueDue {
        emissao: NaiveDate,
        vencimento: NaiveDate,
    },
    /// Discount date outside `[emissao, vencimento]`
    DiscountDate { desconto: NaiveDate, limite: NaiveDate },
    /// Second discount date before the first
    Discounts {
        desconto1: NaiveDate,
        desconto2: NaiveDate,
    },
    /// Sequence number did not increase
    Sequence { found: u64, previous: u64 },
    /// Declared count differs from the counted value
    Count { declared: u64, found: u64 },
    /// Declared monetary total differs from the summed value beyond tolerance
    Amount {
        declared: Decimal,
        summed: Decimal,
        diff: Decimal,
        tolerance: Decimal,
    },
}

impl ErrorDetail {
    /// Offending value, when the payload carries one
    pub fn found(&self) -> Option<String> {
        match self {
            ErrorDetail::Length { found_length, .. } => Some(found_length.to_string()),
            ErrorDetail::Allowed { found, .. }
            | ErrorDetail::Pattern { found, .. }
            | ErrorDetail::Rule { found, .. }
            | ErrorDetail::Found { found } => Some(found.clone()),
            ErrorDetail::Transform { raw, .. } => Some(raw.clone()),
            ErrorDetail::CheckDigit { found, .. } => Some(found.to_string()),
            ErrorDetail::Sequence { found, .. } | ErrorDetail::Count { found, .. } => {
                Some(found.to_string())
            }
            ErrorDetail::Amount { summed, .. } => Some(summed.to_string()),
            _ => None,
        }
    }

    /// Expected value, when the payload carries one
    pub fn expected(&self) -> Option<String> {
        match self {
            ErrorDetail::Length { expected_length, .. } => Some(expected_length.to_string()),
            ErrorDetail::Allowed { expected, .. } => Some(expected.join("|")),
            ErrorDetail::Pattern { pattern, .. } => Some(pattern.clone()),
            ErrorDetail::CheckDigit { expected, .. } => Some(expected.to_string()),
            ErrorDetail::Count { declared, .. } => Some(declared.to_string()),
            ErrorDetail::Amount { declared, .. } => Some(declared.to_string()),
            _ => None,
        }
    }
}

/// A single classified violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// 1-based physical line number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Record type code of the line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_type: Option<char>,

    /// Field name, or [`RECORD_MARKER`] for record-level rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Error kind
    #[serde(rename = "error")]
    pub kind: ErrorKind,

    /// Severity
    pub severity: Severity,

    /// Byte positions, `SSS-EEE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,

    /// Kind-specific payload
    #[serde(flatten)]
    pub detail: ErrorDetail,
}

impl ValidationError {
    /// Error for a single field at `[start, end]`
    pub fn field(
        name: &str,
        start: usize,
        end: usize,
        kind: ErrorKind,
        severity: Severity,
        detail: ErrorDetail,
    ) -> Self {
        Self {
            line: None,
            record_type: None,
            field: Some(name.to_string()),
            kind,
            severity,
            position: Some(format_position(start, end)),
            detail,
        }
    }

    /// Error raised by a record-level rule
    pub fn record(kind: ErrorKind, severity: Severity, detail: ErrorDetail) -> Self {
        Self {
            line: None,
            record_type: None,
            field: Some(RECORD_MARKER.to_string()),
            kind,
            severity,
            position: None,
            detail,
        }
    }

    /// File-level error; severity follows the kind's classification
    pub fn global(kind: ErrorKind, line: Option<usize>, detail: ErrorDetail) -> Self {
        Self {
            line,
            record_type: None,
            field: None,
            kind,
            severity: kind.global_severity(),
            position: None,
            detail,
        }
    }

    /// Attach line number and record type
    pub fn at(mut self, line: usize, record_type: Option<char>) -> Self {
        self.line = Some(line);
        self.record_type = record_type;
        self
    }

    /// Override severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.line.map(|l| l.to_string()).unwrap_or_default();
        let record_type = self.record_type.map(String::from).unwrap_or_default();
        write!(
            f,
            "Line {} (Type {}): Field {} - {} - {} - found={} expected={}",
            line,
            record_type,
            self.field.as_deref().unwrap_or(""),
            self.kind,
            self.position.as_deref().unwrap_or(""),
            self.detail.found().unwrap_or_default(),
            self.detail.expected().unwrap_or_default(),
        )
    }
}

/// Format a 1-based inclusive byte range as `SSS-EEE`
pub fn format_position(start: usize, end: usize) -> String {
    format!("{:03}-{:03}", start, end)
}

/// Error counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub fatal: usize,
    pub business: usize,
    pub field: usize,
}

/// Append-only ordered collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Append errors in order
    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    /// True when no error was recorded
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors in the order they were found
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consume into the error list
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors at or above `min_severity`
    pub fn filtered(&self, min_severity: Severity) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.severity.is_at_least(min_severity))
            .collect()
    }

    /// True when no error reaches `min_severity`
    pub fn is_valid_at(&self, min_severity: Severity) -> bool {
        !self
            .errors
            .iter()
            .any(|e| e.severity.is_at_least(min_severity))
    }

    /// Errors of one kind
    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    /// Count of errors per severity
    pub fn count_by_severity(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for error in &self.errors {
            match error.severity {
                Severity::Fatal => counts.fatal += 1,
                Severity::Business => counts.business += 1,
                Severity::Field => counts.field += 1,
            }
        }
        counts
    }
}
