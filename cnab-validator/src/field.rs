//! Field specifications and the per-field validation pipeline
//!
//! A [`FieldSpec`] is pure data: byte range, presence rule, optional pattern,
//! allowed values, and a closed set of behaviours ([`Transform`],
//! [`Condition`], [`CrossFieldRule`]) dispatched with `match`.
//!
//! # Pipeline
//!
//! 1. Extract `[start, end]`; a width mismatch is fatal for the field
//! 2. Skip the field when its condition does not hold
//! 3. Required and blank stops the field
//! 4. Allowed-value check (continues)
//! 5. Pattern check on non-blank text (continues)
//! 6. Transform into the typed context; failure leaves only the raw text
//! 7. Cross-field rule on non-blank text, always `business`

use crate::config::ValidationConfig;
use crate::line::Line;
use crate::rules;
use crate::types::{ErrorDetail, ErrorKind, Severity, ValidationError};
use crate::{Error, Result};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

/// Typed value produced by a transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Raw text (no transform)
    Text(String),
    /// Unsigned integer
    Integer(u64),
    /// Fixed-point amount with 2 fraction digits
    Amount(Decimal),
    /// Calendar date
    Date(NaiveDate),
    /// Optional value that was not filled
    Empty,
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Amount(_) => "amount",
            FieldValue::Date(_) => "date",
            FieldValue::Empty => "empty",
        }
    }
}

/// Conversion from raw text to a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Digits to integer; blank fails
    Integer,
    /// Digits to integer; blank is zero
    IntegerOrZero,
    /// DDMMAA date, year offset by the century base
    Date,
    /// DDMMAA date; blank or `000000` is [`FieldValue::Empty`]
    OptionalDate,
    /// 2-decimal amount; blank is zero, any non-digit fails
    Amount,
    /// 2-decimal amount; anything but digits is zero
    LenientAmount,
    /// 2-decimal percentage; blank is zero
    Percent,
}

impl Transform {
    /// Apply to raw text; `Err` carries the failure detail
    pub fn apply(&self, raw: &str, config: &ValidationConfig) -> std::result::Result<FieldValue, String> {
        let trimmed = raw.trim();
        match self {
            Transform::Integer => parse_integer(trimmed).map(FieldValue::Integer),
            Transform::IntegerOrZero => {
                if trimmed.is_empty() {
                    Ok(FieldValue::Integer(0))
                } else {
                    parse_integer(trimmed).map(FieldValue::Integer)
                }
            }
            Transform::Date => parse_ddmmaa(raw, config.century_base).map(FieldValue::Date),
            Transform::OptionalDate => {
                if trimmed.is_empty() || trimmed == "000000" {
                    Ok(FieldValue::Empty)
                } else {
                    parse_ddmmaa(trimmed, config.century_base).map(FieldValue::Date)
                }
            }
            Transform::Amount => {
                if trimmed.is_empty() {
                    Ok(FieldValue::Amount(Decimal::new(0, 2)))
                } else if !is_digits(raw) {
                    Err("non_digit_characters".to_string())
                } else {
                    parse_cents(raw).map(FieldValue::Amount)
                }
            }
            Transform::LenientAmount => {
                if !trimmed.is_empty() && is_digits(trimmed) {
                    Ok(FieldValue::Amount(parse_cents(trimmed).unwrap_or_default()))
                } else {
                    Ok(FieldValue::Amount(Decimal::new(0, 2)))
                }
            }
            Transform::Percent => {
                if trimmed.is_empty() {
                    Ok(FieldValue::Amount(Decimal::new(0, 2)))
                } else if !is_digits(trimmed) {
                    Err(format!("'{}' is not a percentage", raw))
                } else {
                    parse_cents(trimmed).map(FieldValue::Amount)
                }
            }
        }
    }
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(text: &str) -> std::result::Result<u64, String> {
    if !is_digits(text) {
        return Err(format!("'{}' is not an integer", text));
    }
    text.parse::<u64>()
        .map_err(|e| format!("'{}' is not an integer: {}", text, e))
}

fn parse_cents(digits: &str) -> std::result::Result<Decimal, String> {
    let cents = digits
        .parse::<i64>()
        .map_err(|e| format!("'{}' is not an amount: {}", digits, e))?;
    Ok(Decimal::new(cents, 2))
}

/// Parse a DDMMAA date, adding `century_base` to the 2-digit year
pub fn parse_ddmmaa(text: &str, century_base: i32) -> std::result::Result<NaiveDate, String> {
    if text.len() != 6 || !is_digits(text) {
        return Err(format!("'{}' is not a DDMMAA date", text));
    }
    let day: u32 = text[0..2].parse().map_err(|_| format!("bad day in '{}'", text))?;
    let month: u32 = text[2..4].parse().map_err(|_| format!("bad month in '{}'", text))?;
    let year: i32 = text[4..6].parse().map_err(|_| format!("bad year in '{}'", text))?;
    let year = year + century_base;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("invalid date: day {} month {} year {}", day, month, year))
}

/// Applicability predicate evaluated against fields already parsed on the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The named field has non-blank raw text
    Filled(String),
    /// The named field's raw text is one of the values
    Equals(String, Vec<String>),
}

impl Condition {
    /// True when the field applies to this line
    pub fn holds(&self, ctx: &RecordContext<'_>) -> bool {
        match self {
            Condition::Filled(name) => ctx.raw(name).map_or(false, |raw| !raw.trim().is_empty()),
            Condition::Equals(name, values) => ctx
                .raw(name)
                .map_or(false, |raw| values.iter().any(|v| v == raw)),
        }
    }
}

/// Cross-field rule attached to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossFieldRule {
    /// Late-fee indicator and percentage must agree
    SurchargeConsistency,
}

impl CrossFieldRule {
    /// Violation message, if any
    pub fn check(&self, raw: &str, ctx: &RecordContext<'_>) -> Option<String> {
        match self {
            CrossFieldRule::SurchargeConsistency => rules::surcharge_consistency(raw, ctx),
        }
    }
}

/// Anchored pattern constraint
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern that must match the whole field
    pub fn new(source: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", source))
            .map_err(|e| Error::Layout(format!("bad pattern '{}': {}", source, e)))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Pattern text as declared
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Full match
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Declarative description of one fixed-width field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Name, unique within its record type
    pub name: String,
    /// First byte, 1-based
    pub start: usize,
    /// Last byte, inclusive
    pub end: usize,
    /// Human description
    pub description: String,
    /// Blank text is an error
    pub required: bool,
    /// Full-match pattern for non-blank text
    pub pattern: Option<Pattern>,
    /// Allowed raw values
    pub allowed: Option<BTreeSet<String>>,
    /// Typed conversion
    pub transform: Option<Transform>,
    /// Applicability predicate
    pub condition: Option<Condition>,
    /// Cross-field rule
    pub rule: Option<CrossFieldRule>,
    /// Severity of this field's own errors
    pub severity: Severity,
}

impl FieldSpec {
    /// Required field at `[start, end]` with `field` severity
    pub fn new(name: &str, start: usize, end: usize, description: &str) -> Self {
        Self {
            name: name.to_string(),
            start,
            end,
            description: description.to_string(),
            required: true,
            pattern: None,
            allowed: None,
            transform: None,
            condition: None,
            rule: None,
            severity: Severity::Field,
        }
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Add a full-match pattern
    pub fn pattern(mut self, source: &str) -> Result<Self> {
        self.pattern = Some(Pattern::new(source)?);
        Ok(self)
    }

    /// Restrict to a set of raw values
    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Attach a transform
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attach an applicability condition
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach a cross-field rule
    pub fn rule(mut self, rule: CrossFieldRule) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Override severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Declared width
    pub fn width(&self) -> usize {
        self.end + 1 - self.start
    }

    /// True when the two ranges share at least one byte
    pub fn overlaps(&self, other: &FieldSpec) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Raw text of this field on `line`
    pub fn extract(&self, line: &Line) -> String {
        line.slice(self.start, self.end)
    }

    fn error(&self, kind: ErrorKind, severity: Severity, detail: ErrorDetail) -> ValidationError {
        ValidationError::field(&self.name, self.start, self.end, kind, severity, detail)
    }

    /// Run the pipeline for this field, recording values into `ctx`
    pub fn validate(&self, line: &Line, ctx: &mut RecordContext<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let raw = self.extract(line);
        let found_length = raw.chars().count();

        if found_length != self.width() {
            errors.push(self.error(
                ErrorKind::InvalidLength,
                Severity::Fatal,
                ErrorDetail::Length {
                    expected_length: self.width(),
                    found_length,
                },
            ));
            return errors;
        }

        if let Some(condition) = &self.condition {
            if !condition.holds(ctx) {
                return errors;
            }
        }

        let blank = raw.trim().is_empty();
        if self.required && blank {
            errors.push(self.error(ErrorKind::RequiredBlank, self.severity, ErrorDetail::Empty {}));
            return errors;
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&raw) {
                errors.push(self.error(
                    ErrorKind::UnexpectedValue,
                    self.severity,
                    ErrorDetail::Allowed {
                        expected: allowed.iter().cloned().collect(),
                        found: raw.clone(),
                    },
                ));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !blank && !pattern.is_match(&raw) {
                errors.push(self.error(
                    ErrorKind::PatternMismatch,
                    self.severity,
                    ErrorDetail::Pattern {
                        pattern: pattern.as_str().to_string(),
                        found: raw.clone(),
                    },
                ));
            }
        }

        match self.transform {
            Some(transform) => match transform.apply(&raw, ctx.config()) {
                Ok(value) => ctx.insert(&self.name, value),
                Err(detail) => errors.push(self.error(
                    ErrorKind::TransformError,
                    self.severity,
                    ErrorDetail::Transform {
                        detail,
                        raw: raw.clone(),
                    },
                )),
            },
            None => ctx.insert(&self.name, FieldValue::Text(raw.clone())),
        }
        ctx.insert_raw(&self.name, &raw);

        if let Some(rule) = &self.rule {
            if !blank {
                if let Some(detail) = rule.check(&raw, ctx) {
                    errors.push(self.error(
                        ErrorKind::BusinessRule,
                        Severity::Business,
                        ErrorDetail::Rule { detail, found: raw },
                    ));
                }
            }
        }

        errors
    }
}

/// Values accumulated while validating one line
///
/// Created per line and dropped once the line's record rules have run.
#[derive(Debug)]
pub struct RecordContext<'a> {
    config: &'a ValidationConfig,
    bank_code: Option<&'a str>,
    values: HashMap<String, FieldValue>,
    raw: HashMap<String, String>,
}

impl<'a> RecordContext<'a> {
    /// Empty context for one line
    pub fn new(config: &'a ValidationConfig, bank_code: Option<&'a str>) -> Self {
        Self {
            config,
            bank_code,
            values: HashMap::new(),
            raw: HashMap::new(),
        }
    }

    /// Run configuration
    pub fn config(&self) -> &'a ValidationConfig {
        self.config
    }

    /// Bank code detected in the header of this run
    pub fn bank_code(&self) -> Option<&'a str> {
        self.bank_code
    }

    /// Typed value
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Untransformed text
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.raw.get(name).map(String::as_str)
    }

    /// Record a typed value
    pub fn insert(&mut self, name: &str, value: FieldValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Record raw text
    pub fn insert_raw(&mut self, name: &str, raw: &str) {
        self.raw.insert(name.to_string(), raw.to_string());
    }

    /// Date value; `Ok(None)` when absent or empty
    pub fn date(&self, name: &str) -> Result<Option<NaiveDate>> {
        match self.values.get(name) {
            None | Some(FieldValue::Empty) => Ok(None),
            Some(FieldValue::Date(date)) => Ok(Some(*date)),
            Some(other) => Err(self.type_error(name, "date", other)),
        }
    }

    /// Amount value; `Ok(None)` when absent
    pub fn amount(&self, name: &str) -> Result<Option<Decimal>> {
        match self.values.get(name) {
            None | Some(FieldValue::Empty) => Ok(None),
            Some(FieldValue::Amount(amount)) => Ok(Some(*amount)),
            Some(other) => Err(self.type_error(name, "amount", other)),
        }
    }

    /// Integer value; `Ok(None)` when absent
    pub fn integer(&self, name: &str) -> Result<Option<u64>> {
        match self.values.get(name) {
            None | Some(FieldValue::Empty) => Ok(None),
            Some(FieldValue::Integer(value)) => Ok(Some(*value)),
            Some(other) => Err(self.type_error(name, "integer", other)),
        }
    }

    /// Text value; `Ok(None)` when absent
    pub fn text(&self, name: &str) -> Result<Option<&str>> {
        match self.values.get(name) {
            None | Some(FieldValue::Empty) => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(self.type_error(name, "text", other)),
        }
    }

    fn type_error(&self, name: &str, expected: &str, found: &FieldValue) -> Error {
        Error::Rule(format!(
            "field '{}' holds {} value, expected {}",
            name,
            found.type_name(),
            expected
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line_with(start: usize, text: &str) -> Line {
        let mut chars = vec![' '; 400];
        for (i, c) in text.chars().enumerate() {
            chars[start - 1 + i] = c;
        }
        Line::from(chars.into_iter().collect::<String>().as_str())
    }

    #[test]
    fn test_invalid_length_is_fatal_and_stops() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        let spec = FieldSpec::new("sequencial_registro", 395, 400, "Seq")
            .pattern(r"\d{6}")
            .unwrap()
            .transform(Transform::Integer);
        let line = Line::from("1".repeat(399).as_str());

        let errors = spec.validate(&line, &mut ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::InvalidLength);
        assert_eq!(errors[0].severity, Severity::Fatal);
        assert_eq!(
            errors[0].detail,
            ErrorDetail::Length { expected_length: 6, found_length: 5 }
        );
        assert!(ctx.get("sequencial_registro").is_none());
        assert!(ctx.raw("sequencial_registro").is_none());
    }

    #[test]
    fn test_required_blank_stops() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        let spec = FieldSpec::new("nosso_numero", 71, 82, "Nosso Número")
            .pattern(r"\d{12}")
            .unwrap();
        let errors = spec.validate(&line_with(1, "1"), &mut ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::RequiredBlank);
        assert_eq!(errors[0].position.as_deref(), Some("071-082"));
        assert!(ctx.raw("nosso_numero").is_none());
    }

    #[test]
    fn test_allowed_and_pattern_both_reported() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        let spec = FieldSpec::new("codigo_banco", 77, 79, "Código Banco")
            .allowed(&["463", "237"])
            .pattern(r"\d{3}")
            .unwrap();
        let errors = spec.validate(&line_with(77, "X01"), &mut ctx);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ErrorKind::UnexpectedValue);
        assert_eq!(
            errors[0].detail,
            ErrorDetail::Allowed {
                expected: vec!["237".to_string(), "463".to_string()],
                found: "X01".to_string(),
            }
        );
        assert_eq!(errors[1].kind, ErrorKind::PatternMismatch);
        assert_eq!(ctx.get("codigo_banco"), Some(&FieldValue::Text("X01".to_string())));
    }

    #[test]
    fn test_transform_failure_keeps_raw_only() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        let spec = FieldSpec::new("data_vencimento", 121, 126, "Vencimento")
            .pattern(r"\d{6}")
            .unwrap()
            .transform(Transform::Date);
        let errors = spec.validate(&line_with(121, "310224"), &mut ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TransformError);
        assert!(ctx.get("data_vencimento").is_none());
        assert_eq!(ctx.raw("data_vencimento"), Some("310224"));
    }

    #[test]
    fn test_condition_skips_field() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        let spec = FieldSpec::new("codigo_banco_debito", 63, 65, "Banco Débito")
            .optional()
            .pattern(r"\d{3}")
            .unwrap()
            .condition(Condition::Filled("ident_debito_automatico".to_string()));

        let line = line_with(63, "ABC");
        assert!(spec.validate(&line, &mut ctx).is_empty());
        assert!(ctx.raw("codigo_banco_debito").is_none());

        ctx.insert_raw("ident_debito_automatico", "0001234567");
        let errors = spec.validate(&line, &mut ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::PatternMismatch);
    }

    #[test]
    fn test_transforms() {
        let config = ValidationConfig::default();
        assert_eq!(
            Transform::Amount.apply("0000000012345", &config),
            Ok(FieldValue::Amount(dec!(123.45)))
        );
        assert_eq!(
            Transform::Amount.apply("             ", &config),
            Ok(FieldValue::Amount(dec!(0.00)))
        );
        assert!(Transform::Amount.apply("00000000123 5", &config).is_err());
        assert_eq!(
            Transform::LenientAmount.apply("ABC", &config),
            Ok(FieldValue::Amount(dec!(0.00)))
        );
        assert_eq!(Transform::Percent.apply("0250", &config), Ok(FieldValue::Amount(dec!(2.50))));
        assert_eq!(Transform::IntegerOrZero.apply("      ", &config), Ok(FieldValue::Integer(0)));
        assert!(Transform::Integer.apply("00A001", &config).is_err());
        assert_eq!(Transform::OptionalDate.apply("000000", &config), Ok(FieldValue::Empty));
        assert_eq!(
            Transform::Date.apply("150324", &config),
            Ok(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()))
        );
    }

    #[test]
    fn test_century_base_applies() {
        assert_eq!(
            parse_ddmmaa("010199", 1900),
            Ok(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap())
        );
        assert!(parse_ddmmaa("290223", 2000).is_err());
        assert!(parse_ddmmaa("2902 4", 2000).is_err());
    }

    #[test]
    fn test_equals_condition_and_declared_severity() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, Some("237"));
        assert_eq!(ctx.bank_code(), Some("237"));

        let spec = FieldSpec::new("instrucao1", 157, 160, "Instrução 1")
            .pattern(r"\d{4}")
            .unwrap()
            .condition(Condition::Equals("ocorrencia".to_string(), vec!["01".to_string()]))
            .severity(Severity::Business);
        let line = line_with(157, "AB12");

        ctx.insert_raw("ocorrencia", "02");
        assert!(spec.validate(&line, &mut ctx).is_empty());

        ctx.insert_raw("ocorrencia", "01");
        let errors = spec.validate(&line, &mut ctx);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::PatternMismatch);
        assert_eq!(errors[0].severity, Severity::Business);
    }

    #[test]
    fn test_typed_accessors_report_wrong_type() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("data_emissao", FieldValue::Text("150324".into()));
        assert!(matches!(ctx.date("data_emissao"), Err(Error::Rule(_))));
        assert_eq!(ctx.date("data_vencimento").unwrap(), None);
    }
}
