//! Record-level business rules
//!
//! Rules read the typed values accumulated in a [`RecordContext`] after every
//! field of the line went through the pipeline. A rule that finds a value of
//! the wrong type returns `Err`; the dispatcher turns that into a single
//! `record_validator_exception` for the rule and keeps going.

use crate::field::{FieldValue, RecordContext};
use crate::types::{format_position, ErrorDetail, ErrorKind, Severity, ValidationError};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

// Two digits isolated between a 2-space and a 3+-space block
static PHONE_STUB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2}(\d{2})\s{3,}").expect("phone stub regex"));

const CHECK_DIGIT_WEIGHTS: [u32; 6] = [2, 3, 4, 5, 6, 7];

// Bradesco detail positions of the 12-character Nosso Número
const NOSSO_NUMERO_POSITION: (usize, usize) = (71, 82);

/// Rule run once per record of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRule {
    /// Due, issue and discount dates are consistently ordered
    DateOrdering,
    /// Nosso Número check digit (gated by configuration)
    CheckDigit,
    /// Free-text message holds an area code without a number
    IncompletePhone,
}

impl RecordRule {
    /// Rule name used in exception reports
    pub fn name(&self) -> &'static str {
        match self {
            RecordRule::DateOrdering => "date_ordering",
            RecordRule::CheckDigit => "check_digit",
            RecordRule::IncompletePhone => "incomplete_phone",
        }
    }

    /// Evaluate against the line's context
    pub fn apply(&self, ctx: &RecordContext<'_>) -> Result<Vec<ValidationError>> {
        match self {
            RecordRule::DateOrdering => date_ordering(ctx),
            RecordRule::CheckDigit => check_digit(ctx),
            RecordRule::IncompletePhone => incomplete_phone(ctx),
        }
    }
}

/// Late-fee indicator `2` needs a positive percentage; `0` or blank needs zero
pub fn surcharge_consistency(_raw: &str, ctx: &RecordContext<'_>) -> Option<String> {
    let indicator = ctx.raw("indicador_multa").unwrap_or("");
    let percent = match ctx.get("percentual_multa") {
        Some(FieldValue::Amount(percent)) => *percent,
        _ => Decimal::ZERO,
    };

    if indicator == "2" && percent <= Decimal::ZERO {
        return Some("percentual_multa must be > 0 when indicador_multa = 2".to_string());
    }
    if (indicator == "0" || indicator == " ") && percent > Decimal::ZERO {
        return Some(
            "percentual_multa must be zero when indicador_multa is 0 or blank".to_string(),
        );
    }
    None
}

fn date_ordering(ctx: &RecordContext<'_>) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();
    let vencimento = ctx.date("data_vencimento")?;
    let emissao = ctx.date("data_emissao")?;
    let desconto1 = ctx.date("data_desconto")?;
    let desconto2 = ctx.date("data_segundo_desconto")?;

    if let (Some(vencimento), Some(emissao)) = (vencimento, emissao) {
        if vencimento < emissao {
            errors.push(business(
                ErrorKind::DataVencimentoMenorEmissao,
                ErrorDetail::IssueDue { emissao, vencimento },
            ));
        }
    }

    let discounts = [
        (
            desconto1,
            ErrorKind::DataDesconto1MaiorVencimento,
            ErrorKind::DataDesconto1MenorEmissao,
        ),
        (
            desconto2,
            ErrorKind::DataDesconto2MaiorVencimento,
            ErrorKind::DataDesconto2MenorEmissao,
        ),
    ];
    for (desconto, after_due, before_issue) in discounts {
        let Some(desconto) = desconto else { continue };
        if let Some(limite) = vencimento.filter(|v| desconto > *v) {
            errors.push(business(after_due, ErrorDetail::DiscountDate { desconto, limite }));
        }
        if let Some(limite) = emissao.filter(|e| desconto < *e) {
            errors.push(business(before_issue, ErrorDetail::DiscountDate { desconto, limite }));
        }
    }

    if let (Some(desconto1), Some(desconto2)) = (desconto1, desconto2) {
        if desconto2 < desconto1 {
            errors.push(business(
                ErrorKind::Desconto2AnteriorDesconto1,
                ErrorDetail::Discounts { desconto1, desconto2 },
            ));
        }
    }

    Ok(errors)
}

fn business(kind: ErrorKind, detail: ErrorDetail) -> ValidationError {
    ValidationError::record(kind, Severity::Business, detail)
}

/// Check digit for an 11-digit Nosso Número base
///
/// Weights 2..7 cycle right to left; the digit is `11 - sum % 11`, with 10
/// and 11 mapped to `'0'`. Returns `None` unless `base` is 11 ASCII digits.
pub fn nosso_numero_check_digit(base: &str) -> Option<char> {
    if base.len() != 11 || !base.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = base
        .bytes()
        .rev()
        .zip(CHECK_DIGIT_WEIGHTS.iter().cycle())
        .map(|(digit, weight)| u32::from(digit - b'0') * weight)
        .sum();
    match 11 - sum % 11 {
        10 | 11 => Some('0'),
        digit => char::from_digit(digit, 10),
    }
}

fn check_digit(ctx: &RecordContext<'_>) -> Result<Vec<ValidationError>> {
    if !ctx.config().validate_check_digit {
        return Ok(Vec::new());
    }
    // Format defects are already reported by the field pattern
    let Some(raw) = ctx.raw("nosso_numero") else {
        return Ok(Vec::new());
    };
    let Some(expected) = raw.get(..11).and_then(nosso_numero_check_digit) else {
        return Ok(Vec::new());
    };
    let Some(found) = raw.chars().nth(11).filter(|c| c.is_ascii_digit() && raw.len() == 12)
    else {
        return Ok(Vec::new());
    };

    if found == expected {
        return Ok(Vec::new());
    }
    let mut error = ValidationError::record(
        ErrorKind::NossoNumeroDvInvalido,
        Severity::Field,
        ErrorDetail::CheckDigit { expected, found },
    );
    error.field = Some("nosso_numero".to_string());
    error.position = Some(format_position(NOSSO_NUMERO_POSITION.0, NOSSO_NUMERO_POSITION.1));
    Ok(vec![error])
}

fn incomplete_phone(ctx: &RecordContext<'_>) -> Result<Vec<ValidationError>> {
    let Some(message) = ctx.text("mensagem")? else {
        return Ok(Vec::new());
    };
    Ok(PHONE_STUB
        .captures(message)
        .map(|caps| {
            ValidationError::record(
                ErrorKind::TelefoneIncompleto,
                Severity::Field,
                ErrorDetail::Found {
                    found: caps[1].to_string(),
                },
            )
        })
        .into_iter()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_check_digit_known_value() {
        assert_eq!(nosso_numero_check_digit("12345678901"), Some('8'));
        assert_eq!(nosso_numero_check_digit("1234567890"), None);
        assert_eq!(nosso_numero_check_digit("1234567890A"), None);
    }

    #[test]
    fn test_check_digit_remainders_map_to_zero() {
        // sum = 0 -> 11 - 0 = 11 -> '0'
        assert_eq!(nosso_numero_check_digit("00000000000"), Some('0'));
        // "00000000001": sum = 2 -> 11 - 2 = 9
        assert_eq!(nosso_numero_check_digit("00000000001"), Some('9'));
        // "00000000005": sum = 10 -> 11 - 10 = 1
        assert_eq!(nosso_numero_check_digit("00000000005"), Some('1'));
        // "00000000050": sum = 15, 15 % 11 = 4 -> 7
        assert_eq!(nosso_numero_check_digit("00000000050"), Some('7'));
    }

    #[test]
    fn test_check_digit_rule_gated_by_config() {
        let disabled = ValidationConfig::default();
        let mut ctx = RecordContext::new(&disabled, None);
        ctx.insert_raw("nosso_numero", "123456789011");
        assert!(RecordRule::CheckDigit.apply(&ctx).unwrap().is_empty());

        let enabled = ValidationConfig::default().with_check_digit(true);
        let mut ctx = RecordContext::new(&enabled, None);
        ctx.insert_raw("nosso_numero", "123456789018");
        assert!(RecordRule::CheckDigit.apply(&ctx).unwrap().is_empty());

        ctx.insert_raw("nosso_numero", "123456789011");
        let errors = RecordRule::CheckDigit.apply(&ctx).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::NossoNumeroDvInvalido);
        assert_eq!(errors[0].severity, Severity::Field);
        assert_eq!(errors[0].field.as_deref(), Some("nosso_numero"));
        assert_eq!(errors[0].position.as_deref(), Some("071-082"));
        assert_eq!(errors[0].detail, ErrorDetail::CheckDigit { expected: '8', found: '1' });
    }

    #[test]
    fn test_surcharge_consistency() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);

        ctx.insert_raw("indicador_multa", "2");
        ctx.insert("percentual_multa", FieldValue::Amount(dec!(0.00)));
        assert!(surcharge_consistency("0000", &ctx).is_some());

        ctx.insert("percentual_multa", FieldValue::Amount(dec!(2.00)));
        assert!(surcharge_consistency("0200", &ctx).is_none());

        ctx.insert_raw("indicador_multa", "0");
        assert!(surcharge_consistency("0200", &ctx).is_some());

        ctx.insert_raw("indicador_multa", " ");
        assert!(surcharge_consistency("0200", &ctx).is_some());

        ctx.insert("percentual_multa", FieldValue::Amount(dec!(0.00)));
        assert!(surcharge_consistency("0000", &ctx).is_none());
    }

    #[test]
    fn test_due_before_issue() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("data_emissao", date(2024, 3, 10));
        ctx.insert("data_vencimento", date(2024, 3, 1));

        let errors = RecordRule::DateOrdering.apply(&ctx).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::DataVencimentoMenorEmissao);
        assert_eq!(errors[0].severity, Severity::Business);
        let json = serde_json::to_value(&errors[0]).unwrap();
        assert_eq!(json["emissao"], "2024-03-10");
        assert_eq!(json["vencimento"], "2024-03-01");
    }

    #[test]
    fn test_discount_dates_each_reported() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("data_emissao", date(2024, 3, 10));
        ctx.insert("data_vencimento", date(2024, 4, 10));
        ctx.insert("data_desconto", date(2024, 4, 20));
        ctx.insert("data_segundo_desconto", date(2024, 3, 1));

        let kinds: Vec<ErrorKind> = RecordRule::DateOrdering
            .apply(&ctx)
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::DataDesconto1MaiorVencimento,
                ErrorKind::DataDesconto2MenorEmissao,
                ErrorKind::Desconto2AnteriorDesconto1,
            ]
        );
    }

    #[test]
    fn test_empty_discount_dates_ignored() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("data_emissao", date(2024, 3, 10));
        ctx.insert("data_vencimento", date(2024, 4, 10));
        ctx.insert("data_desconto", FieldValue::Empty);
        assert!(RecordRule::DateOrdering.apply(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_value_type_is_rule_error() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("data_vencimento", FieldValue::Text("010124".into()));
        assert!(RecordRule::DateOrdering.apply(&ctx).is_err());
    }

    #[test]
    fn test_incomplete_phone() {
        let config = ValidationConfig::default();
        let mut ctx = RecordContext::new(&config, None);
        ctx.insert("mensagem", FieldValue::Text("LIGUE  11     PARA ATENDIMENTO".into()));
        let errors = RecordRule::IncompletePhone.apply(&ctx).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::TelefoneIncompleto);
        assert_eq!(errors[0].detail, ErrorDetail::Found { found: "11".into() });

        ctx.insert("mensagem", FieldValue::Text("LIGUE  11 3333-4444     OBRIGADO".into()));
        assert!(RecordRule::IncompletePhone.apply(&ctx).unwrap().is_empty());
    }
}
