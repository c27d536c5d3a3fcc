//! Property-based tests for engine invariants
//!
//! - Check digit is always a single decimal digit
//! - Tolerance: a mismatch is reported iff |declared - summed| > tolerance
//! - Sequence check flags exactly the non-increasing steps
//! - Line length is flagged iff the original length is outside 400..=402

use cnab_validator::dispatcher::RecordDispatcher;
use cnab_validator::line::Line;
use cnab_validator::reconciliation::{compare_amount, tolerance_from_cents};
use cnab_validator::rules::nosso_numero_check_digit;
use cnab_validator::validator::SequenceTracker;
use cnab_validator::{ErrorKind, Layout, ValidationConfig, ValidationResult};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for amounts in cents, zero included
fn cents_strategy() -> impl Strategy<Value = i64> {
    0i64..10_000_000_00i64
}

proptest! {
    #[test]
    fn check_digit_is_a_digit(base in "[0-9]{11}") {
        let digit = nosso_numero_check_digit(&base).unwrap();
        prop_assert!(digit.is_ascii_digit());
    }

    #[test]
    fn check_digit_rejects_malformed_bases(base in "[0-9A-Z]{0,14}") {
        let well_formed = base.len() == 11 && base.bytes().all(|b| b.is_ascii_digit());
        prop_assert_eq!(nosso_numero_check_digit(&base).is_some(), well_formed);
    }

    #[test]
    fn tolerance_boundary(
        declared in cents_strategy(),
        summed in cents_strategy(),
        tolerance in 0u64..1_000,
    ) {
        let declared_dec = Decimal::new(declared, 2);
        let summed_dec = Decimal::new(summed, 2);
        let reported = compare_amount(declared_dec, summed_dec, tolerance_from_cents(tolerance)).is_some();

        let expected = declared != 0 && (declared - summed).unsigned_abs() > tolerance;
        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn sequence_flags_each_non_increase(values in prop::collection::vec(0u64..50, 1..40)) {
        let mut tracker = SequenceTracker::default();
        let flagged: Vec<usize> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| tracker.observe(i + 1, *v).and_then(|e| e.line))
            .collect();

        let mut previous = 0u64;
        let mut expected = Vec::new();
        for (i, v) in values.iter().enumerate() {
            if *v <= previous {
                expected.push(i + 1);
            }
            previous = *v;
        }
        prop_assert_eq!(flagged, expected);
    }

    #[test]
    fn line_length_flagged_outside_tolerance(len in 0usize..500) {
        let dispatcher = RecordDispatcher::new(Layout::bradesco_cnab400());
        let config = ValidationConfig::default();
        let mut result = ValidationResult::new();

        // Unregistered record type: only the length check applies
        let text: String = std::iter::once('5').chain(std::iter::repeat(' ')).take(len).collect();
        dispatcher.dispatch(&Line::from(text.as_str()), 1, &config, None, &mut result);

        let flagged = result.of_kind(ErrorKind::InvalidLineLength).count() == 1;
        prop_assert_eq!(flagged, !(400..=402).contains(&len));
    }
}
