//! Variance calculation for stock counts.
//!
//! Kept as pure functions so the reconciliation arithmetic is testable
//! without a database. The epsilon guards against decimal noise producing
//! spurious ledger adjustments; sub-epsilon lines stay visible on the count
//! but never post.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Variances with an absolute value below this never reach the ledger.
pub const VARIANCE_EPSILON: Decimal = dec!(0.000001);

/// `variance = counted - system`.
pub fn variance_qty(counted_qty: Decimal, system_qty: Decimal) -> Decimal {
    counted_qty - system_qty
}

/// Whether a line's variance is large enough to post as an adjustment.
pub fn is_postable(variance_qty: Decimal) -> bool {
    variance_qty.abs() >= VARIANCE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn variance_is_counted_minus_system() {
        assert_eq!(variance_qty(dec!(10), dec!(0)), dec!(10));
        assert_eq!(variance_qty(dec!(7), dec!(10)), dec!(-3));
        assert_eq!(variance_qty(dec!(4.5), dec!(4.5)), dec!(0));
    }

    #[test]
    fn epsilon_excludes_noise_but_keeps_real_variances() {
        assert!(!is_postable(dec!(0)));
        assert!(!is_postable(dec!(0.0000009)));
        assert!(!is_postable(dec!(-0.0000009)));
        assert!(is_postable(VARIANCE_EPSILON));
        assert!(is_postable(dec!(-0.000001)));
        assert!(is_postable(dec!(3)));
    }

    proptest! {
        /// Recomputing with unchanged operands always yields the same value.
        #[test]
        fn recompute_is_idempotent(counted in -1_000_000i64..1_000_000, system in -1_000_000i64..1_000_000) {
            let counted = Decimal::new(counted, 3);
            let system = Decimal::new(system, 3);
            let first = variance_qty(counted, system);
            let second = variance_qty(counted, system);
            prop_assert_eq!(first, second);
        }

        /// counted = system + variance, exactly.
        #[test]
        fn variance_round_trips(counted in -1_000_000i64..1_000_000, system in -1_000_000i64..1_000_000) {
            let counted = Decimal::new(counted, 3);
            let system = Decimal::new(system, 3);
            prop_assert_eq!(system + variance_qty(counted, system), counted);
        }

        /// Swapping the operands negates the variance.
        #[test]
        fn variance_is_antisymmetric(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let a = Decimal::new(a, 3);
            let b = Decimal::new(b, 3);
            prop_assert_eq!(variance_qty(a, b), -variance_qty(b, a));
        }
    }
}
