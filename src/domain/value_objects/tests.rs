//! # Property-Based Tests for Domain Value Objects
//!
//! Randomized checks of the arithmetic the ledger relies on to conserve
//! shares: reserving and then releasing must restore the original amount,
//! and prices must reject non-positive input however they arrive.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use super::arithmetic::{ArithmeticError, CheckedArithmetic};
use super::operation_status::OperationStatus;
use super::price::Price;
use super::quantity::Quantity;
use rust_decimal::Decimal;

// ============================================================================
// Strategy Definitions
// ============================================================================

fn quantity() -> impl Strategy<Value = Quantity> {
    (0u64..10_000_000).prop_map(Quantity::new)
}

fn status() -> impl Strategy<Value = OperationStatus> {
    prop_oneof![
        Just(OperationStatus::PendingPayment),
        Just(OperationStatus::Succeed),
        Just(OperationStatus::Rejected),
    ]
}

// ============================================================================
// Quantity
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn reserve_then_release_restores(total in quantity(), take in quantity()) {
        match total.safe_sub(take) {
            Ok(left) => prop_assert_eq!(left.safe_add(take).unwrap(), total),
            Err(err) => {
                prop_assert!(take > total);
                prop_assert_eq!(err, ArithmeticError::Underflow);
            }
        }
    }

    #[test]
    fn transfer_conserves_sum(seller in quantity(), buyer in quantity(), amount in quantity()) {
        prop_assume!(amount <= seller);
        let before = seller.safe_add(buyer).unwrap();
        let seller_after = seller.safe_sub(amount).unwrap();
        let buyer_after = buyer.safe_add(amount).unwrap();
        prop_assert_eq!(seller_after.safe_add(buyer_after).unwrap(), before);
    }

    #[test]
    fn storage_conversion_is_lossless(q in quantity()) {
        let column = i64::try_from(q).unwrap();
        prop_assert_eq!(Quantity::try_from(column).unwrap(), q);
    }
}

// ============================================================================
// Price
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn price_sign_decides_validity(mantissa in -1_000_000i64..1_000_000, scale in 0u32..6) {
        let value = Decimal::new(mantissa, scale);
        prop_assert_eq!(Price::new(value).is_ok(), mantissa > 0);
    }

    #[test]
    fn total_scales_linearly(units in 1u64..100_000, a in 0u64..10_000, b in 0u64..10_000) {
        let price = Price::from_units(units).unwrap();
        let sum = price.total_for(Quantity::new(a + b)).unwrap();
        let parts = price.total_for(Quantity::new(a)).unwrap()
            + price.total_for(Quantity::new(b)).unwrap();
        prop_assert_eq!(sum, parts);
    }
}

// ============================================================================
// Operation status
// ============================================================================

proptest! {
    #[test]
    fn only_pending_moves(from in status(), to in status()) {
        if from.can_transition_to(to) {
            prop_assert!(from.is_pending());
            prop_assert!(to.is_terminal());
        }
    }
}
