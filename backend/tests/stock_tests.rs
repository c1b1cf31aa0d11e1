//! Stock engine tests
//!
//! Bar scenarios run through the same engine the transaction service uses:
//! - Purchase, transfer, usage and adjustment effects on balances
//! - All-or-nothing failure on insufficient stock
//! - Quantities that a `NUMERIC(10, 2)` column cannot hold are rejected
//! - Replaying stored lines reproduces the live balances

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    normalize_quantity, replay, touched_keys, LineError, StockError, StockKey, StockLedger,
    StockLine, TransactionType,
};
use uuid::Uuid;

struct Bar {
    vodka: Uuid,
    lime: Uuid,
    cellar: Uuid,
    main_bar: Uuid,
}

impl Bar {
    fn new() -> Self {
        Self {
            vodka: Uuid::new_v4(),
            lime: Uuid::new_v4(),
            cellar: Uuid::new_v4(),
            main_bar: Uuid::new_v4(),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_purchase_then_transfer_then_usage() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();

        ledger
            .apply(
                TransactionType::Purchase,
                &[StockLine::new(bar.vodka, bar.cellar, dec!(12))],
            )
            .unwrap();
        ledger
            .apply(
                TransactionType::Transfer,
                &[StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(4))],
            )
            .unwrap();
        ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(bar.vodka, bar.main_bar, dec!(1.5))],
            )
            .unwrap();

        assert_eq!(ledger.quantity(bar.vodka, bar.cellar), dec!(8));
        assert_eq!(ledger.quantity(bar.vodka, bar.main_bar), dec!(2.5));
        assert_eq!(ledger.product_total(bar.vodka), dec!(10.5));
    }

    #[test]
    fn test_restock_service_bar_from_cellar() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.vodka, bar.cellar, dec!(24.00));

        ledger
            .apply(
                TransactionType::Transfer,
                &[StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(6.00))],
            )
            .unwrap();
        assert_eq!(ledger.quantity(bar.vodka, bar.cellar), dec!(18.00));
        assert_eq!(ledger.quantity(bar.vodka, bar.main_bar), dec!(6.00));

        ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(bar.vodka, bar.main_bar, dec!(-1.50))],
            )
            .unwrap();
        assert_eq!(ledger.quantity(bar.vodka, bar.main_bar), dec!(4.50));
        assert_eq!(ledger.quantity(bar.vodka, bar.cellar), dec!(18.00));
    }

    #[test]
    fn test_usage_and_transfer_are_stored_negative() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.vodka, bar.cellar, dec!(10));

        let usage = ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(bar.vodka, bar.cellar, dec!(2))],
            )
            .unwrap();
        assert_eq!(usage.lines[0].quantity, dec!(-2));

        // A negative usage quantity is read as the same debit
        let usage = ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(bar.vodka, bar.cellar, dec!(-2))],
            )
            .unwrap();
        assert_eq!(usage.lines[0].quantity, dec!(-2));

        let transfer = ledger
            .apply(
                TransactionType::Transfer,
                &[StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(3))],
            )
            .unwrap();
        assert_eq!(transfer.lines[0].quantity, dec!(-3));
        assert_eq!(transfer.movements.len(), 2);
        assert_eq!(
            transfer.balances.get(&StockKey::new(bar.vodka, bar.main_bar)),
            Some(&dec!(3))
        );
    }

    #[test]
    fn test_adjustment_keeps_its_sign() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.lime, bar.main_bar, dec!(5));

        ledger
            .apply(
                TransactionType::Adjustment,
                &[StockLine::new(bar.lime, bar.main_bar, dec!(-2))],
            )
            .unwrap();
        assert_eq!(ledger.quantity(bar.lime, bar.main_bar), dec!(3));

        ledger
            .apply(
                TransactionType::Adjustment,
                &[StockLine::new(bar.lime, bar.main_bar, dec!(0.5))],
            )
            .unwrap();
        assert_eq!(ledger.quantity(bar.lime, bar.main_bar), dec!(3.5));
    }

    #[test]
    fn test_insufficient_stock_changes_nothing() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new()
            .with_balance(bar.vodka, bar.main_bar, dec!(10))
            .with_balance(bar.lime, bar.main_bar, dec!(3));

        // The second line on the same balance overdraws it
        let err = ledger
            .apply(
                TransactionType::Usage,
                &[
                    StockLine::new(bar.lime, bar.main_bar, dec!(1)),
                    StockLine::new(bar.vodka, bar.main_bar, dec!(6)),
                    StockLine::new(bar.vodka, bar.main_bar, dec!(6)),
                ],
            )
            .unwrap_err();

        assert_eq!(
            err,
            StockError::InsufficientStock {
                product_id: bar.vodka,
                location_id: bar.main_bar,
                available: dec!(4),
                requested: dec!(6),
            }
        );
        assert_eq!(ledger.quantity(bar.vodka, bar.main_bar), dec!(10));
        assert_eq!(ledger.quantity(bar.lime, bar.main_bar), dec!(3));
    }

    #[test]
    fn test_transfer_needs_stock_at_source() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();

        let err = ledger
            .apply(
                TransactionType::Transfer,
                &[StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(1))],
            )
            .unwrap_err();

        assert!(matches!(err, StockError::InsufficientStock { .. }));
        assert_eq!(ledger.quantity(bar.vodka, bar.main_bar), Decimal::ZERO);
    }

    #[test]
    fn test_adjustment_cannot_go_below_zero() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.lime, bar.cellar, dec!(1));

        let err = ledger
            .apply(
                TransactionType::Adjustment,
                &[StockLine::new(bar.lime, bar.cellar, dec!(-1.01))],
            )
            .unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
    }

    #[test]
    fn test_invalid_lines_are_reported_by_position() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.vodka, bar.cellar, dec!(5));

        let err = ledger
            .apply(
                TransactionType::Transfer,
                &[
                    StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(1)),
                    StockLine::transfer(bar.vodka, bar.cellar, bar.cellar, dec!(1)),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 1,
                reason: LineError::SameLocation
            }
        );

        let err = ledger
            .apply(
                TransactionType::Purchase,
                &[StockLine::new(bar.vodka, bar.cellar, dec!(-3))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 0,
                reason: LineError::NegativePurchase
            }
        );

        let err = ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(bar.vodka, bar.cellar, Decimal::ZERO)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 0,
                reason: LineError::ZeroQuantity
            }
        );

        let err = ledger
            .apply(
                TransactionType::Purchase,
                &[StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(1))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 0,
                reason: LineError::UnexpectedDestination
            }
        );

        assert_eq!(
            ledger.apply(TransactionType::Adjustment, &[]).unwrap_err(),
            StockError::Empty
        );
        assert_eq!(ledger.quantity(bar.vodka, bar.cellar), dec!(5));
    }

    #[test]
    fn test_sub_cent_quantities_are_rejected() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();

        // Stored separately, each line would round to 0.01 while the balance holds 0.01
        let err = ledger
            .apply(
                TransactionType::Purchase,
                &[
                    StockLine::new(bar.lime, bar.cellar, dec!(0.005)),
                    StockLine::new(bar.lime, bar.cellar, dec!(0.005)),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 0,
                reason: LineError::TooPrecise
            }
        );
        assert_eq!(ledger.quantity(bar.lime, bar.cellar), Decimal::ZERO);

        assert_eq!(
            normalize_quantity(TransactionType::Purchase, dec!(0.004)),
            Err(LineError::TooPrecise)
        );
    }

    #[test]
    fn test_huge_quantities_are_rejected_without_panicking() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();
        let near_max = Decimal::MAX - dec!(10);

        let err = ledger
            .apply(
                TransactionType::Purchase,
                &[
                    StockLine::new(bar.vodka, bar.cellar, near_max),
                    StockLine::new(bar.vodka, bar.cellar, near_max),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 0,
                reason: LineError::TooLarge
            }
        );

        // Each line fits, their total does not
        let err = ledger
            .apply(
                TransactionType::Purchase,
                &[
                    StockLine::new(bar.vodka, bar.cellar, dec!(60000000)),
                    StockLine::new(bar.vodka, bar.cellar, dec!(60000000)),
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::BalanceOverflow {
                product_id: bar.vodka,
                location_id: bar.cellar
            }
        );
        assert_eq!(ledger.quantity(bar.vodka, bar.cellar), Decimal::ZERO);
    }

    #[test]
    fn test_touched_keys_are_sorted_and_unique() {
        let bar = Bar::new();
        let lines = [
            StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(-1)),
            StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(-2)),
            StockLine::transfer(bar.lime, bar.main_bar, bar.cellar, dec!(-1)),
        ];

        let keys = touched_keys(TransactionType::Transfer, &lines);
        assert_eq!(keys.len(), 4);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));

        // Destinations only count for transfers
        let keys = touched_keys(
            TransactionType::Usage,
            &[StockLine::new(bar.vodka, bar.cellar, dec!(-1))],
        );
        assert_eq!(keys, vec![StockKey::new(bar.vodka, bar.cellar)]);
    }

    #[test]
    fn test_replay_matches_live_balances() {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();
        let mut history = Vec::new();

        let steps = vec![
            (
                TransactionType::Purchase,
                vec![
                    StockLine::new(bar.vodka, bar.cellar, dec!(24)),
                    StockLine::new(bar.lime, bar.cellar, dec!(50)),
                ],
            ),
            (
                TransactionType::Transfer,
                vec![
                    StockLine::transfer(bar.vodka, bar.cellar, bar.main_bar, dec!(6)),
                    StockLine::transfer(bar.lime, bar.cellar, bar.main_bar, dec!(20)),
                ],
            ),
            (
                TransactionType::Usage,
                vec![StockLine::new(bar.lime, bar.main_bar, dec!(7))],
            ),
            (
                TransactionType::Adjustment,
                vec![StockLine::new(bar.vodka, bar.main_bar, dec!(-0.25))],
            ),
        ];

        for (transaction_type, lines) in steps {
            let applied = ledger.apply(transaction_type, &lines).unwrap();
            history.extend(applied.lines.into_iter().map(|line| (transaction_type, line)));
        }

        let replayed = replay(history);
        for (product, location) in [
            (bar.vodka, bar.cellar),
            (bar.vodka, bar.main_bar),
            (bar.lime, bar.cellar),
            (bar.lime, bar.main_bar),
        ] {
            assert_eq!(
                replayed
                    .get(&StockKey::new(product, location))
                    .copied()
                    .unwrap_or_default(),
                ledger.quantity(product, location)
            );
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn any_scale_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000, 0u32..5).prop_map(|(units, scale)| Decimal::new(units, scale))
}

proptest! {
    /// Every accepted line is stored exactly, so the balance equals its line sum
    #[test]
    fn prop_balance_equals_stored_line_sum(
        quantities in prop::collection::vec(any_scale_quantity(), 1..20),
    ) {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();
        let mut stored_sum = Decimal::ZERO;

        for quantity in quantities {
            let line = StockLine::new(bar.lime, bar.cellar, quantity);
            match ledger.apply(TransactionType::Purchase, &[line]) {
                Ok(applied) => {
                    let stored = applied.lines[0].quantity.round_dp(2);
                    prop_assert_eq!(stored, applied.lines[0].quantity);
                    stored_sum += stored;
                }
                Err(err) => {
                    prop_assert_eq!(
                        err,
                        StockError::InvalidLine { line: 0, reason: LineError::TooPrecise }
                    );
                }
            }
            prop_assert_eq!(ledger.quantity(bar.lime, bar.cellar), stored_sum);
        }
    }

    /// Transfers move stock between locations without creating or losing any
    #[test]
    fn prop_transfers_conserve_product_total(
        opening in quantity_strategy(),
        moves in prop::collection::vec((quantity_strategy(), any::<bool>()), 1..20),
    ) {
        let bar = Bar::new();
        let mut ledger = StockLedger::new().with_balance(bar.vodka, bar.cellar, opening);

        for (quantity, to_bar) in moves {
            let (from, to) = if to_bar {
                (bar.cellar, bar.main_bar)
            } else {
                (bar.main_bar, bar.cellar)
            };
            let before = ledger.quantity(bar.vodka, from);
            let result = ledger.apply(
                TransactionType::Transfer,
                &[StockLine::transfer(bar.vodka, from, to, quantity)],
            );
            prop_assert_eq!(result.is_ok(), quantity <= before);
            prop_assert_eq!(ledger.product_total(bar.vodka), opening);
        }
    }

    /// No sequence of transactions leaves a balance below zero
    #[test]
    fn prop_balances_never_negative(
        ops in prop::collection::vec((0u8..4, quantity_strategy()), 1..30),
    ) {
        let bar = Bar::new();
        let mut ledger = StockLedger::new();

        for (op, quantity) in ops {
            let (transaction_type, line) = match op {
                0 => (TransactionType::Purchase, StockLine::new(bar.lime, bar.cellar, quantity)),
                1 => (TransactionType::Usage, StockLine::new(bar.lime, bar.cellar, quantity)),
                2 => (TransactionType::Adjustment, StockLine::new(bar.lime, bar.cellar, -quantity)),
                _ => (
                    TransactionType::Transfer,
                    StockLine::transfer(bar.lime, bar.cellar, bar.main_bar, quantity),
                ),
            };
            let _ = ledger.apply(transaction_type, &[line]);
            prop_assert!(ledger.quantity(bar.lime, bar.cellar) >= Decimal::ZERO);
            prop_assert!(ledger.quantity(bar.lime, bar.main_bar) >= Decimal::ZERO);
        }
    }
}
