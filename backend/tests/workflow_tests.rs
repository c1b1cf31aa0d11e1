//! Workflow tests for counts, supplier orders and recipes
//!
//! Each workflow ends in stock movements; these tests drive the status rules
//! and derived values, then post the resulting lines through the stock engine
//! the same way the services do.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use shared::{
    order_number_from, pour_cost_percentage, recipe_cost, servings_usage, CountStatus,
    IngredientCosting, OrderSchedule, OrderStatus, OrderTotals, ReceivingStatus, StockLedger,
    StockLine, TransactionType, VarianceLine, VarianceSummary,
};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Inventory Counts
// ============================================================================

#[cfg(test)]
mod count_tests {
    use super::*;

    /// Completing a count adjusts each balance by counted minus current
    #[test]
    fn test_count_completion_sets_balances_to_counted() {
        let back_bar = Uuid::new_v4();
        let gin = Uuid::new_v4();
        let tonic = Uuid::new_v4();
        let vermouth = Uuid::new_v4();
        let mut ledger = StockLedger::new()
            .with_balance(gin, back_bar, dec!(10))
            .with_balance(tonic, back_bar, dec!(24))
            .with_balance(vermouth, back_bar, dec!(2));

        // Expected quantities snapshot the balances; one bottle of gin is
        // poured while the count is running
        let expected = [(gin, dec!(10)), (tonic, dec!(24)), (vermouth, dec!(2))];
        ledger
            .apply(TransactionType::Usage, &[StockLine::new(gin, back_bar, dec!(1))])
            .unwrap();

        let counted = [(gin, dec!(8.5)), (tonic, dec!(24)), (vermouth, dec!(3))];
        let lines: Vec<StockLine> = counted
            .iter()
            .filter_map(|(product, counted)| {
                let delta = *counted - ledger.quantity(*product, back_bar);
                (!delta.is_zero()).then(|| StockLine::new(*product, back_bar, delta))
            })
            .collect();
        assert_eq!(lines.len(), 2);

        ledger.apply(TransactionType::Adjustment, &lines).unwrap();
        for (product, counted) in counted {
            assert_eq!(ledger.quantity(product, back_bar), counted);
        }

        // The report still compares against the snapshot
        let report: Vec<VarianceLine> = expected
            .iter()
            .zip(counted.iter())
            .map(|((product, expected), (_, counted))| {
                VarianceLine::new(*product, "item".into(), None, *expected, Some(*counted), dec!(10))
            })
            .collect();
        assert_eq!(report[0].variance, Some(dec!(-1.5)));
        assert_eq!(report[0].variance_percentage, Some(dec!(-15.00)));
        assert_eq!(report[2].value_impact, Some(dec!(10)));

        let summary = VarianceSummary::from_lines(&report);
        assert_eq!(summary.items_with_variance, 2);
        assert_eq!(summary.total_value_impact, dec!(-5));
        assert_eq!(summary.progress_percentage, 100);
    }

    #[test]
    fn test_closed_counts_stay_closed() {
        for closed in [CountStatus::Completed, CountStatus::Cancelled] {
            assert!(!closed.is_open());
            assert!(!closed.can_transition_to(CountStatus::InProgress));
            assert!(!closed.can_transition_to(CountStatus::Completed));
            assert!(!closed.can_transition_to(CountStatus::Cancelled));
        }
        assert!(CountStatus::InProgress.can_transition_to(CountStatus::Cancelled));
        assert_eq!(CountStatus::default(), CountStatus::InProgress);
    }

    #[test]
    fn test_uncounted_items_have_no_variance() {
        let line = VarianceLine::new(Uuid::new_v4(), "Lime".into(), None, dec!(5), None, dec!(0.3));
        assert_eq!(line.variance, None);
        assert_eq!(line.variance_percentage, None);
        assert_eq!(line.value_impact, None);
    }
}

// ============================================================================
// Supplier Orders
// ============================================================================

#[cfg(test)]
mod order_tests {
    use super::*;

    #[test]
    fn test_order_lifecycle() {
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Placed));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Received));
        assert!(OrderStatus::Placed.can_transition_to(OrderStatus::Cancelled));

        assert!(!OrderStatus::Draft.can_transition_to(OrderStatus::Received));
        assert!(!OrderStatus::Received.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Placed));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Draft));
    }

    #[test]
    fn test_items_lock_once_placed() {
        assert!(OrderStatus::Draft.items_editable());
        assert!(OrderStatus::Pending.items_editable());
        assert!(!OrderStatus::Placed.items_editable());
        assert!(OrderStatus::Placed.is_editable());
        assert!(!OrderStatus::Received.is_editable());
    }

    #[test]
    fn test_order_totals() {
        let totals = OrderTotals::calculate(
            [(dec!(12), dec!(18.50)), (dec!(6), dec!(32.00))],
            dec!(15),
            dec!(28.44),
            dec!(10),
        );
        assert_eq!(totals.subtotal, dec!(414.00));
        assert_eq!(totals.total, dec!(447.44));
    }

    #[test]
    fn test_schedule_rules() {
        let today = date(2024, 6, 15);
        let placed = OrderSchedule {
            status: OrderStatus::Placed,
            order_date: Some(date(2024, 6, 10)),
            expected_delivery_date: Some(date(2024, 6, 17)),
            actual_delivery_date: None,
        };
        assert!(placed.validate(today).is_ok());

        let missing_date = OrderSchedule {
            order_date: None,
            ..placed
        };
        assert_eq!(missing_date.validate(today).unwrap_err().field, "order_date");

        let early_delivery = OrderSchedule {
            expected_delivery_date: Some(date(2024, 6, 9)),
            ..placed
        };
        assert_eq!(
            early_delivery.validate(today).unwrap_err().field,
            "expected_delivery_date"
        );

        let received_without_delivery = OrderSchedule {
            status: OrderStatus::Received,
            ..placed
        };
        assert_eq!(
            received_without_delivery.validate(today).unwrap_err().field,
            "actual_delivery_date"
        );

        let future_order = OrderSchedule {
            order_date: Some(date(2024, 6, 16)),
            expected_delivery_date: None,
            ..placed
        };
        assert_eq!(future_order.validate(today).unwrap_err().field, "order_date");
    }

    /// Receiving posts one purchase with the received quantities
    #[test]
    fn test_receiving_posts_purchase() {
        let storeroom = Uuid::new_v4();
        let rum = Uuid::new_v4();
        let syrup = Uuid::new_v4();
        let mut ledger = StockLedger::new().with_balance(rum, storeroom, dec!(2));

        let ordered = [(rum, dec!(12)), (syrup, dec!(6))];
        let received = [(rum, dec!(12)), (syrup, dec!(4))];

        let lines: Vec<StockLine> = received
            .iter()
            .filter(|(_, quantity)| *quantity > Decimal::ZERO)
            .map(|(product, quantity)| StockLine::new(*product, storeroom, *quantity))
            .collect();
        ledger.apply(TransactionType::Purchase, &lines).unwrap();

        assert_eq!(ledger.quantity(rum, storeroom), dec!(14));
        assert_eq!(ledger.quantity(syrup, storeroom), dec!(4));

        let statuses: Vec<ReceivingStatus> = ordered
            .iter()
            .zip(received.iter())
            .map(|((_, ordered), (_, received))| ReceivingStatus::from_quantities(*ordered, *received))
            .collect();
        assert_eq!(
            statuses,
            vec![ReceivingStatus::FullyReceived, ReceivingStatus::PartiallyReceived]
        );
        assert_eq!(
            ReceivingStatus::from_quantities(dec!(6), Decimal::ZERO),
            ReceivingStatus::NotReceived
        );
    }

    #[test]
    fn test_order_number_format() {
        let id = Uuid::parse_str("1f0c2a9e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(order_number_from(id), "ORD-1F0C2A9E");
    }

    proptest! {
        #[test]
        fn prop_total_is_subtotal_plus_charges(
            lines in prop::collection::vec((1i64..1000, 0i64..100_000), 0..10),
            shipping in 0i64..10_000,
            tax in 0i64..10_000,
            discount in 0i64..10_000,
        ) {
            let lines: Vec<(Decimal, Decimal)> = lines
                .into_iter()
                .map(|(q, p)| (Decimal::from(q), Decimal::new(p, 2)))
                .collect();
            let shipping = Decimal::new(shipping, 2);
            let tax = Decimal::new(tax, 2);
            let discount = Decimal::new(discount, 2);

            let totals = OrderTotals::calculate(lines.iter().copied(), shipping, tax, discount);
            let subtotal: Decimal = lines.iter().map(|(q, p)| q * p).sum();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.total, subtotal + shipping + tax - discount);
        }
    }
}

// ============================================================================
// Recipes
// ============================================================================

#[cfg(test)]
mod recipe_tests {
    use super::*;

    fn negroni() -> (Vec<IngredientCosting>, [Uuid; 3]) {
        let gin = Uuid::new_v4();
        let campari = Uuid::new_v4();
        let vermouth = Uuid::new_v4();
        let ingredients = vec![
            IngredientCosting {
                product_id: gin,
                quantity: dec!(30),
                unit_size: dec!(750),
                unit_price: dec!(30.00),
            },
            IngredientCosting {
                product_id: campari,
                quantity: dec!(30),
                unit_size: dec!(1000),
                unit_price: dec!(28.00),
            },
            IngredientCosting {
                product_id: vermouth,
                quantity: dec!(30),
                unit_size: dec!(750),
                unit_price: dec!(15.00),
            },
        ];
        (ingredients, [gin, campari, vermouth])
    }

    #[test]
    fn test_negroni_costing() {
        let (ingredients, _) = negroni();
        // 1.20 + 0.84 + 0.60
        let cost = recipe_cost(&ingredients);
        assert_eq!(cost, dec!(2.64));
        assert_eq!(pour_cost_percentage(cost, dec!(12)), Some(dec!(22.00)));
        assert_eq!(pour_cost_percentage(cost, Decimal::ZERO), None);
    }

    /// Serving a round takes bottle fractions out of the bar's stock
    #[test]
    fn test_serving_posts_usage() {
        let (ingredients, [gin, campari, vermouth]) = negroni();
        let main_bar = Uuid::new_v4();
        let mut ledger = StockLedger::new()
            .with_balance(gin, main_bar, dec!(2))
            .with_balance(campari, main_bar, dec!(1))
            .with_balance(vermouth, main_bar, dec!(1));

        let usage = servings_usage(&ingredients, 10);
        assert_eq!(usage, vec![(gin, dec!(0.40)), (campari, dec!(0.30)), (vermouth, dec!(0.40))]);

        let lines: Vec<StockLine> = usage
            .iter()
            .map(|(product, quantity)| StockLine::new(*product, main_bar, *quantity))
            .collect();
        ledger.apply(TransactionType::Usage, &lines).unwrap();

        assert_eq!(ledger.quantity(gin, main_bar), dec!(1.60));
        assert_eq!(ledger.quantity(campari, main_bar), dec!(0.70));

        // Not enough vermouth left for 30 more
        let lines: Vec<StockLine> = servings_usage(&ingredients, 30)
            .iter()
            .map(|(product, quantity)| StockLine::new(*product, main_bar, *quantity))
            .collect();
        assert!(ledger.apply(TransactionType::Usage, &lines).is_err());
        assert_eq!(ledger.quantity(gin, main_bar), dec!(1.60));
    }

    #[test]
    fn test_repeated_ingredient_is_merged() {
        let lime = Uuid::new_v4();
        let half = IngredientCosting {
            product_id: lime,
            quantity: dec!(0.5),
            unit_size: dec!(1),
            unit_price: dec!(0.30),
        };
        let usage = servings_usage(&[half, half], 4);
        assert_eq!(usage, vec![(lime, dec!(4.0))]);
    }
}
