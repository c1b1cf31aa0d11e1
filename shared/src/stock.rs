//! Stock mutation engine
//!
//! Turns the line items of an inventory transaction into signed movements on
//! `(product, location)` balances and applies them all-or-nothing. Callers own
//! the balances: the backend loads them from locked rows and writes the
//! result back inside the same database transaction.
//!
//! Stored line quantities are the delta applied at the line's location:
//! purchases are positive, usage and transfers are negative, adjustments carry
//! their own sign. A transfer line additionally credits `-quantity` at its
//! destination.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::TransactionType;
use crate::validation::{MAX_STORED_AMOUNT, STORED_SCALE};

/// A stock balance: one product at one location
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: Uuid,
    pub location_id: Uuid,
}

impl StockKey {
    pub fn new(product_id: Uuid, location_id: Uuid) -> Self {
        Self {
            product_id,
            location_id,
        }
    }
}

/// One line item of a transaction, as far as stock is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: Uuid,
    /// Source location for transfers
    pub location_id: Uuid,
    pub destination_location_id: Option<Uuid>,
    pub quantity: Decimal,
}

impl StockLine {
    pub fn new(product_id: Uuid, location_id: Uuid, quantity: Decimal) -> Self {
        Self {
            product_id,
            location_id,
            destination_location_id: None,
            quantity,
        }
    }

    pub fn transfer(product_id: Uuid, from: Uuid, to: Uuid, quantity: Decimal) -> Self {
        Self {
            product_id,
            location_id: from,
            destination_location_id: Some(to),
            quantity,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.product_id, self.location_id)
    }

    pub fn destination_key(&self) -> Option<StockKey> {
        self.destination_location_id
            .map(|location_id| StockKey::new(self.product_id, location_id))
    }
}

/// A signed change to one balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub key: StockKey,
    pub delta: Decimal,
}

/// Why a single line cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("Quantity cannot be zero")]
    ZeroQuantity,

    #[error("Purchase quantity must be positive")]
    NegativePurchase,

    #[error("Quantity allows at most 2 decimal places")]
    TooPrecise,

    #[error("Quantity must be less than 100000000")]
    TooLarge,

    #[error("Transfer requires a destination location")]
    MissingDestination,

    #[error("Transfer destination must differ from the source location")]
    SameLocation,

    #[error("Only transfers may have a destination location")]
    UnexpectedDestination,
}

impl LineError {
    /// Line field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            LineError::ZeroQuantity
            | LineError::NegativePurchase
            | LineError::TooPrecise
            | LineError::TooLarge => "quantity",
            LineError::MissingDestination
            | LineError::SameLocation
            | LineError::UnexpectedDestination => "destination_location_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Transaction has no line items")]
    Empty,

    #[error("Line {line}: {reason}")]
    InvalidLine {
        line: usize,
        #[source]
        reason: LineError,
    },

    #[error(
        "Insufficient stock for product {product_id} at location {location_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: Uuid,
        location_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Stock of product {product_id} at location {location_id} would exceed the storable maximum")]
    BalanceOverflow { product_id: Uuid, location_id: Uuid },
}

/// Bring a caller-supplied quantity to its stored sign
pub fn normalize_quantity(
    transaction_type: TransactionType,
    quantity: Decimal,
) -> Result<Decimal, LineError> {
    if quantity.is_zero() {
        return Err(LineError::ZeroQuantity);
    }
    if quantity.normalize().scale() > STORED_SCALE {
        return Err(LineError::TooPrecise);
    }
    if quantity.abs() >= MAX_STORED_AMOUNT {
        return Err(LineError::TooLarge);
    }
    match transaction_type {
        TransactionType::Purchase if quantity < Decimal::ZERO => Err(LineError::NegativePurchase),
        TransactionType::Purchase | TransactionType::Adjustment => Ok(quantity),
        TransactionType::Usage | TransactionType::Transfer => Ok(-quantity.abs()),
    }
}

pub fn validate_line(transaction_type: TransactionType, line: &StockLine) -> Result<(), LineError> {
    match (transaction_type, line.destination_location_id) {
        (TransactionType::Transfer, None) => Err(LineError::MissingDestination),
        (TransactionType::Transfer, Some(dest)) if dest == line.location_id => {
            Err(LineError::SameLocation)
        }
        (TransactionType::Transfer, Some(_)) => Ok(()),
        (_, Some(_)) => Err(LineError::UnexpectedDestination),
        (_, None) => Ok(()),
    }
}

/// Validate every line and return them with stored-sign quantities
pub fn prepare_lines(
    transaction_type: TransactionType,
    lines: &[StockLine],
) -> Result<Vec<StockLine>, StockError> {
    if lines.is_empty() {
        return Err(StockError::Empty);
    }
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let invalid = |reason| StockError::InvalidLine { line: idx, reason };
            validate_line(transaction_type, line).map_err(invalid)?;
            let quantity = normalize_quantity(transaction_type, line.quantity).map_err(invalid)?;
            Ok(StockLine { quantity, ..*line })
        })
        .collect()
}

/// Movements for already prepared lines, in line order
pub fn plan_movements(transaction_type: TransactionType, lines: &[StockLine]) -> Vec<StockMovement> {
    let mut movements = Vec::with_capacity(lines.len());
    for line in lines {
        movements.push(StockMovement {
            key: line.key(),
            delta: line.quantity,
        });
        if transaction_type == TransactionType::Transfer {
            if let Some(key) = line.destination_key() {
                movements.push(StockMovement {
                    key,
                    delta: -line.quantity,
                });
            }
        }
    }
    movements
}

/// Every balance the lines touch, sorted; lock rows in this order
pub fn touched_keys(transaction_type: TransactionType, lines: &[StockLine]) -> Vec<StockKey> {
    let mut keys = BTreeSet::new();
    for line in lines {
        keys.insert(line.key());
        if transaction_type == TransactionType::Transfer {
            if let Some(key) = line.destination_key() {
                keys.insert(key);
            }
        }
    }
    keys.into_iter().collect()
}

/// Apply movements in order; on any negative or unstorable balance nothing
/// is changed
///
/// Returns the final quantity of every touched balance.
pub fn apply_movements(
    balances: &mut HashMap<StockKey, Decimal>,
    movements: &[StockMovement],
) -> Result<BTreeMap<StockKey, Decimal>, StockError> {
    let mut working: BTreeMap<StockKey, Decimal> = BTreeMap::new();
    for movement in movements {
        let current = *working
            .entry(movement.key)
            .or_insert_with(|| balances.get(&movement.key).copied().unwrap_or_default());
        let next = current
            .checked_add(movement.delta)
            .filter(|next| *next < MAX_STORED_AMOUNT)
            .ok_or(StockError::BalanceOverflow {
                product_id: movement.key.product_id,
                location_id: movement.key.location_id,
            })?;
        if next < Decimal::ZERO {
            return Err(StockError::InsufficientStock {
                product_id: movement.key.product_id,
                location_id: movement.key.location_id,
                available: current,
                requested: -movement.delta,
            });
        }
        working.insert(movement.key, next);
    }

    for (key, quantity) in &working {
        balances.insert(*key, *quantity);
    }
    Ok(working)
}

/// Outcome of a successfully applied transaction
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransaction {
    /// Lines with stored-sign quantities
    pub lines: Vec<StockLine>,
    pub movements: Vec<StockMovement>,
    /// Final quantity of each touched balance
    pub balances: BTreeMap<StockKey, Decimal>,
}

/// Validate, plan and apply a whole transaction
pub fn apply_transaction(
    balances: &mut HashMap<StockKey, Decimal>,
    transaction_type: TransactionType,
    lines: &[StockLine],
) -> Result<AppliedTransaction, StockError> {
    let lines = prepare_lines(transaction_type, lines)?;
    let movements = plan_movements(transaction_type, &lines);
    let balances = apply_movements(balances, &movements)?;
    Ok(AppliedTransaction {
        lines,
        movements,
        balances,
    })
}

/// Recompute balances from stored completed lines, without any stock checks
pub fn replay<I>(history: I) -> HashMap<StockKey, Decimal>
where
    I: IntoIterator<Item = (TransactionType, StockLine)>,
{
    let mut totals: HashMap<StockKey, Decimal> = HashMap::new();
    for (transaction_type, line) in history {
        for movement in plan_movements(transaction_type, std::slice::from_ref(&line)) {
            *totals.entry(movement.key).or_default() += movement.delta;
        }
    }
    totals
}

/// In-memory balances for previews and tests
#[derive(Debug, Clone, Default)]
pub struct StockLedger {
    balances: HashMap<StockKey, Decimal>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, product_id: Uuid, location_id: Uuid, quantity: Decimal) -> Self {
        self.balances
            .insert(StockKey::new(product_id, location_id), quantity);
        self
    }

    pub fn quantity(&self, product_id: Uuid, location_id: Uuid) -> Decimal {
        self.balances
            .get(&StockKey::new(product_id, location_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn product_total(&self, product_id: Uuid) -> Decimal {
        self.balances
            .iter()
            .filter(|(key, _)| key.product_id == product_id)
            .map(|(_, quantity)| *quantity)
            .sum()
    }

    pub fn apply(
        &mut self,
        transaction_type: TransactionType,
        lines: &[StockLine],
    ) -> Result<AppliedTransaction, StockError> {
        apply_transaction(&mut self.balances, transaction_type, lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_normalize_quantity_signs() {
        use TransactionType::*;
        assert_eq!(normalize_quantity(Purchase, dec!(12)), Ok(dec!(12)));
        assert_eq!(
            normalize_quantity(Purchase, dec!(-12)),
            Err(LineError::NegativePurchase)
        );
        assert_eq!(normalize_quantity(Usage, dec!(1.5)), Ok(dec!(-1.5)));
        assert_eq!(normalize_quantity(Usage, dec!(-1.5)), Ok(dec!(-1.5)));
        assert_eq!(normalize_quantity(Transfer, dec!(6)), Ok(dec!(-6)));
        assert_eq!(normalize_quantity(Adjustment, dec!(-2)), Ok(dec!(-2)));
        assert_eq!(normalize_quantity(Adjustment, dec!(3)), Ok(dec!(3)));
        assert_eq!(
            normalize_quantity(Adjustment, Decimal::ZERO),
            Err(LineError::ZeroQuantity)
        );
    }

    #[test]
    fn test_normalize_quantity_storable_range() {
        use TransactionType::*;
        assert_eq!(normalize_quantity(Purchase, dec!(0.004)), Err(LineError::TooPrecise));
        assert_eq!(normalize_quantity(Usage, dec!(1.255)), Err(LineError::TooPrecise));
        assert_eq!(normalize_quantity(Purchase, dec!(1.500)), Ok(dec!(1.500)));
        assert_eq!(
            normalize_quantity(Purchase, dec!(100000000)),
            Err(LineError::TooLarge)
        );
        assert_eq!(
            normalize_quantity(Adjustment, dec!(-100000000)),
            Err(LineError::TooLarge)
        );
        assert_eq!(
            normalize_quantity(Purchase, dec!(99999999.99)),
            Ok(dec!(99999999.99))
        );
        assert_eq!(LineError::TooPrecise.field(), "quantity");
    }

    #[test]
    fn test_apply_movements_reports_overflow() {
        let (product, bar, _) = ids();
        let key = StockKey::new(product, bar);
        let mut balances = HashMap::from([(key, Decimal::MAX)]);
        let err = apply_movements(&mut balances, &[StockMovement { key, delta: Decimal::MAX }])
            .unwrap_err();
        assert_eq!(
            err,
            StockError::BalanceOverflow {
                product_id: product,
                location_id: bar
            }
        );
        assert_eq!(balances[&key], Decimal::MAX);
    }

    #[test]
    fn test_validate_line_destinations() {
        let (product, a, b) = ids();
        assert_eq!(
            validate_line(TransactionType::Transfer, &StockLine::new(product, a, dec!(1))),
            Err(LineError::MissingDestination)
        );
        assert_eq!(
            validate_line(
                TransactionType::Transfer,
                &StockLine::transfer(product, a, a, dec!(1))
            ),
            Err(LineError::SameLocation)
        );
        assert_eq!(
            validate_line(
                TransactionType::Usage,
                &StockLine::transfer(product, a, b, dec!(1))
            ),
            Err(LineError::UnexpectedDestination)
        );
        assert!(validate_line(
            TransactionType::Transfer,
            &StockLine::transfer(product, a, b, dec!(1))
        )
        .is_ok());
    }

    #[test]
    fn test_transfer_plans_debit_and_credit() {
        let (product, a, b) = ids();
        let lines = prepare_lines(
            TransactionType::Transfer,
            &[StockLine::transfer(product, a, b, dec!(5))],
        )
        .unwrap();
        let movements = plan_movements(TransactionType::Transfer, &lines);
        assert_eq!(
            movements,
            vec![
                StockMovement {
                    key: StockKey::new(product, a),
                    delta: dec!(-5)
                },
                StockMovement {
                    key: StockKey::new(product, b),
                    delta: dec!(5)
                },
            ]
        );
    }

    #[test]
    fn test_usage_beyond_stock_is_rejected() {
        let (product, bar, _) = ids();
        let mut ledger = StockLedger::new().with_balance(product, bar, dec!(2));
        let err = ledger
            .apply(
                TransactionType::Usage,
                &[StockLine::new(product, bar, dec!(3))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                product_id: product,
                location_id: bar,
                available: dec!(2),
                requested: dec!(3),
            }
        );
        assert_eq!(ledger.quantity(product, bar), dec!(2));
    }

    #[test]
    fn test_failing_line_rolls_back_earlier_lines() {
        let (gin, bar, _) = ids();
        let vodka = Uuid::new_v4();
        let mut ledger = StockLedger::new()
            .with_balance(gin, bar, dec!(5))
            .with_balance(vodka, bar, dec!(1));

        let result = ledger.apply(
            TransactionType::Usage,
            &[
                StockLine::new(gin, bar, dec!(2)),
                StockLine::new(vodka, bar, dec!(4)),
            ],
        );
        assert!(matches!(result, Err(StockError::InsufficientStock { .. })));
        assert_eq!(ledger.quantity(gin, bar), dec!(5));
        assert_eq!(ledger.quantity(vodka, bar), dec!(1));
    }

    #[test]
    fn test_negative_adjustment_cannot_go_below_zero() {
        let (product, bar, _) = ids();
        let mut ledger = StockLedger::new().with_balance(product, bar, dec!(1));
        assert!(ledger
            .apply(
                TransactionType::Adjustment,
                &[StockLine::new(product, bar, dec!(-1.01))]
            )
            .is_err());
        ledger
            .apply(
                TransactionType::Adjustment,
                &[StockLine::new(product, bar, dec!(-1))],
            )
            .unwrap();
        assert_eq!(ledger.quantity(product, bar), Decimal::ZERO);
    }

    #[test]
    fn test_invalid_line_reports_index() {
        let (product, bar, _) = ids();
        let err = prepare_lines(
            TransactionType::Purchase,
            &[
                StockLine::new(product, bar, dec!(1)),
                StockLine::new(product, bar, Decimal::ZERO),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            StockError::InvalidLine {
                line: 1,
                reason: LineError::ZeroQuantity
            }
        );
        assert_eq!(
            prepare_lines(TransactionType::Purchase, &[]),
            Err(StockError::Empty)
        );
    }

    fn cents() -> impl Strategy<Value = Decimal> {
        (1i64..10_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn prop_transfer_preserves_product_total(
            start in cents(),
            moved in cents(),
        ) {
            let (product, a, b) = ids();
            let mut ledger = StockLedger::new().with_balance(product, a, start);
            let result = ledger.apply(
                TransactionType::Transfer,
                &[StockLine::transfer(product, a, b, moved)],
            );
            if moved <= start {
                prop_assert!(result.is_ok());
                prop_assert_eq!(ledger.quantity(product, a), start - moved);
                prop_assert_eq!(ledger.quantity(product, b), moved);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(ledger.quantity(product, a), start);
            }
            prop_assert_eq!(ledger.product_total(product), start);
        }

        #[test]
        fn prop_final_quantity_is_sum_of_applied_deltas(
            ops in prop::collection::vec((any::<bool>(), cents()), 1..30)
        ) {
            let (product, bar, _) = ids();
            let mut ledger = StockLedger::new();
            let mut expected = Decimal::ZERO;
            for (is_purchase, quantity) in ops {
                let tt = if is_purchase { TransactionType::Purchase } else { TransactionType::Usage };
                if let Ok(applied) = ledger.apply(tt, &[StockLine::new(product, bar, quantity)]) {
                    expected += applied.lines[0].quantity;
                }
                prop_assert!(ledger.quantity(product, bar) >= Decimal::ZERO);
            }
            prop_assert_eq!(ledger.quantity(product, bar), expected);
        }
    }
}
