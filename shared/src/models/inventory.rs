//! Inventory transaction models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a transaction affects stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "inventory_transaction_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Stock received from a supplier
    Purchase,
    /// Stock moved between two locations
    Transfer,
    /// Stock consumed (poured, sold, spilled)
    Usage,
    /// Manual correction, signed
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Transfer => "transfer",
            TransactionType::Usage => "usage",
            TransactionType::Adjustment => "adjustment",
        }
    }

    /// Usage and transfer always debit the line's location
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionType::Usage | TransactionType::Transfer)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "Purchase"),
            TransactionType::Transfer => write!(f, "Transfer"),
            TransactionType::Usage => write!(f, "Usage"),
            TransactionType::Adjustment => write!(f, "Adjustment"),
        }
    }
}

/// Lifecycle of an inventory transaction
///
/// Only `Completed` transactions have touched stock, and they never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "inventory_transaction_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Cancelled)
        )
    }

    /// Completed and cancelled transactions are frozen
    pub fn is_mutable(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }
}

/// Value of a transaction line: the magnitude moved times the unit price
pub fn line_total_value(quantity: Decimal, unit_price: Decimal) -> Decimal {
    quantity.abs() * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_transitions() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Completed));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Cancelled));
        assert!(!TransactionStatus::Completed.can_transition_to(TransactionStatus::Cancelled));
        assert!(!TransactionStatus::Cancelled.can_transition_to(TransactionStatus::Completed));
        assert!(!TransactionStatus::Completed.is_mutable());
    }

    #[test]
    fn test_line_total_value_uses_magnitude() {
        assert_eq!(line_total_value(dec!(-1.50), dec!(30.00)), dec!(45.00));
        assert_eq!(line_total_value(dec!(6), dec!(2.5)), dec!(15.0));
    }

    #[test]
    fn test_type_serialization() {
        let json = serde_json::to_string(&TransactionType::Adjustment).unwrap();
        assert_eq!(json, "\"adjustment\"");
        let parsed: TransactionType = serde_json::from_str("\"transfer\"").unwrap();
        assert_eq!(parsed, TransactionType::Transfer);
        assert!(parsed.is_debit());
    }
}
