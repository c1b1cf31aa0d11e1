//! Product catalog models and stock-level calculations

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unit a product is stocked and sold in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "product_unit_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    #[default]
    Bottle,
    Can,
    Keg,
    Case,
    Box,
    Each,
    Weight,
    Volume,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::Bottle => "bottle",
            UnitType::Can => "can",
            UnitType::Keg => "keg",
            UnitType::Case => "case",
            UnitType::Box => "box",
            UnitType::Each => "each",
            UnitType::Weight => "weight",
            UnitType::Volume => "volume",
        }
    }
}

/// Where a product's total stock sits relative to its par and reorder levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "backend", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    NeedsReorder,
    BelowPar,
    Ok,
}

/// Stock thresholds configured on a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub par_level: Decimal,
    pub reorder_point: Decimal,
}

impl StockLevels {
    pub fn new(par_level: Decimal, reorder_point: Decimal) -> Self {
        Self {
            par_level,
            reorder_point,
        }
    }

    pub fn below_par_level(&self, total_quantity: Decimal) -> bool {
        total_quantity < self.par_level
    }

    pub fn needs_reorder(&self, total_quantity: Decimal) -> bool {
        total_quantity <= self.reorder_point
    }

    pub fn status(&self, total_quantity: Decimal) -> StockStatus {
        if total_quantity <= Decimal::ZERO {
            StockStatus::OutOfStock
        } else if self.needs_reorder(total_quantity) {
            StockStatus::NeedsReorder
        } else if self.below_par_level(total_quantity) {
            StockStatus::BelowPar
        } else {
            StockStatus::Ok
        }
    }

    /// Quantity needed to bring stock back up to par
    pub fn shortfall(&self, total_quantity: Decimal) -> Decimal {
        (self.par_level - total_quantity).max(Decimal::ZERO)
    }
}

/// Total on-hand quantity across all locations
pub fn total_quantity<I>(quantities: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    quantities.into_iter().sum()
}

/// Value of stock on hand at the product's unit price
pub fn stock_value(quantity: Decimal, unit_price: Decimal) -> Decimal {
    quantity * unit_price
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stock_status_thresholds() {
        let levels = StockLevels::new(dec!(12), dec!(4));
        assert_eq!(levels.status(dec!(0)), StockStatus::OutOfStock);
        assert_eq!(levels.status(dec!(4)), StockStatus::NeedsReorder);
        assert_eq!(levels.status(dec!(4.5)), StockStatus::BelowPar);
        assert_eq!(levels.status(dec!(12)), StockStatus::Ok);
    }

    #[test]
    fn test_par_and_reorder_boundaries() {
        let levels = StockLevels::new(dec!(10), dec!(3));
        // par is strict, reorder point is inclusive
        assert!(!levels.below_par_level(dec!(10)));
        assert!(levels.below_par_level(dec!(9.99)));
        assert!(levels.needs_reorder(dec!(3)));
        assert!(!levels.needs_reorder(dec!(3.01)));
    }

    #[test]
    fn test_shortfall_never_negative() {
        let levels = StockLevels::new(dec!(10), dec!(3));
        assert_eq!(levels.shortfall(dec!(7.5)), dec!(2.5));
        assert_eq!(levels.shortfall(dec!(15)), Decimal::ZERO);
    }

    #[test]
    fn test_total_quantity_and_value() {
        let total = total_quantity(vec![dec!(18.00), dec!(4.50)]);
        assert_eq!(total, dec!(22.50));
        assert_eq!(stock_value(total, dec!(30.00)), dec!(675.00));
    }
}
