//! Recipe costing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a recipe needs to know about one ingredient to cost it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngredientCosting {
    pub product_id: Uuid,
    /// Amount poured, in the product's unit-size measure (e.g. ml)
    pub quantity: Decimal,
    /// Size of one stocked unit in the same measure (e.g. 750 ml bottle)
    pub unit_size: Decimal,
    /// Price of one stocked unit
    pub unit_price: Decimal,
}

impl IngredientCosting {
    /// Fraction of a stocked unit consumed by one serving
    pub fn units_per_serving(&self) -> Decimal {
        if self.unit_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.quantity / self.unit_size
    }

    pub fn cost(&self) -> Decimal {
        self.units_per_serving() * self.unit_price
    }
}

pub fn recipe_cost(ingredients: &[IngredientCosting]) -> Decimal {
    ingredients
        .iter()
        .map(IngredientCosting::cost)
        .sum::<Decimal>()
        .round_dp(2)
}

/// Cost as a share of the sale price, undefined for free drinks
pub fn pour_cost_percentage(cost: Decimal, sale_price: Decimal) -> Option<Decimal> {
    if sale_price <= Decimal::ZERO {
        return None;
    }
    Some((cost / sale_price * Decimal::from(100)).round_dp(2))
}

/// Stock units consumed per product when serving a recipe `servings` times
///
/// Ingredients sharing a product are merged; the result follows first appearance.
pub fn servings_usage(ingredients: &[IngredientCosting], servings: u32) -> Vec<(Uuid, Decimal)> {
    let servings = Decimal::from(servings);
    let mut usage: Vec<(Uuid, Decimal)> = Vec::new();
    for ingredient in ingredients {
        let amount = (ingredient.units_per_serving() * servings).round_dp(2);
        match usage.iter_mut().find(|(id, _)| *id == ingredient.product_id) {
            Some((_, total)) => *total += amount,
            None => usage.push((ingredient.product_id, amount)),
        }
    }
    usage.retain(|(_, amount)| !amount.is_zero());
    usage
}
