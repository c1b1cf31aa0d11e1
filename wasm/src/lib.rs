//! WebAssembly module for the CocktailAI inventory frontend
//!
//! Provides client-side computation for:
//! - Previewing a transaction's effect on stock before submitting it
//! - Count variance and recipe pour cost
//! - Order totals and stock status badges
//! - Form validation matching the API
//!
//! Amounts cross the boundary as decimal strings so no precision is lost to `f64`.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

pub use shared::models::*;
pub use shared::stock::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"CocktailAI wasm module loaded".into());
}

/// One stock balance as exchanged with the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariancePreview {
    pub variance: Decimal,
    pub variance_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCostPreview {
    pub cost: Decimal,
    pub pour_cost_percentage: Option<Decimal>,
}

fn to_js_error(message: String) -> JsValue {
    js_sys::Error::new(&message).into()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn parse_transaction_type(value: &str) -> Result<TransactionType, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("Unknown transaction type: {}", value))
}

/// Balances after applying the lines, touched balances only
pub fn stock_preview(
    balances_json: &str,
    transaction_type: &str,
    lines_json: &str,
) -> Result<Vec<Balance>, String> {
    let balances: Vec<Balance> =
        serde_json::from_str(balances_json).map_err(|e| format!("Invalid balances JSON: {}", e))?;
    let lines: Vec<StockLine> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid lines JSON: {}", e))?;
    let transaction_type = parse_transaction_type(transaction_type)?;

    let mut current: HashMap<StockKey, Decimal> = balances
        .into_iter()
        .map(|b| (StockKey::new(b.product_id, b.location_id), b.quantity))
        .collect();
    let applied = apply_transaction(&mut current, transaction_type, &lines)
        .map_err(|e| e.to_string())?;

    Ok(applied
        .balances
        .into_iter()
        .map(|(key, quantity)| Balance {
            product_id: key.product_id,
            location_id: key.location_id,
            quantity,
        })
        .collect())
}

/// Preview a transaction against the balances shown on screen
///
/// Returns the new balances as JSON, or throws with the reason it would be rejected.
#[wasm_bindgen]
pub fn preview_stock(
    balances_json: &str,
    transaction_type: &str,
    lines_json: &str,
) -> Result<String, JsValue> {
    let preview = stock_preview(balances_json, transaction_type, lines_json).map_err(to_js_error)?;
    serde_json::to_string(&preview).map_err(|e| to_js_error(e.to_string()))
}

pub fn variance_preview(expected: &str, counted: &str) -> Result<VariancePreview, String> {
    let expected = parse_decimal("expected quantity", expected)?;
    let counted = parse_decimal("counted quantity", counted)?;
    Ok(VariancePreview {
        variance: counted - expected,
        variance_percentage: variance_percentage(expected, Some(counted)),
    })
}

#[wasm_bindgen]
pub fn calculate_variance(expected: &str, counted: &str) -> Result<String, JsValue> {
    let preview = variance_preview(expected, counted).map_err(to_js_error)?;
    serde_json::to_string(&preview).map_err(|e| to_js_error(e.to_string()))
}

pub fn recipe_cost_preview(
    ingredients_json: &str,
    sale_price: &str,
) -> Result<RecipeCostPreview, String> {
    let ingredients: Vec<IngredientCosting> = serde_json::from_str(ingredients_json)
        .map_err(|e| format!("Invalid ingredients JSON: {}", e))?;
    let sale_price = parse_decimal("sale price", sale_price)?;
    let cost = recipe_cost(&ingredients);
    Ok(RecipeCostPreview {
        cost,
        pour_cost_percentage: pour_cost_percentage(cost, sale_price),
    })
}

/// Cost and pour cost of a recipe being edited
#[wasm_bindgen]
pub fn calculate_pour_cost(ingredients_json: &str, sale_price: &str) -> Result<String, JsValue> {
    let preview = recipe_cost_preview(ingredients_json, sale_price).map_err(to_js_error)?;
    serde_json::to_string(&preview).map_err(|e| to_js_error(e.to_string()))
}

pub fn order_totals(
    lines_json: &str,
    shipping_cost: &str,
    tax: &str,
    discount: &str,
) -> Result<OrderTotals, String> {
    let lines: Vec<(Decimal, Decimal)> =
        serde_json::from_str(lines_json).map_err(|e| format!("Invalid lines JSON: {}", e))?;
    Ok(OrderTotals::calculate(
        lines,
        parse_decimal("shipping cost", shipping_cost)?,
        parse_decimal("tax", tax)?,
        parse_decimal("discount", discount)?,
    ))
}

/// Totals for `[[quantity, unit_price], ...]` order lines
#[wasm_bindgen]
pub fn calculate_order_totals(
    lines_json: &str,
    shipping_cost: &str,
    tax: &str,
    discount: &str,
) -> Result<String, JsValue> {
    let totals = order_totals(lines_json, shipping_cost, tax, discount).map_err(to_js_error)?;
    serde_json::to_string(&totals).map_err(|e| to_js_error(e.to_string()))
}

/// Badge for a product's total stock: out_of_stock, needs_reorder, below_par or ok
#[wasm_bindgen]
pub fn stock_status(total_quantity: &str, par_level: &str, reorder_point: &str) -> String {
    let parse = |v: &str| Decimal::from_str(v.trim()).unwrap_or_default();
    let levels = StockLevels::new(parse(par_level), parse(reorder_point));
    match levels.status(parse(total_quantity)) {
        StockStatus::OutOfStock => "out_of_stock",
        StockStatus::NeedsReorder => "needs_reorder",
        StockStatus::BelowPar => "below_par",
        StockStatus::Ok => "ok",
    }
    .to_string()
}

#[wasm_bindgen]
pub fn is_valid_email(email: &str) -> bool {
    validate_email(email).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_phone(phone: &str) -> bool {
    validate_phone(phone).is_ok()
}

#[wasm_bindgen]
pub fn is_valid_password(password: &str) -> bool {
    validate_password(password).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stock_preview_transfer() {
        let vodka = Uuid::new_v4();
        let cellar = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let balances = serde_json::to_string(&[Balance {
            product_id: vodka,
            location_id: cellar,
            quantity: dec!(6),
        }])
        .unwrap();
        let lines = serde_json::to_string(&[StockLine::transfer(vodka, cellar, bar, dec!(2))]).unwrap();

        let preview = stock_preview(&balances, "transfer", &lines).unwrap();
        assert_eq!(preview.len(), 2);
        let at = |location| {
            preview
                .iter()
                .find(|b| b.location_id == location)
                .map(|b| b.quantity)
        };
        assert_eq!(at(cellar), Some(dec!(4)));
        assert_eq!(at(bar), Some(dec!(2)));
    }

    #[test]
    fn test_stock_preview_rejects() {
        let lime = Uuid::new_v4();
        let bar = Uuid::new_v4();
        let lines = serde_json::to_string(&[StockLine::new(lime, bar, dec!(3))]).unwrap();

        let err = stock_preview("[]", "usage", &lines).unwrap_err();
        assert!(err.starts_with("Insufficient stock"));
        assert!(stock_preview("[]", "sale", &lines)
            .unwrap_err()
            .contains("Unknown transaction type"));
        assert!(stock_preview("not json", "usage", &lines).is_err());
    }

    #[test]
    fn test_variance_preview() {
        let preview = variance_preview("12", "9").unwrap();
        assert_eq!(preview.variance, dec!(-3));
        assert_eq!(preview.variance_percentage, Some(dec!(-25)));
        assert_eq!(variance_preview("0", "2").unwrap().variance_percentage, None);
        assert!(variance_preview("twelve", "9").is_err());
    }

    #[test]
    fn test_recipe_cost_preview() {
        let ingredients = serde_json::to_string(&[IngredientCosting {
            product_id: Uuid::new_v4(),
            quantity: dec!(45),
            unit_size: dec!(750),
            unit_price: dec!(25),
        }])
        .unwrap();
        let preview = recipe_cost_preview(&ingredients, "10").unwrap();
        assert_eq!(preview.cost, dec!(1.50));
        assert_eq!(preview.pour_cost_percentage, Some(dec!(15)));
    }

    #[test]
    fn test_order_totals() {
        let totals = order_totals(r#"[["2", "10.50"], ["1", "4"]]"#, "5", "2", "1").unwrap();
        assert_eq!(totals.subtotal, dec!(25));
        assert_eq!(totals.total, dec!(31));
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(stock_status("0", "10", "4"), "out_of_stock");
        assert_eq!(stock_status("3", "10", "4"), "needs_reorder");
        assert_eq!(stock_status("7", "10", "4"), "below_par");
        assert_eq!(stock_status("12", "10", "4"), "ok");
    }

    #[test]
    fn test_form_validation() {
        assert!(is_valid_email("manager@thecorner.bar"));
        assert!(!is_valid_email("manager@"));
        assert!(is_valid_phone("555-123-4567"));
        assert!(!is_valid_password("short"));
    }
}
