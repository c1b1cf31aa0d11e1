//! Business logic services for the CocktailAI inventory server

pub mod auth;
pub mod categories;
pub mod counts;
pub mod inventory_items;
pub mod locations;
pub mod orders;
pub mod products;
pub mod recipes;
pub mod reporting;
pub mod suppliers;
pub mod transactions;
pub mod users;

use crate::error::{AppError, AppResult};

pub use auth::AuthService;
pub use categories::CategoryService;
pub use counts::CountService;
pub use inventory_items::InventoryItemService;
pub use locations::LocationService;
pub use orders::OrderService;
pub use products::ProductService;
pub use recipes::RecipeService;
pub use suppliers::SupplierService;
pub use transactions::TransactionService;
pub use users::UserService;

/// `ILIKE` pattern for a free-text search, `None` when there is nothing to match
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", term.replace('%', "\\%").replace('_', "\\_")))
}

/// `ORDER BY` clause for an `ordering` query value such as `name` or `-created_at,name`
///
/// Only names listed in `fields` are accepted, each mapped to its SQL expression.
/// `default` always follows the requested terms so pages stay stable.
pub(crate) fn order_by(
    ordering: Option<&str>,
    fields: &[(&str, &str)],
    default: &str,
) -> AppResult<String> {
    let Some(ordering) = ordering.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(format!("ORDER BY {default}"));
    };

    let terms = ordering
        .split(',')
        .map(|term| {
            let term = term.trim();
            let (name, direction) = match term.strip_prefix('-') {
                Some(name) => (name, "DESC"),
                None => (term, "ASC"),
            };
            fields
                .iter()
                .find(|(field, _)| *field == name)
                .map(|(_, column)| format!("{column} {direction}"))
                .ok_or_else(|| {
                    let allowed: Vec<&str> = fields.iter().map(|(field, _)| *field).collect();
                    AppError::validation(
                        "ordering",
                        format!("Cannot order by '{}'; use one of {}", name, allowed.join(", ")),
                    )
                })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(format!("ORDER BY {}, {default}", terms.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("name", "c.name"), ("created_at", "c.created_at")];

    #[test]
    fn test_order_by_defaults() {
        assert_eq!(order_by(None, FIELDS, "c.name").unwrap(), "ORDER BY c.name");
        assert_eq!(order_by(Some("  "), FIELDS, "c.name").unwrap(), "ORDER BY c.name");
    }

    #[test]
    fn test_order_by_directions() {
        assert_eq!(
            order_by(Some("-created_at"), FIELDS, "c.name").unwrap(),
            "ORDER BY c.created_at DESC, c.name"
        );
        assert_eq!(
            order_by(Some("name, -created_at"), FIELDS, "c.id").unwrap(),
            "ORDER BY c.name ASC, c.created_at DESC, c.id"
        );
    }

    #[test]
    fn test_order_by_rejects_unknown_fields() {
        for ordering in ["password_hash", "name; DROP TABLE categories", "--name", "name,"] {
            match order_by(Some(ordering), FIELDS, "c.name") {
                Err(AppError::Validation { field, .. }) => assert_eq!(field, "ordering"),
                other => panic!("{:?} was accepted: {:?}", ordering, other),
            }
        }
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern(Some(" gin ")), Some("%gin%".to_string()));
        assert_eq!(like_pattern(Some("10%")), Some("%10\\%%".to_string()));
        assert_eq!(like_pattern(Some("   ")), None);
        assert_eq!(like_pattern(None), None);
    }
}
