//! OpenAPI document and Swagger UI

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CocktailAI Inventory API",
        version = "1.0.0",
        description = r#"
Bar inventory management: catalog, stock balances, inventory transactions,
physical counts, supplier orders and recipe costing.

Obtain a token pair from `POST /api/v1/token` and send the access token as

```
Authorization: Bearer <access-token>
```

List endpoints take `page` (default 1) and `page_size` (default 20, max 100).
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8000", description = "Local development")),
    tags(
        (name = "Authentication", description = "JWT token endpoints"),
        (name = "Users", description = "Accounts and preferences"),
        (name = "Categories", description = "Product categories"),
        (name = "Suppliers", description = "Suppliers and their catalog"),
        (name = "Locations", description = "Storage and service locations"),
        (name = "Products", description = "Product catalog"),
        (name = "Inventory Items", description = "Stock per product and location"),
        (name = "Transactions", description = "Stock movements"),
        (name = "Inventory Counts", description = "Physical counts and variance"),
        (name = "Orders", description = "Supplier purchase orders"),
        (name = "Recipes", description = "Cocktail recipes and pour cost"),
        (name = "Health", description = "Service health")
    ),
    paths(
        handlers::health::health_check,

        handlers::auth::obtain_token,
        handlers::auth::refresh_token,
        handlers::auth::verify_token,

        handlers::users::register_user,
        handlers::users::list_users,
        handlers::users::get_me,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::get_preferences,
        handlers::users::update_preferences,

        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::categories::list_category_products,

        handlers::suppliers::list_suppliers,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::update_supplier,
        handlers::suppliers::delete_supplier,
        handlers::suppliers::list_supplier_products,
        handlers::suppliers::list_supplier_orders,

        handlers::locations::list_locations,
        handlers::locations::create_location,
        handlers::locations::get_location,
        handlers::locations::update_location,
        handlers::locations::delete_location,
        handlers::locations::list_location_inventory,
        handlers::locations::list_location_counts,
        handlers::locations::list_location_transactions,

        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::products::list_product_inventory,
        handlers::products::list_product_transactions,

        handlers::inventory_items::list_inventory_items,
        handlers::inventory_items::create_inventory_item,
        handlers::inventory_items::get_inventory_item,
        handlers::inventory_items::update_inventory_item,
        handlers::inventory_items::delete_inventory_item,
        handlers::inventory_items::list_inventory_item_transactions,
        handlers::inventory_items::get_inventory_item_ledger,

        handlers::transactions::list_transactions,
        handlers::transactions::create_transaction,
        handlers::transactions::get_transaction,
        handlers::transactions::update_transaction,
        handlers::transactions::delete_transaction,
        handlers::transactions::complete_transaction,
        handlers::transactions::cancel_transaction,

        handlers::counts::list_counts,
        handlers::counts::create_count,
        handlers::counts::get_count,
        handlers::counts::update_count,
        handlers::counts::delete_count,
        handlers::counts::list_count_items,
        handlers::counts::add_count_item,
        handlers::counts::record_count,
        handlers::counts::list_uncounted_items,
        handlers::counts::complete_count,
        handlers::counts::cancel_count,
        handlers::counts::variance_report,

        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::add_order_item,
        handlers::orders::update_order_item,
        handlers::orders::remove_order_item,
        handlers::orders::place_order,
        handlers::orders::receive_order,
        handlers::orders::cancel_order,

        handlers::recipes::list_recipes,
        handlers::recipes::create_recipe,
        handlers::recipes::get_recipe,
        handlers::recipes::update_recipe,
        handlers::recipes::delete_recipe,
        handlers::recipes::serve_recipe,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorDetail)),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("CocktailAI Inventory API"));
        assert!(json.contains("/api/v1/products"));
        assert!(json.contains("/api/v1/inventory-counts/{id}/variance-report"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn test_action_routes_are_documented() {
        let openapi = ApiDoc::openapi();
        assert!(openapi.paths.paths.contains_key("/api/v1/token"));
        assert!(openapi.paths.paths.contains_key("/api/v1/orders/{id}/receive"));
        assert!(openapi.paths.paths.contains_key("/api/v1/recipes/{id}/serve"));
        assert!(openapi.paths.paths.contains_key("/health"));
    }
}
