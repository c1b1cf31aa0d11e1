//! Route definitions for the CocktailAI inventory API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers::{
        auth, categories, counts, inventory_items, locations, orders, products, recipes,
        suppliers, transactions, users,
    },
    middleware::auth_middleware,
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Token routes (public)
        .route("/token", post(auth::obtain_token))
        .route("/token/refresh", post(auth::refresh_token))
        .route("/token/verify", post(auth::verify_token))
        .nest("/users", user_routes(state.clone()))
        .nest("/categories", category_routes(state.clone()))
        .nest("/suppliers", supplier_routes(state.clone()))
        .nest("/locations", location_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/inventory-items", inventory_item_routes(state.clone()))
        .nest("/inventory-transactions", transaction_routes(state.clone()))
        .nest("/inventory-counts", count_routes(state.clone()))
        .nest("/orders", order_routes(state.clone()))
        .nest("/recipes", recipe_routes(state))
}

/// User routes; registration is public, everything else needs a token
fn user_routes(state: AppState) -> Router<AppState> {
    let auth = middleware::from_fn_with_state(state, auth_middleware);
    Router::new()
        .route(
            "/",
            get(users::list_users)
                .route_layer(auth.clone())
                .post(users::register_user),
        )
        .route("/me", get(users::get_me).route_layer(auth.clone()))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user)
                .route_layer(auth.clone()),
        )
        .route(
            "/:id/preferences",
            get(users::get_preferences)
                .put(users::update_preferences)
                .route_layer(auth),
        )
}

/// Category routes (protected)
fn category_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/:id/products", get(categories::list_category_products))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/:id",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route("/:id/products", get(suppliers::list_supplier_products))
        .route("/:id/orders", get(suppliers::list_supplier_orders))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Location routes (protected)
fn location_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route("/:id/inventory", get(locations::list_location_inventory))
        .route("/:id/inventory-counts", get(locations::list_location_counts))
        .route("/:id/transactions", get(locations::list_location_transactions))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route(
            "/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/:id/inventory", get(products::list_product_inventory))
        .route("/:id/transactions", get(products::list_product_transactions))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock balance routes (protected)
fn inventory_item_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(inventory_items::list_inventory_items)
                .post(inventory_items::create_inventory_item),
        )
        .route(
            "/:id",
            get(inventory_items::get_inventory_item)
                .put(inventory_items::update_inventory_item)
                .delete(inventory_items::delete_inventory_item),
        )
        .route(
            "/:id/transactions",
            get(inventory_items::list_inventory_item_transactions),
        )
        .route("/:id/ledger", get(inventory_items::get_inventory_item_ledger))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory transaction routes (protected)
fn transaction_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/:id",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/:id/complete", post(transactions::complete_transaction))
        .route("/:id/cancel", post(transactions::cancel_transaction))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory count routes (protected)
fn count_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(counts::list_counts).post(counts::create_count))
        .route(
            "/:id",
            get(counts::get_count)
                .put(counts::update_count)
                .delete(counts::delete_count),
        )
        .route(
            "/:id/items",
            get(counts::list_count_items).post(counts::add_count_item),
        )
        .route("/:id/items/:item_id", put(counts::record_count))
        .route("/:id/uncounted-items", get(counts::list_uncounted_items))
        .route("/:id/complete", post(counts::complete_count))
        .route("/:id/cancel", post(counts::cancel_count))
        .route("/:id/variance-report", get(counts::variance_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supplier order routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route(
            "/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/:id/items", post(orders::add_order_item))
        .route(
            "/:id/items/:item_id",
            put(orders::update_order_item).delete(orders::remove_order_item),
        )
        .route("/:id/place", post(orders::place_order))
        .route("/:id/receive", post(orders::receive_order))
        .route("/:id/cancel", post(orders::cancel_order))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Recipe routes (protected)
fn recipe_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(recipes::list_recipes).post(recipes::create_recipe))
        .route(
            "/:id",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/:id/serve", post(recipes::serve_recipe))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
