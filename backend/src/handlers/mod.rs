//! HTTP request handlers

pub mod auth;
pub mod categories;
pub mod counts;
pub mod health;
pub mod inventory_items;
pub mod locations;
pub mod orders;
pub mod products;
pub mod recipes;
pub mod suppliers;
pub mod transactions;
pub mod users;

pub use health::health_check;
