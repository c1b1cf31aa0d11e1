//! Shared types and domain logic for the CocktailAI inventory platform
//!
//! This crate contains the pieces shared between the backend server and the
//! browser (via WASM): domain enums, the stock mutation engine, and the
//! derived values (par levels, count variance, order totals, pour cost).
//! Nothing in here performs I/O.

pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
