//! Domain models for the CocktailAI inventory platform

mod count;
mod inventory;
mod order;
mod product;
mod recipe;
mod user;

pub use count::*;
pub use inventory::*;
pub use order::*;
pub use product::*;
pub use recipe::*;
pub use user::*;
