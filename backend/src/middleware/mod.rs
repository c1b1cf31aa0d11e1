//! Request middleware and access policies

pub mod auth;
pub mod permissions;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
pub use permissions::Access;
