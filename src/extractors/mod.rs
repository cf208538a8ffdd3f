pub mod auth;
pub mod json;

pub use auth::{AdminUser, CurrentUser, MaybeUser};
pub use json::Json;
