//! Router construction.

mod common;
mod store;

pub use common::{common_routes, common_routes_with_ready};
pub use store::store_routes;
