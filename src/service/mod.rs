//! Domain services over the store schema.

pub mod carts;
pub mod collections;
pub mod filters;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod reviews;
pub mod users;
mod validation;

pub use carts::CartService;
pub use collections::CollectionService;
pub use filters::{ProductFilter, ProductOrdering};
pub use orders::OrderService;
pub use products::ProductService;
pub use reviews::ReviewService;
pub use users::UserService;
pub use validation::RequestValidator;
