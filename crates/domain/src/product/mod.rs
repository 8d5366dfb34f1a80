//! Product aggregate: a stock counter that can be restocked and reserved.

mod aggregate;
mod events;
mod service;

pub use aggregate::{Product, ProductStatus};
pub use events::ProductEvent;
pub use service::ProductService;

use thiserror::Error;

/// Errors raised when a product event is not a legal transition.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product is sold out")]
    SoldOut,

    #[error("Restock amount must be greater than zero")]
    InvalidAmount,
}
