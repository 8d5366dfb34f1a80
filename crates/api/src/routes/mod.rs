//! HTTP route handlers.

pub mod deploys;
pub mod health;
pub mod metrics;
pub mod products;

use domain::{DeployService, ProductService};

/// Shared application state accessible from all handlers.
pub struct AppState<L> {
    pub deploys: DeployService<L>,
    pub products: ProductService<L>,
}
