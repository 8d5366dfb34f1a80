use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a product aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProductEvent {
    /// Units were added to the stock.
    ProductRestocked { amount: u32 },

    /// One unit was taken from the stock.
    ProductReserved,
}

impl DomainEvent for ProductEvent {
    const EVENT_TYPES: &'static [&'static str] = &["ProductRestocked", "ProductReserved"];

    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductRestocked { .. } => "ProductRestocked",
            ProductEvent::ProductReserved => "ProductReserved",
        }
    }
}
