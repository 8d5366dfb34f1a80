//! Product aggregate implementation.

use serde::{Deserialize, Serialize};

use super::{ProductError, ProductEvent};
use crate::aggregate::{Aggregate, EventMeta};

/// Stock status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    Available,
    SoldOut,
}

/// Derived state of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ProductStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
}

impl Product {
    pub fn status(&self) -> Option<ProductStatus> {
        self.status
    }

    /// Units in stock; zero for a product that was never restocked.
    pub fn quantity(&self) -> u32 {
        self.quantity.unwrap_or(0)
    }
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn apply(&mut self, event: &Self::Event, _meta: &EventMeta) -> Result<(), Self::Error> {
        match event {
            ProductEvent::ProductRestocked { amount: 0 } => Err(ProductError::InvalidAmount),
            ProductEvent::ProductRestocked { amount } => {
                let quantity = self
                    .quantity()
                    .checked_add(*amount)
                    .ok_or(ProductError::InvalidAmount)?;
                self.quantity = Some(quantity);
                self.status = Some(ProductStatus::Available);
                Ok(())
            }
            ProductEvent::ProductReserved => {
                if self.quantity() == 0 || self.status == Some(ProductStatus::SoldOut) {
                    return Err(ProductError::SoldOut);
                }
                let quantity = self.quantity() - 1;
                self.quantity = Some(quantity);
                self.status = Some(if quantity > 0 {
                    ProductStatus::Available
                } else {
                    ProductStatus::SoldOut
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use event_store::Version;
    use serde_json::json;

    fn meta() -> EventMeta {
        EventMeta {
            number: Version::first(),
            created: Utc::now(),
            version: Version::initial(),
        }
    }

    #[test]
    fn reserve_without_stock_is_sold_out() {
        let mut product = Product::default();
        let result = product.apply(&ProductEvent::ProductReserved, &meta());
        assert!(matches!(result, Err(ProductError::SoldOut)));
        assert_eq!(product, Product::default());
    }

    #[test]
    fn reserve_last_unit_marks_sold_out() {
        let mut product = Product::default();
        product
            .apply(&ProductEvent::ProductRestocked { amount: 2 }, &meta())
            .unwrap();
        product.apply(&ProductEvent::ProductReserved, &meta()).unwrap();
        assert_eq!(product.status(), Some(ProductStatus::Available));
        assert_eq!(product.quantity(), 1);

        product.apply(&ProductEvent::ProductReserved, &meta()).unwrap();
        assert_eq!(product.status(), Some(ProductStatus::SoldOut));
        assert_eq!(product.quantity(), 0);

        assert!(product.apply(&ProductEvent::ProductReserved, &meta()).is_err());
    }

    #[test]
    fn restock_zero_is_rejected() {
        let mut product = Product::default();
        let result = product.apply(&ProductEvent::ProductRestocked { amount: 0 }, &meta());
        assert!(matches!(result, Err(ProductError::InvalidAmount)));
    }

    #[test]
    fn restock_makes_sold_out_product_available() {
        let mut product = Product::default();
        product
            .apply(&ProductEvent::ProductRestocked { amount: 1 }, &meta())
            .unwrap();
        product.apply(&ProductEvent::ProductReserved, &meta()).unwrap();
        product
            .apply(&ProductEvent::ProductRestocked { amount: 5 }, &meta())
            .unwrap();

        assert_eq!(
            serde_json::to_value(&product).unwrap(),
            json!({ "status": "available", "quantity": 5 })
        );
    }

    #[test]
    fn sold_out_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(ProductStatus::SoldOut).unwrap(),
            json!("sold-out")
        );
    }
}
