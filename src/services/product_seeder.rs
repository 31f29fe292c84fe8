use crate::{
    dependency::ServiceProvider, entities::product, errors::ServiceError, repositories::Repository,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

/// Number of demo products written into an empty catalog.
pub const SEED_PRODUCT_COUNT: i32 = 30;

/// Fills an empty catalog with demo products.
pub struct ProductSeeder {
    repository: Arc<dyn Repository<product::Model>>,
}

impl ProductSeeder {
    pub fn new(repository: Arc<dyn Repository<product::Model>>) -> Self {
        Self { repository }
    }

    /// `SKU001` .. `SKU030`, stock `10 * i`, price `9.99 + i`.
    pub fn demo_products() -> Vec<product::Model> {
        (1..=SEED_PRODUCT_COUNT)
            .map(|i| {
                product::Model::new(
                    format!("SKU{:03}", i),
                    format!("Product {}", i),
                    10 * i,
                    dec!(9.99) + Decimal::from(i),
                )
            })
            .collect()
    }

    /// Returns the number of rows written.
    pub async fn seed(&self) -> Result<u64, ServiceError> {
        let existing = self.repository.long_count().await?;
        if existing > 0 {
            info!(existing, "catalog already populated, skipping seed");
            return Ok(0);
        }

        for product in Self::demo_products() {
            self.repository.insert(product).await?;
        }
        let rows = self.repository.save_changes().await?;
        info!(rows, "seeded product catalog");
        Ok(rows)
    }
}

/// Runs the seeder inside its own dependency scope.
pub async fn seed_products(provider: &ServiceProvider) -> Result<u64, ServiceError> {
    let scope = provider.create_scope();
    scope.resolve::<ProductSeeder>()?.seed().await
}
