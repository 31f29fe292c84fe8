use crate::{
    dto::{CreateProductDto, PagedResult, ProductDto, ProductListQuery, UpdateProductDto},
    entities::product::{self, ProductStatus},
    errors::ServiceError,
    repositories::{Repository, SortOrder},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Application service behind the product endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductService: Send + Sync {
    /// Fails with `NotFound` for unknown or deleted products.
    async fn get(&self, id: i32) -> Result<ProductDto, ServiceError>;

    async fn get_all(&self, query: ProductListQuery)
        -> Result<PagedResult<ProductDto>, ServiceError>;

    async fn create(&self, input: CreateProductDto) -> Result<ProductDto, ServiceError>;

    async fn update(&self, input: UpdateProductDto) -> Result<ProductDto, ServiceError>;

    /// `false` when nothing was deleted.
    async fn delete(&self, id: i32) -> Result<bool, ServiceError>;
}

pub struct ProductAppService {
    repository: Arc<dyn Repository<product::Model>>,
}

impl ProductAppService {
    pub fn new(repository: Arc<dyn Repository<product::Model>>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl ProductService for ProductAppService {
    #[instrument(skip(self))]
    async fn get(&self, id: i32) -> Result<ProductDto, ServiceError> {
        Ok(self.repository.get(id).await?.into())
    }

    #[instrument(skip(self))]
    async fn get_all(
        &self,
        query: ProductListQuery,
    ) -> Result<PagedResult<ProductDto>, ServiceError> {
        query.validate()?;

        let total_count = self.repository.long_count().await?;
        let items = self
            .repository
            .get_all()
            .order_by("id", SortOrder::Ascending)
            .skip(query.offset())
            .take(query.page_size)
            .to_list()
            .await?;

        Ok(PagedResult {
            items: items.into_iter().map(ProductDto::from).collect(),
            total_count,
            page: query.page,
            page_size: query.page_size,
        })
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    async fn create(&self, input: CreateProductDto) -> Result<ProductDto, ServiceError> {
        input.validate()?;

        let mut model = product::Model::from(input);
        model.status = ProductStatus::Active;

        let id = self.repository.insert_and_get_id(model).await?;
        info!(product_id = id, "product created");
        self.get(id).await
    }

    #[instrument(skip(self, input), fields(product_id = input.id))]
    async fn update(&self, input: UpdateProductDto) -> Result<ProductDto, ServiceError> {
        input.validate()?;

        let mut existing = self.repository.get(input.id).await?;
        input.apply_to(&mut existing);

        let updated = self.repository.update(existing).await?;
        self.repository.save_changes().await?;
        info!("product updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<bool, ServiceError> {
        self.repository.delete_by_id(id).await?;
        let rows = self.repository.save_changes().await?;
        if rows > 0 {
            info!("product deleted");
        }
        Ok(rows > 0)
    }
}
