use crate::entities::product::{self, ProductStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("Price must be greater than zero".into());
        Err(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i32,
    pub sku: String,
    pub name: String,
    pub stock: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub status: ProductStatus,
    pub creation_time: DateTime<Utc>,
    pub last_modification_time: Option<DateTime<Utc>>,
}

impl From<product::Model> for ProductDto {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            stock: model.stock,
            price: model.price,
            status: model.status,
            creation_time: model.creation_time,
            last_modification_time: model.last_modification_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductDto {
    #[validate(length(min = 1, max = 20, message = "SKU must be between 1 and 20 characters"))]
    pub sku: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Product name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,

    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "validate_positive_price")]
    pub price: Decimal,

    #[serde(default)]
    pub status: ProductStatus,
}

impl From<CreateProductDto> for product::Model {
    fn from(dto: CreateProductDto) -> Self {
        let mut model = product::Model::new(dto.sku, dto.name, dto.stock, dto.price);
        model.status = dto.status;
        model
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductDto {
    #[validate(range(min = 1, message = "Id must be positive"))]
    pub id: i32,

    #[validate(length(min = 1, max = 20, message = "SKU must be between 1 and 20 characters"))]
    pub sku: String,

    #[validate(length(
        min = 1,
        max = 100,
        message = "Product name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,

    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "validate_positive_price")]
    pub price: Decimal,

    pub status: ProductStatus,
}

impl UpdateProductDto {
    /// Copies the mutable fields onto a loaded entity.
    pub fn apply_to(self, model: &mut product::Model) {
        model.sku = self.sku;
        model.name = self.name;
        model.stock = self.stock;
        model.price = self.price;
        model.status = self.status;
    }
}

/// Highest page number the list endpoint accepts.
pub const MAX_PAGE: u64 = 10_000_000;

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

/// `?page=&pageSize=` on the list endpoint
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 10000000, message = "Page must be between 1 and 10000000"))]
    pub page: u64,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, message = "Page size must be at least 1"))]
    pub page_size: u64,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ProductListQuery {
    /// Rows to skip, saturating at the largest offset the store accepts.
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .checked_mul(self.page_size)
            .map_or(i64::MAX as u64, |offset| offset.min(i64::MAX as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
}
