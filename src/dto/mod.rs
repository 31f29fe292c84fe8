//! Request and response shapes of the HTTP API.

pub mod product;

pub use product::{CreateProductDto, PagedResult, ProductDto, ProductListQuery, UpdateProductDto};
