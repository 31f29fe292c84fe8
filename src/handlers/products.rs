use super::common::{
    created_response, no_content_response, success_response, validate_input, JsonBody,
};
use crate::{
    dto::{CreateProductDto, ProductListQuery, UpdateProductDto},
    errors::{ApiError, ServiceError},
    middleware_helpers::RequestScope,
    services::ProductService,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub const PRODUCTS_PATH: &str = "/api/products";

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Raw paging parameters; missing values fall back to configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

fn product_service(scope: &RequestScope) -> Result<Arc<dyn ProductService>, ApiError> {
    scope.resolve::<dyn ProductService>()
}

pub async fn list_products(
    State(state): State<AppState>,
    scope: RequestScope,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let requested = params.page_size.unwrap_or(state.config.default_page_size);
    let query = ProductListQuery {
        page: params.page.unwrap_or(1),
        page_size: state.config.clamp_page_size(requested),
    };
    validate_input(&query)?;

    let page = product_service(&scope)?.get_all(query).await?;
    Ok(success_response(page))
}

pub async fn get_product(scope: RequestScope, Path(id): Path<i32>) -> Result<Response, ApiError> {
    let product = product_service(&scope)?.get(id).await?;
    Ok(success_response(product))
}

pub async fn create_product(
    scope: RequestScope,
    JsonBody(input): JsonBody<CreateProductDto>,
) -> Result<Response, ApiError> {
    validate_input(&input)?;

    let product = product_service(&scope)?.create(input).await?;
    let location = format!("{}/{}", PRODUCTS_PATH, product.id);
    Ok(created_response(&location, product))
}

pub async fn update_product(
    scope: RequestScope,
    Path(id): Path<i32>,
    JsonBody(input): JsonBody<UpdateProductDto>,
) -> Result<Response, ApiError> {
    if input.id != id {
        return Err(ApiError::bad_request("ID mismatch"));
    }
    validate_input(&input)?;

    let product = product_service(&scope)?.update(input).await?;
    Ok(success_response(product))
}

pub async fn delete_product(
    scope: RequestScope,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    if product_service(&scope)?.delete(id).await? {
        Ok(no_content_response())
    } else {
        Err(ServiceError::not_found("Product", id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dependency::ServiceCollection,
        dto::{PagedResult, ProductDto},
        entities::product::ProductStatus,
        services::product_service::MockProductService,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal_macros::dec;
    use sea_orm::DatabaseConnection;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn dto(id: i32) -> ProductDto {
        ProductDto {
            id,
            sku: format!("SKU{:03}", id),
            name: format!("Product {}", id),
            stock: 10,
            price: dec!(19.99),
            status: ProductStatus::Active,
            creation_time: Utc::now(),
            last_modification_time: None,
        }
    }

    fn app(mock: MockProductService) -> Router {
        let mut services = ServiceCollection::new();
        services.add_instance::<dyn ProductService>(Arc::new(mock));
        crate::app_router(AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            config: AppConfig::default(),
            services: services.build_provider(),
        })
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Response) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        (response.status(), response)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_returns_the_product() {
        let mut mock = MockProductService::new();
        mock.expect_get().with(eq(3)).returning(|id| Ok(dto(id)));

        let (status, response) = send(app(mock), Method::GET, "/api/products/3", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["sku"], "SKU003");
        assert_eq!(body["price"], json!(19.99));
        assert_eq!(body["status"], "Active");
    }

    #[tokio::test]
    async fn missing_product_is_404() {
        let mut mock = MockProductService::new();
        mock.expect_get()
            .returning(|id| Err(ServiceError::not_found("Product", id)));

        let (status, response) = send(app(mock), Method::GET, "/api/products/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(
            body["message"],
            "Entity of type 'Product' with ID '99' was not found."
        );
    }

    #[tokio::test]
    async fn list_uses_defaults_and_caps_page_size() {
        let mut mock = MockProductService::new();
        mock.expect_get_all()
            .withf(|q| q.page == 2 && q.page_size == 100)
            .returning(|q| {
                Ok(PagedResult {
                    items: vec![dto(1)],
                    total_count: 1,
                    page: q.page,
                    page_size: q.page_size,
                })
            });

        let (status, response) = send(
            app(mock),
            Method::GET,
            "/api/products?page=2&pageSize=5000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["totalCount"], 1);
        assert_eq!(body["pageSize"], 100);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let mock = MockProductService::new();
        let (status, _) = send(app(mock), Method::GET, "/api/products?page=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let mut mock = MockProductService::new();
        mock.expect_create().returning(|input| {
            Ok(ProductDto {
                sku: input.sku,
                ..dto(31)
            })
        });

        let payload = json!({"sku": "NEW-1", "name": "New", "stock": 1, "price": 2.5});
        let (status, response) =
            send(app(mock), Method::POST, "/api/products", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION].to_str().unwrap(),
            "/api/products/31"
        );
        assert_eq!(json_body(response).await["sku"], "NEW-1");
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_the_service() {
        let mock = MockProductService::new();
        let payload = json!({"sku": "", "name": "New", "stock": -1, "price": 0});
        let (status, response) =
            send(app(mock), Method::POST, "/api/products", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Validation failed");
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let mock = MockProductService::new();
        let app = app(mock);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/products")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_with_mismatched_id_is_400() {
        let mock = MockProductService::new();
        let payload = json!({
            "id": 2, "sku": "SKU002", "name": "Two", "stock": 1, "price": 1.0, "status": "Active"
        });
        let (status, response) =
            send(app(mock), Method::PUT, "/api/products/1", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "ID mismatch");
    }

    #[tokio::test]
    async fn delete_maps_outcome_to_status() {
        let mut mock = MockProductService::new();
        mock.expect_delete().with(eq(1)).returning(|_| Ok(true));
        mock.expect_delete().with(eq(2)).returning(|_| Ok(false));
        let app = app(mock);

        let (status, _) = send(app.clone(), Method::DELETE, "/api/products/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(app, Method::DELETE, "/api/products/2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
