use crate::dependency::{ServiceProvider, ServiceScope};
use crate::errors::{ApiError, ServiceError};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::ops::Deref;
use std::sync::Arc;

/// Opens one dependency scope per request and stores it in the request
/// extensions. Scoped services (unit of work, repositories) live until the
/// response is produced.
pub async fn service_scope_middleware(
    State(provider): State<ServiceProvider>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(provider.create_scope());
    next.run(request).await
}

/// Extractor for the scope opened by [`service_scope_middleware`].
#[derive(Clone)]
pub struct RequestScope(pub ServiceScope);

impl RequestScope {
    pub fn resolve<T>(&self) -> Result<Arc<T>, ApiError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Ok(self.0.resolve::<T>()?)
    }
}

impl Deref for RequestScope {
    type Target = ServiceScope;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ServiceScope>()
            .cloned()
            .map(RequestScope)
            .ok_or_else(|| {
                ServiceError::InternalError("no service scope attached to the request".into())
                    .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Component, ConventionalRegistrar, Module, ServiceCollection};
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Visit(usize);

    static VISITS: AtomicUsize = AtomicUsize::new(0);

    async fn same_instance(scope: RequestScope) -> Result<String, ApiError> {
        let first = scope.resolve::<Visit>()?;
        let second = scope.resolve::<Visit>()?;
        Ok(format!("{}:{}", first.0 == second.0, Arc::ptr_eq(&first, &second)))
    }

    fn router() -> Router {
        let mut services = ServiceCollection::new();
        let module = Module::new("visits").component(Component::scoped(|_| {
            Ok(Visit(VISITS.fetch_add(1, Ordering::SeqCst)))
        }));
        ConventionalRegistrar::register_modules(&mut services, &[module]).unwrap();
        let provider = services.build_provider();

        Router::new()
            .route("/", get(same_instance))
            .layer(middleware::from_fn_with_state(provider, service_scope_middleware))
    }

    #[tokio::test]
    async fn scoped_instance_is_shared_within_a_request() {
        let response = router()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"true:true");
    }

    #[tokio::test]
    async fn missing_scope_is_a_server_error() {
        let app = Router::new().route("/", get(same_instance));
        let response = app
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
