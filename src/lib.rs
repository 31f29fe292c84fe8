//! Store API Library
//!
//! Layered product catalog: audited entities, a generic repository with a
//! unit of work, convention-based service registration and a REST surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod dependency;
pub mod domain;
pub mod dto;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{middleware, Router};
use dependency::{ConventionalRegistrar, ServiceCollection, ServiceProvider};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: ServiceProvider,
}

/// Registers the connection and every application module, then freezes the
/// collection into a provider.
pub fn build_services(db: Arc<DatabaseConnection>) -> Result<ServiceProvider, errors::ServiceError> {
    let mut collection = ServiceCollection::new();
    collection.add_instance(db);
    ConventionalRegistrar::register_modules(&mut collection, &[services::catalog_module()])?;
    Ok(collection.build_provider())
}

/// Full HTTP surface without CORS, which depends on deployment settings.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest(
            handlers::products::PRODUCTS_PATH,
            handlers::products::product_routes(),
        )
        .nest("/health", health::health_routes())
        .layer(middleware::from_fn_with_state(
            state.services.clone(),
            middleware_helpers::service_scope::service_scope_middleware,
        ))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ProductService;

    #[test]
    fn build_services_wires_the_catalog() {
        let provider = build_services(Arc::new(DatabaseConnection::Disconnected)).unwrap();
        let scope = provider.create_scope();

        let first = scope.resolve::<dyn ProductService>().unwrap();
        let second = scope.resolve::<dyn ProductService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = provider.create_scope().resolve::<dyn ProductService>().unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }
}
