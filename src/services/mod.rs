// Product catalog
pub mod product_seeder;
pub mod product_service;

use crate::{
    dependency::{Component, Module},
    domain::{Clock, SystemClock},
    entities::product,
    repositories::{Repository, SeaOrmRepository, UnitOfWork},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use product_seeder::{seed_products, ProductSeeder};
pub use product_service::{ProductAppService, ProductService};

/// Registration manifest for the catalog. Expects a `DatabaseConnection`
/// instance in the collection.
pub fn catalog_module() -> Module {
    Module::new("catalog")
        .component(
            Component::singleton(|_| Ok(SystemClock)).expose::<dyn Clock>(|c| c as Arc<dyn Clock>),
        )
        .component(Component::scoped(|scope| {
            Ok(UnitOfWork::new(scope.resolve::<DatabaseConnection>()?))
        }))
        .component(
            Component::scoped(|scope| {
                Ok(SeaOrmRepository::<product::Model>::new(
                    scope.resolve::<DatabaseConnection>()?,
                    scope.resolve::<UnitOfWork>()?,
                    scope.resolve::<dyn Clock>()?,
                ))
            })
            .expose::<dyn Repository<product::Model>>(|c| c as Arc<dyn Repository<product::Model>>),
        )
        .component(
            Component::scoped(|scope| {
                Ok(ProductAppService::new(
                    scope.resolve::<dyn Repository<product::Model>>()?,
                ))
            })
            .expose::<dyn ProductService>(|c| c as Arc<dyn ProductService>),
        )
        .component(Component::transient(|scope| {
            Ok(ProductSeeder::new(
                scope.resolve::<dyn Repository<product::Model>>()?,
            ))
        }))
}
