use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::rstest;
use sea_orm::DatabaseConnection;
use store_api::{
    dependency::{Component, ConventionalRegistrar, Lifetime, Module, ServiceCollection},
    domain::{Clock, SystemClock},
    entities::product,
    errors::ServiceError,
    repositories::{Repository, SeaOrmRepository, UnitOfWork},
    services::{catalog_module, ProductAppService, ProductSeeder, ProductService},
};

trait Greeter: Send + Sync {
    fn greet(&self) -> &'static str;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> &'static str {
        "hello"
    }
}

struct French;

impl Greeter for French {
    fn greet(&self) -> &'static str {
        "bonjour"
    }
}

fn greeters() -> Module {
    Module::new("greeters")
        .component(
            Component::singleton(|_| Ok(English)).expose::<dyn Greeter>(|c| c as Arc<dyn Greeter>),
        )
        .component(
            Component::scoped(|_| Ok(French)).expose::<dyn Greeter>(|c| c as Arc<dyn Greeter>),
        )
}

fn catalog_services() -> ServiceCollection {
    let mut services = ServiceCollection::new();
    services.add_instance(Arc::new(DatabaseConnection::Disconnected));
    ConventionalRegistrar::register_modules(&mut services, &[catalog_module()]).unwrap();
    services
}

#[test]
fn registering_twice_adds_nothing() {
    let mut services = ServiceCollection::new();
    let first = ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();
    assert_eq!(first, 4);
    let len = services.len();

    let second = ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();
    assert_eq!(second, 0);
    assert_eq!(services.len(), len);
}

#[test]
fn conflicting_lifetimes_fail_fast() {
    let mut services = ServiceCollection::new();
    ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();

    let rebound = Module::new("rebound").component(Component::transient(|_| Ok(English)));
    assert_matches!(
        ConventionalRegistrar::register_modules(&mut services, &[rebound]),
        Err(ServiceError::InvalidArgument(_))
    );
}

#[test]
fn last_registration_wins_and_all_are_enumerable() {
    let mut services = ServiceCollection::new();
    ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();
    let scope = services.build_provider().create_scope();

    assert_eq!(scope.resolve::<dyn Greeter>().unwrap().greet(), "bonjour");
    let all: Vec<_> = scope
        .resolve_all::<dyn Greeter>()
        .unwrap()
        .iter()
        .map(|g| g.greet())
        .collect();
    assert_eq!(all, ["hello", "bonjour"]);
}

#[test]
fn singletons_are_shared_across_scopes() {
    let mut services = ServiceCollection::new();
    ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();
    let provider = services.build_provider();

    let a = provider.create_scope().resolve::<English>().unwrap();
    let b = provider.create_scope().resolve::<English>().unwrap();
    let root = provider.resolve::<English>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a, &root));
}

#[test]
fn scoped_services_need_a_scope() {
    let mut services = ServiceCollection::new();
    ConventionalRegistrar::register_modules(&mut services, &[greeters()]).unwrap();
    let provider = services.build_provider();

    assert_matches!(
        provider.resolve::<French>().err(),
        Some(ServiceError::InvalidOperation(_))
    );
    assert!(provider.create_scope().resolve::<French>().is_ok());
}

#[test]
fn unknown_services_are_reported() {
    let provider = ServiceCollection::new().build_provider();
    assert_matches!(
        provider.create_scope().resolve::<dyn Greeter>().err(),
        Some(ServiceError::InvalidOperation(_))
    );
}

#[rstest]
#[case::clock(Lifetime::Singleton, catalog_services().lifetime_of::<SystemClock>())]
#[case::unit_of_work(Lifetime::Scoped, catalog_services().lifetime_of::<UnitOfWork>())]
#[case::repository(
    Lifetime::Scoped,
    catalog_services().lifetime_of::<SeaOrmRepository<product::Model>>()
)]
#[case::product_service(Lifetime::Scoped, catalog_services().lifetime_of::<ProductAppService>())]
#[case::seeder(Lifetime::Transient, catalog_services().lifetime_of::<ProductSeeder>())]
fn catalog_lifetimes_follow_convention(
    #[case] expected: Lifetime,
    #[case] actual: Option<Lifetime>,
) {
    assert_eq!(actual, Some(expected));
}

#[test]
fn catalog_exposes_its_interfaces() {
    let services = catalog_services();
    assert!(services.contains::<dyn Clock>());
    assert!(services.contains::<dyn Repository<product::Model>>());
    assert!(services.contains::<dyn ProductService>());
}

#[test]
fn catalog_scope_shares_one_unit_of_work() {
    let provider = catalog_services().build_provider();

    let scope = provider.create_scope();
    let a = scope.resolve::<UnitOfWork>().unwrap();
    let b = scope.resolve::<UnitOfWork>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let other = provider.create_scope().resolve::<UnitOfWork>().unwrap();
    assert!(!Arc::ptr_eq(&a, &other));

    let seeder_a = scope.resolve::<ProductSeeder>().unwrap();
    let seeder_b = scope.resolve::<ProductSeeder>().unwrap();
    assert!(!Arc::ptr_eq(&seeder_a, &seeder_b));
}
