//! Dependency container.
//!
//! Services are registered in a [`ServiceCollection`] (usually by the
//! [`ConventionalRegistrar`]) and resolved from a [`ServiceProvider`] or a
//! per-request [`ServiceScope`]. Instances are type-erased as
//! `Arc<dyn Any>` and cast back on resolve.

pub mod registrar;

pub use registrar::{Component, ComponentDescriptor, ConventionalRegistrar, Module};

use crate::errors::ServiceError;
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Built on every resolve.
    Transient,
    /// One instance per [`ServiceScope`].
    Scoped,
    /// One instance per [`ServiceProvider`].
    Singleton,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        };
        f.write_str(name)
    }
}

pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds the implementation instance.
pub type Factory = Arc<dyn Fn(&ServiceScope) -> Result<Instance, ServiceError> + Send + Sync>;

/// Turns an implementation instance into an `Arc<Arc<Service>>`.
pub type Projection = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// One (service, implementation) registration.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub service: TypeId,
    pub service_name: &'static str,
    pub implementation: TypeId,
    pub implementation_name: &'static str,
    pub lifetime: Lifetime,
    pub factory: Factory,
    pub project: Projection,
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service", &self.service_name)
            .field("implementation", &self.implementation_name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

type Registry = HashMap<TypeId, Vec<Arc<ServiceDescriptor>>>;

#[derive(Clone, Default)]
pub struct ServiceCollection {
    descriptors: Registry,
    lifetimes: HashMap<TypeId, (Lifetime, &'static str)>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration. Returns `false` when the same (service,
    /// implementation) pair is already present. An implementation registered
    /// under two different lifetimes is rejected.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> Result<bool, ServiceError> {
        match self.lifetimes.get(&descriptor.implementation) {
            Some((existing, _)) if *existing != descriptor.lifetime => {
                return Err(ServiceError::invalid_argument(format!(
                    "{} is registered as {} and cannot also be {}",
                    descriptor.implementation_name, existing, descriptor.lifetime
                )));
            }
            _ => {}
        }

        let registrations = self.descriptors.entry(descriptor.service).or_default();
        if registrations
            .iter()
            .any(|d| d.implementation == descriptor.implementation)
        {
            trace!(
                service = descriptor.service_name,
                implementation = descriptor.implementation_name,
                "registration already present"
            );
            return Ok(false);
        }

        self.lifetimes.insert(
            descriptor.implementation,
            (descriptor.lifetime, descriptor.implementation_name),
        );
        debug!(
            service = descriptor.service_name,
            implementation = descriptor.implementation_name,
            lifetime = %descriptor.lifetime,
            "registered service"
        );
        registrations.push(Arc::new(descriptor));
        Ok(true)
    }

    /// Registers a ready-made singleton, replacing an earlier instance of the
    /// same service.
    pub fn add_instance<T>(&mut self, instance: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let wrapped: Instance = Arc::new(instance);
        let service = TypeId::of::<T>();
        let registrations = self.descriptors.entry(service).or_default();
        registrations.retain(|d| d.implementation != TypeId::of::<Arc<T>>());
        registrations.push(Arc::new(ServiceDescriptor {
            service,
            service_name: type_name::<T>(),
            implementation: TypeId::of::<Arc<T>>(),
            implementation_name: type_name::<T>(),
            lifetime: Lifetime::Singleton,
            factory: Arc::new(move |_: &ServiceScope| -> Result<Instance, ServiceError> {
                Ok(wrapped.clone())
            }),
            project: Arc::new(|instance: &Instance| Some(instance.clone())),
        }));
    }

    /// Number of (service, implementation) pairs.
    pub fn len(&self) -> usize {
        self.descriptors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.descriptors
            .get(&TypeId::of::<T>())
            .map_or(false, |d| !d.is_empty())
    }

    pub fn lifetime_of<I: ?Sized + 'static>(&self) -> Option<Lifetime> {
        self.lifetimes.get(&TypeId::of::<I>()).map(|(l, _)| *l)
    }

    pub fn build_provider(self) -> ServiceProvider {
        ServiceProvider {
            inner: Arc::new(ProviderInner {
                descriptors: self.descriptors,
                singletons: DashMap::new(),
            }),
        }
    }
}

struct ProviderInner {
    descriptors: Registry,
    singletons: DashMap<TypeId, Instance>,
}

/// Root of resolution. Cheap to clone; singletons are shared by all clones.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Opens a scope with its own cache of scoped instances.
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope {
            provider: self.clone(),
            scoped: Some(Arc::new(DashMap::new())),
        }
    }

    fn root(&self) -> ServiceScope {
        ServiceScope {
            provider: self.clone(),
            scoped: None,
        }
    }

    /// Resolves from the root. Scoped services are not available here.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.root().resolve::<T>()
    }

    pub fn resolve_all<T>(&self) -> Result<Vec<Arc<T>>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.root().resolve_all::<T>()
    }

    fn registrations<T: ?Sized + 'static>(&self) -> &[Arc<ServiceDescriptor>] {
        self.inner
            .descriptors
            .get(&TypeId::of::<T>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolution context for one unit of work, typically one HTTP request.
#[derive(Clone)]
pub struct ServiceScope {
    provider: ServiceProvider,
    scoped: Option<Arc<DashMap<TypeId, Instance>>>,
}

impl ServiceScope {
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// Last registration wins.
    pub fn resolve<T>(&self) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let descriptor = self
            .provider
            .registrations::<T>()
            .last()
            .ok_or_else(|| {
                ServiceError::InvalidOperation(format!(
                    "no service registered for {}",
                    type_name::<T>()
                ))
            })?;
        self.materialize::<T>(descriptor)
    }

    /// Every registration in order.
    pub fn resolve_all<T>(&self) -> Result<Vec<Arc<T>>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.provider
            .registrations::<T>()
            .iter()
            .map(|descriptor| self.materialize::<T>(descriptor))
            .collect()
    }

    fn materialize<T>(&self, descriptor: &ServiceDescriptor) -> Result<Arc<T>, ServiceError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.instance(descriptor)?;
        let cast_failed = || {
            ServiceError::InternalError(format!(
                "{} does not provide {}",
                descriptor.implementation_name, descriptor.service_name
            ))
        };
        let projected = (descriptor.project)(&instance).ok_or_else(cast_failed)?;
        let service = projected.downcast::<Arc<T>>().map_err(|_| cast_failed())?;
        Ok((*service).clone())
    }

    fn instance(&self, descriptor: &ServiceDescriptor) -> Result<Instance, ServiceError> {
        match descriptor.lifetime {
            Lifetime::Transient => (descriptor.factory)(self),
            Lifetime::Singleton => {
                let singletons = &self.provider.inner.singletons;
                let cached = singletons
                    .get(&descriptor.implementation)
                    .map(|entry| entry.value().clone());
                if let Some(instance) = cached {
                    return Ok(instance);
                }
                // Singletons only see other singletons.
                let created = (descriptor.factory)(&self.provider.root())?;
                Ok(singletons
                    .entry(descriptor.implementation)
                    .or_insert(created)
                    .value()
                    .clone())
            }
            Lifetime::Scoped => {
                let cache = self.scoped.as_ref().ok_or_else(|| {
                    ServiceError::InvalidOperation(format!(
                        "scoped service {} cannot be resolved from the root provider",
                        descriptor.implementation_name
                    ))
                })?;
                let cached = cache
                    .get(&descriptor.implementation)
                    .map(|entry| entry.value().clone());
                if let Some(instance) = cached {
                    return Ok(instance);
                }
                let created = (descriptor.factory)(self)?;
                Ok(cache
                    .entry(descriptor.implementation)
                    .or_insert(created)
                    .value()
                    .clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn instances_resolve_as_registered() {
        let mut services = ServiceCollection::new();
        services.add_instance::<dyn Greeter>(Arc::new(English));
        services.add_instance(Arc::new(42_u32));

        let provider = services.build_provider();
        assert_eq!(provider.resolve::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(*provider.resolve::<u32>().unwrap(), 42);
    }

    #[test]
    fn add_instance_replaces_the_previous_value() {
        let mut services = ServiceCollection::new();
        services.add_instance(Arc::new(1_u32));
        services.add_instance(Arc::new(2_u32));
        assert_eq!(services.len(), 1);
        assert_eq!(*services.build_provider().resolve::<u32>().unwrap(), 2);
    }

    #[test]
    fn unknown_service_is_an_error() {
        let provider = ServiceCollection::new().build_provider();
        assert_matches!(
            provider.resolve::<String>(),
            Err(ServiceError::InvalidOperation(msg)) if msg.contains("String")
        );
    }
}
