//! Convention-based registration.
//!
//! A [`Module`] lists [`Component`]s. Each component names its lifetime and
//! the service traits it exposes; the [`ConventionalRegistrar`] registers it
//! under every exposed service plus its own concrete type.

use super::{Factory, Instance, Lifetime, Projection, ServiceCollection, ServiceDescriptor, ServiceScope};
use crate::errors::ServiceError;
use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct Exposure {
    service: TypeId,
    name: &'static str,
    project: Projection,
}

fn exposure<I, T>(cast: fn(Arc<I>) -> Arc<T>) -> Exposure
where
    I: Send + Sync + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    Exposure {
        service: TypeId::of::<T>(),
        name: type_name::<T>(),
        project: Arc::new(move |instance: &Instance| {
            let concrete = instance.clone().downcast::<I>().ok()?;
            let service: Instance = Arc::new(cast(concrete));
            Some(service)
        }),
    }
}

/// Typed registration builder for implementation `I`.
pub struct Component<I> {
    lifetime: Lifetime,
    factory: Factory,
    exposed: Vec<Exposure>,
    _implementation: PhantomData<fn() -> I>,
}

impl<I> Component<I>
where
    I: Send + Sync + 'static,
{
    fn with_lifetime<F>(lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&ServiceScope) -> Result<I, ServiceError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |scope: &ServiceScope| -> Result<Instance, ServiceError> {
            let instance: Instance = Arc::new(factory(scope)?);
            Ok(instance)
        });
        Self {
            lifetime,
            factory,
            exposed: Vec::new(),
            _implementation: PhantomData,
        }
    }

    pub fn transient<F>(factory: F) -> Self
    where
        F: Fn(&ServiceScope) -> Result<I, ServiceError> + Send + Sync + 'static,
    {
        Self::with_lifetime(Lifetime::Transient, factory)
    }

    pub fn scoped<F>(factory: F) -> Self
    where
        F: Fn(&ServiceScope) -> Result<I, ServiceError> + Send + Sync + 'static,
    {
        Self::with_lifetime(Lifetime::Scoped, factory)
    }

    pub fn singleton<F>(factory: F) -> Self
    where
        F: Fn(&ServiceScope) -> Result<I, ServiceError> + Send + Sync + 'static,
    {
        Self::with_lifetime(Lifetime::Singleton, factory)
    }

    /// Makes the component resolvable as `T`, usually a trait object:
    ///
    /// ```ignore
    /// Component::scoped(|_| Ok(English)).expose::<dyn Greeter>(|c| c as Arc<dyn Greeter>)
    /// ```
    pub fn expose<T>(mut self, cast: fn(Arc<I>) -> Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.exposed.push(exposure::<I, T>(cast));
        self
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

/// Type-erased [`Component`].
#[derive(Clone)]
pub struct ComponentDescriptor {
    implementation: TypeId,
    implementation_name: &'static str,
    lifetime: Lifetime,
    factory: Factory,
    exposed: Vec<Exposure>,
}

impl ComponentDescriptor {
    pub fn implementation_name(&self) -> &'static str {
        self.implementation_name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Exposed services followed by the concrete type.
    pub fn service_names(&self) -> Vec<&'static str> {
        self.exposed.iter().map(|e| e.name).collect()
    }

    fn descriptor(&self, exposure: &Exposure) -> ServiceDescriptor {
        ServiceDescriptor {
            service: exposure.service,
            service_name: exposure.name,
            implementation: self.implementation,
            implementation_name: self.implementation_name,
            lifetime: self.lifetime,
            factory: self.factory.clone(),
            project: exposure.project.clone(),
        }
    }
}

impl<I> From<Component<I>> for ComponentDescriptor
where
    I: Send + Sync + 'static,
{
    fn from(component: Component<I>) -> Self {
        let mut exposed = component.exposed;
        if !exposed.iter().any(|e| e.service == TypeId::of::<I>()) {
            exposed.push(exposure::<I, I>(|c| c));
        }
        Self {
            implementation: TypeId::of::<I>(),
            implementation_name: type_name::<I>(),
            lifetime: component.lifetime,
            factory: component.factory,
            exposed,
        }
    }
}

/// Named registration manifest.
#[derive(Clone)]
pub struct Module {
    name: &'static str,
    components: Vec<ComponentDescriptor>,
}

impl Module {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            components: Vec::new(),
        }
    }

    pub fn component<I>(mut self, component: Component<I>) -> Self
    where
        I: Send + Sync + 'static,
    {
        self.components.push(component.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.components
    }
}

/// Registers every component of the given modules by lifetime convention.
pub struct ConventionalRegistrar;

impl ConventionalRegistrar {
    /// Returns the number of new registrations. Running it twice over the
    /// same modules adds nothing the second time. On error the collection is
    /// left as it was.
    pub fn register_modules(
        services: &mut ServiceCollection,
        modules: &[Module],
    ) -> Result<usize, ServiceError> {
        if modules.is_empty() {
            return Err(ServiceError::invalid_argument(
                "at least one module is required",
            ));
        }

        let mut staged = services.clone();
        let mut added = 0;
        for module in modules {
            let before = added;
            for component in &module.components {
                for exposure in &component.exposed {
                    if staged.add(component.descriptor(exposure))? {
                        added += 1;
                    }
                }
            }
            info!(
                module = module.name,
                components = module.components.len(),
                registrations = added - before,
                "registered module"
            );
        }
        *services = staged;
        Ok(added)
    }
}
