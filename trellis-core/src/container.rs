// Dependency injection container

use crate::{Error, Provider};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use trellis_log::{debug, trace};

/// The dependency injection container.
///
/// Mutated only during bootstrap; effectively immutable once the
/// application starts serving requests.
#[derive(Clone)]
pub struct Container {
    providers: Arc<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating DI container");
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a provider instance
    pub fn register<T: Provider>(&self, instance: T) {
        let type_name = std::any::type_name::<T>();

        let mut providers = self.providers.write().unwrap();
        providers.insert(TypeId::of::<T>(), Arc::new(instance));

        debug!("Provider '{}' registered", type_name);
    }

    /// Register a provider using a factory function
    pub fn register_factory<T: Provider, F>(&self, factory: F)
    where
        F: FnOnce() -> T,
    {
        trace!("Creating provider '{}' from factory", std::any::type_name::<T>());
        self.register(factory());
    }

    /// Resolve a provider by type
    pub fn resolve<T: Provider>(&self) -> Result<Arc<T>, Error> {
        let type_name = std::any::type_name::<T>();

        let providers = self.providers.read().unwrap();
        providers
            .get(&TypeId::of::<T>())
            .and_then(|any| any.clone().downcast::<T>().ok())
            .ok_or_else(|| {
                debug!("Provider '{}' not found in container", type_name);
                Error::ProviderNotFound(type_name.to_string())
            })
    }

    /// Check if a provider is registered
    pub fn has<T: Provider>(&self) -> bool {
        let providers = self.providers.read().unwrap();
        providers.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all providers
    pub fn clear(&self) {
        let mut providers = self.providers.write().unwrap();
        let count = providers.len();
        providers.clear();

        debug!("Cleared {} providers from container", count);
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}
