//! Keyed factory registry for pipeline builders.
//!
//! Builders are looked up by their `(context, result)` type pair and shared
//! according to a [`Lifetime`]. The registry is optional: builders can always
//! be created directly with [`PipelineBuilder::new`].

mod config;

pub use config::{Lifetime, RegistryConfig};

use crate::errors::{PipelineError, Result};
use crate::pipeline::PipelineBuilder;
use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;
use tracing::{debug, trace};

type BuilderKey = (TypeId, TypeId);
type AnyBuilder = Arc<dyn Any + Send + Sync>;
type BuilderFactory = Arc<dyn Fn() -> AnyBuilder + Send + Sync>;

struct Registration {
    name: String,
    lifetime: Lifetime,
    factory: BuilderFactory,
}

fn builder_key<C: 'static, R: 'static>() -> BuilderKey {
    (TypeId::of::<C>(), TypeId::of::<R>())
}

fn pair_name<C, R>() -> String {
    format!("({}, {})", type_name::<C>(), type_name::<R>())
}

/// Hands out [`PipelineBuilder`] instances by type pair.
pub struct BuilderRegistry {
    config: RegistryConfig,
    registrations: DashMap<BuilderKey, Registration>,
    singletons: DashMap<BuilderKey, AnyBuilder>,
}

impl BuilderRegistry {
    /// Creates a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            registrations: DashMap::new(),
            singletons: DashMap::new(),
        }
    }

    /// Registers the builder for `(C, R)` under `name`, taking its lifetime
    /// from the configuration. Returns the lifetime that was applied.
    pub fn register<C, R>(&self, name: impl Into<String>) -> Lifetime
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        let name = name.into();
        let lifetime = self.config.lifetime_for(&name);
        self.register_with_lifetime::<C, R>(name, lifetime);
        lifetime
    }

    /// Registers the builder for `(C, R)` with an explicit lifetime.
    ///
    /// Re-registering a pair replaces the previous registration and drops
    /// any singleton created for it.
    pub fn register_with_lifetime<C, R>(&self, name: impl Into<String>, lifetime: Lifetime)
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        let key = builder_key::<C, R>();
        let name = name.into();
        let factory: BuilderFactory =
            Arc::new(|| Arc::new(PipelineBuilder::<C, R>::new()) as AnyBuilder);

        debug!(name = %name, pair = %pair_name::<C, R>(), %lifetime, "Registered pipeline builder");
        self.singletons.remove(&key);
        self.registrations.insert(
            key,
            Registration {
                name,
                lifetime,
                factory,
            },
        );
    }

    /// Returns the lifetime registered for `(C, R)`, if any.
    #[must_use]
    pub fn lifetime_of<C: 'static, R: 'static>(&self) -> Option<Lifetime> {
        self.registrations
            .get(&builder_key::<C, R>())
            .map(|reg| reg.lifetime)
    }

    /// Opens a resolution scope for per-scope builders.
    #[must_use]
    pub fn scope(&self) -> BuilderScope<'_> {
        BuilderScope {
            registry: self,
            instances: DashMap::new(),
        }
    }

    /// Resolves a builder outside of any scope.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `(C, R)` is not registered or is
    /// registered per-scope.
    pub fn builder<C, R>(&self) -> Result<Arc<PipelineBuilder<C, R>>>
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        self.resolve(None)
    }

    fn resolve<C, R>(
        &self,
        scoped: Option<&DashMap<BuilderKey, AnyBuilder>>,
    ) -> Result<Arc<PipelineBuilder<C, R>>>
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        let key = builder_key::<C, R>();
        let (name, lifetime, factory) = {
            let reg = self.registrations.get(&key).ok_or_else(|| {
                PipelineError::config(format!("no builder registered for {}", pair_name::<C, R>()))
            })?;
            (reg.name.clone(), reg.lifetime, Arc::clone(&reg.factory))
        };

        let instance = match lifetime {
            Lifetime::PerCall => factory(),
            Lifetime::Singleton => self
                .singletons
                .entry(key)
                .or_insert_with(|| factory())
                .value()
                .clone(),
            Lifetime::PerScope => {
                let Some(instances) = scoped else {
                    return Err(PipelineError::config(format!(
                        "builder '{name}' is per-scope and must be resolved through a scope"
                    )));
                };
                instances
                    .entry(key)
                    .or_insert_with(|| factory())
                    .value()
                    .clone()
            }
        };

        trace!(name = %name, %lifetime, "Resolved pipeline builder");
        instance.downcast::<PipelineBuilder<C, R>>().map_err(|_| {
            PipelineError::config(format!(
                "registered builder '{name}' does not match {}",
                pair_name::<C, R>()
            ))
        })
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("config", &self.config)
            .field("registrations", &self.registrations.len())
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

/// A resolution scope; per-scope builders are shared within it.
pub struct BuilderScope<'a> {
    registry: &'a BuilderRegistry,
    instances: DashMap<BuilderKey, AnyBuilder>,
}

impl BuilderScope<'_> {
    /// Resolves the builder for `(C, R)` according to its lifetime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `(C, R)` is not registered.
    pub fn builder<C, R>(&self) -> Result<Arc<PipelineBuilder<C, R>>>
    where
        C: Send + 'static,
        R: Send + 'static,
    {
        self.registry.resolve(Some(&self.instances))
    }
}

impl std::fmt::Debug for BuilderScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderScope")
            .field("instances", &self.instances.len())
            .finish()
    }
}
