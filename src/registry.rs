//! Atomic model factory registry.
//!
//! The registry maps type names to factories building [`AtomicModel`]s,
//! enabling configuration-driven model trees.
//!
//! # Example
//!
//! ```
//! use pdevs::registry::ModelRegistry;
//! use pdevs::models::Counter;
//! use std::collections::HashMap;
//!
//! let mut registry = ModelRegistry::new();
//! registry.register("Counter", |name, _attrs| Ok(Counter::new().into_model(name)?));
//!
//! let model = registry.create("Counter", "sink", &HashMap::new()).unwrap().unwrap();
//! assert_eq!(model.name(), "sink");
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use crate::atomic::AtomicModel;
use crate::config::{ConfigError, ConfigResult};
use crate::models::{Counter, Generator, Processor};

/// Attributes handed to a factory.
pub type Attrs = HashMap<String, String>;

/// Type alias for model factory functions: `(model name, attributes)`.
pub type ModelFactory = Arc<dyn Fn(&str, &Attrs) -> ConfigResult<AtomicModel> + Send + Sync>;

/// A registry of atomic model factories.
#[derive(Default)]
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `type_name`, replacing any previous one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&str, &Attrs) -> ConfigResult<AtomicModel> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.into(), Arc::new(factory));
    }

    /// Builds a model called `name` of type `type_name`.
    ///
    /// Returns `None` if the type is not registered.
    pub fn create(
        &self,
        type_name: &str,
        name: &str,
        attrs: &Attrs,
    ) -> Option<ConfigResult<AtomicModel>> {
        self.factories.get(type_name).map(|f| f(name, attrs))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.factories.keys()
    }

    /// Unregisters a type.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.factories.remove(type_name).is_some()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parses attribute `key`, if present.
pub fn attr<T>(attrs: &Attrs, key: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    attrs
        .get(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e| {
                ConfigError::Validation(format!("invalid value '{}' for '{}': {}", raw, key, e))
            })
        })
        .transpose()
}

/// Parses attribute `key`, falling back to `default` when absent.
pub fn attr_or<T>(attrs: &Attrs, key: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(attr(attrs, key)?.unwrap_or(default))
}

/// Creates a registry with the built-in models.
///
/// Includes:
/// - `Generator` - attrs `period` (default 1.0), `limit` (optional)
/// - `Processor` - attrs `processing_time` (default 1.0)
/// - `Counter`
pub fn default_registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();

    registry.register("Generator", |name, attrs| {
        let mut gen = Generator::new(attr_or(attrs, "period", 1.0)?);
        if let Some(limit) = attr(attrs, "limit")? {
            gen = gen.with_limit(limit);
        }
        Ok(gen.into_model(name)?)
    });

    registry.register("Processor", |name, attrs| {
        let processing_time = attr_or(attrs, "processing_time", 1.0)?;
        Ok(Processor::new(processing_time).into_model(name)?)
    });

    registry.register("Counter", |name, _| Ok(Counter::new().into_model(name)?));

    registry
}
