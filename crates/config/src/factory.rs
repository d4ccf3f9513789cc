//! Component factories and registries
//!
//! A factory maps a `type` tag to defaulted configuration and to component
//! instances. The loader consults the registries while decoding; the
//! pipeline builder consults them again to instantiate the graph.
//!
//! # Custom decoding
//!
//! The default [`ReceiverFactory::unmarshal`] contract is a plain serde
//! decode into the factory's typed payload, with missing fields taking the
//! values from [`ReceiverFactory::create_default_config`]. Factories whose
//! config needs a non-standard layout override `unmarshal`.

use std::collections::HashMap;
use std::sync::Arc;

use conflux_component::{Exporter, MetricsConsumer, Processor, Receiver, TraceConsumer};
use thiserror::Error;

use crate::model::{ExporterConfig, ProcessorConfig, ReceiverConfig};

/// Errors produced when a factory instantiates a component.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// The config handed to the factory is not the type it produces
    #[error("{type_tag} factory received mismatched config for {name:?}")]
    ConfigMismatch {
        /// The factory's type tag
        type_tag: &'static str,
        /// Full name of the entity
        name: String,
    },

    /// The component could not be constructed
    #[error("{type_tag} {name:?}: {reason}")]
    Create {
        /// The factory's type tag
        type_tag: &'static str,
        /// Full name of the entity
        name: String,
        /// What went wrong
        reason: String,
    },
}

impl FactoryError {
    /// Create a ConfigMismatch error
    pub fn config_mismatch(type_tag: &'static str, name: impl Into<String>) -> Self {
        Self::ConfigMismatch {
            type_tag,
            name: name.into(),
        }
    }

    /// Create a Create error
    pub fn create(type_tag: &'static str, name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Create {
            type_tag,
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Behavior common to all factories: the tag they register under.
pub trait Factory: Send + Sync {
    /// Discriminator matched against the `type` part of config keys
    fn type_tag(&self) -> &'static str;
}

/// Consumers handed to a receiver at build time, one per data type the
/// referencing pipelines carry. At least one is always present.
pub struct ReceiverConsumers {
    /// Fan-out over the heads of the traces pipelines referencing the receiver
    pub traces: Option<Arc<dyn TraceConsumer>>,

    /// Fan-out over the heads of the metrics pipelines referencing the receiver
    pub metrics: Option<Arc<dyn MetricsConsumer>>,
}

/// Builds receivers of one type.
pub trait ReceiverFactory: Factory {
    /// Config pre-populated with conservative defaults
    fn create_default_config(&self) -> Box<dyn ReceiverConfig>;

    /// Decode user settings on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns the decoder error; the loader wraps it with the offending key.
    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ReceiverConfig>, toml::de::Error>;

    /// Instantiate a receiver wired to the given consumers.
    ///
    /// # Errors
    ///
    /// Fails on mismatched config or invalid settings; the loader has
    /// already applied defaults, so failures here are real.
    fn create_receiver(
        &self,
        config: &dyn ReceiverConfig,
        consumers: ReceiverConsumers,
    ) -> Result<Arc<dyn Receiver>, FactoryError>;
}

/// Builds processors of one type.
pub trait ProcessorFactory: Factory {
    /// Config pre-populated with conservative defaults
    fn create_default_config(&self) -> Box<dyn ProcessorConfig>;

    /// Decode user settings on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns the decoder error; the loader wraps it with the offending key.
    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ProcessorConfig>, toml::de::Error>;

    /// Instantiate a processor that forwards to `next`.
    ///
    /// Processors are trace-side only: metrics pipelines carry none by
    /// validation.
    ///
    /// # Errors
    ///
    /// Fails on mismatched config or invalid settings.
    fn create_processor(
        &self,
        config: &dyn ProcessorConfig,
        next: Arc<dyn TraceConsumer>,
    ) -> Result<Arc<dyn Processor>, FactoryError>;
}

/// Builds exporters of one type.
pub trait ExporterFactory: Factory {
    /// Config pre-populated with conservative defaults
    fn create_default_config(&self) -> Box<dyn ExporterConfig>;

    /// Decode user settings on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns the decoder error; the loader wraps it with the offending key.
    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ExporterConfig>, toml::de::Error>;

    /// Instantiate an exporter.
    ///
    /// # Errors
    ///
    /// Fails on mismatched config or invalid settings.
    fn create_exporter(
        &self,
        config: &dyn ExporterConfig,
    ) -> Result<Arc<dyn Exporter>, FactoryError>;
}

/// Factory registry keyed by type tag.
pub struct Registry<F: Factory + ?Sized> {
    factories: HashMap<&'static str, Arc<F>>,
}

impl<F: Factory + ?Sized> Registry<F> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its type tag.
    ///
    /// # Panics
    ///
    /// Panics if a factory with the same tag is already registered;
    /// registration happens once at process start, so a collision is a
    /// programming error.
    pub fn register(&mut self, factory: Arc<F>) {
        let tag = factory.type_tag();
        if self.factories.insert(tag, factory).is_some() {
            panic!("factory {tag:?} already registered");
        }
    }

    /// Look up a factory by type tag
    pub fn get(&self, type_tag: &str) -> Option<&Arc<F>> {
        self.factories.get(type_tag)
    }

    /// Check whether a type tag is registered
    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.factories.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True when no factory is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<F: Factory + ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// All registries the loader and builder consult.
#[derive(Default)]
pub struct Registries {
    /// Receiver factories by type tag
    pub receivers: Registry<dyn ReceiverFactory>,

    /// Processor factories by type tag
    pub processors: Registry<dyn ProcessorFactory>,

    /// Exporter factories by type tag
    pub exporters: Registry<dyn ExporterFactory>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestReceiverFactory;

    #[test]
    fn test_register_and_lookup() {
        let mut registry: Registry<dyn ReceiverFactory> = Registry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(TestReceiverFactory::new("conflux")));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("conflux"));
        assert!(registry.get("conflux").is_some());
        assert!(registry.get("zipkin").is_none());
        assert_eq!(registry.types(), vec!["conflux"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_double_register_panics() {
        let mut registry: Registry<dyn ReceiverFactory> = Registry::new();
        registry.register(Arc::new(TestReceiverFactory::new("conflux")));
        registry.register(Arc::new(TestReceiverFactory::new("conflux")));
    }
}
