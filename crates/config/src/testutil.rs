//! Test doubles shared by the loader and validator tests

use std::any::Any;
use std::sync::Arc;

use conflux_component::{Exporter, Processor, Receiver, TraceConsumer};
use serde::Deserialize;

use crate::factory::{
    ExporterFactory, Factory, FactoryError, ProcessorFactory, ReceiverConsumers, ReceiverFactory,
    Registries,
};
use crate::model::{
    ExporterConfig, ExporterSettings, ProcessorConfig, ProcessorSettings, ReceiverConfig,
    ReceiverSettings,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TestReceiverConfig {
    #[serde(flatten)]
    pub settings: ReceiverSettings,
    pub extra: String,
}

impl ReceiverConfig for TestReceiverConfig {
    fn settings(&self) -> &ReceiverSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ReceiverSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct TestReceiverFactory {
    tag: &'static str,
}

impl TestReceiverFactory {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Factory for TestReceiverFactory {
    fn type_tag(&self) -> &'static str {
        self.tag
    }
}

impl ReceiverFactory for TestReceiverFactory {
    fn create_default_config(&self) -> Box<dyn ReceiverConfig> {
        Box::new(TestReceiverConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ReceiverConfig>, toml::de::Error> {
        Ok(Box::new(fragment.clone().try_into::<TestReceiverConfig>()?))
    }

    fn create_receiver(
        &self,
        _config: &dyn ReceiverConfig,
        _consumers: ReceiverConsumers,
    ) -> Result<Arc<dyn Receiver>, FactoryError> {
        unreachable!("config tests do not build components")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TestProcessorConfig {
    #[serde(flatten)]
    pub settings: ProcessorSettings,
}

impl ProcessorConfig for TestProcessorConfig {
    fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ProcessorSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct TestProcessorFactory {
    tag: &'static str,
}

impl TestProcessorFactory {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Factory for TestProcessorFactory {
    fn type_tag(&self) -> &'static str {
        self.tag
    }
}

impl ProcessorFactory for TestProcessorFactory {
    fn create_default_config(&self) -> Box<dyn ProcessorConfig> {
        Box::new(TestProcessorConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ProcessorConfig>, toml::de::Error> {
        Ok(Box::new(
            fragment.clone().try_into::<TestProcessorConfig>()?,
        ))
    }

    fn create_processor(
        &self,
        _config: &dyn ProcessorConfig,
        _next: Arc<dyn TraceConsumer>,
    ) -> Result<Arc<dyn Processor>, FactoryError> {
        unreachable!("config tests do not build components")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TestExporterConfig {
    #[serde(flatten)]
    pub settings: ExporterSettings,
}

impl ExporterConfig for TestExporterConfig {
    fn settings(&self) -> &ExporterSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut ExporterSettings {
        &mut self.settings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct TestExporterFactory {
    tag: &'static str,
}

impl TestExporterFactory {
    pub fn new(tag: &'static str) -> Self {
        Self { tag }
    }
}

impl Factory for TestExporterFactory {
    fn type_tag(&self) -> &'static str {
        self.tag
    }
}

impl ExporterFactory for TestExporterFactory {
    fn create_default_config(&self) -> Box<dyn ExporterConfig> {
        Box::new(TestExporterConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ExporterConfig>, toml::de::Error> {
        Ok(Box::new(fragment.clone().try_into::<TestExporterConfig>()?))
    }

    fn create_exporter(
        &self,
        _config: &dyn ExporterConfig,
    ) -> Result<Arc<dyn Exporter>, FactoryError> {
        unreachable!("config tests do not build components")
    }
}

/// Registries mirroring the built-in component set
pub(crate) fn test_registries() -> Registries {
    let mut registries = Registries::default();
    registries
        .receivers
        .register(Arc::new(TestReceiverFactory::new("conflux")));
    registries
        .processors
        .register(Arc::new(TestProcessorFactory::new("batch")));
    registries
        .processors
        .register(Arc::new(TestProcessorFactory::new("noop")));
    registries
        .exporters
        .register(Arc::new(TestExporterFactory::new("logging")));
    registries
        .exporters
        .register(Arc::new(TestExporterFactory::new("noop")));
    registries
}
