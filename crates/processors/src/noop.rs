//! Noop processor - forwards batches unchanged
//!
//! Exists because traces pipelines must declare at least one processor; a
//! deployment that wants no transformation uses this one.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use conflux_component::{
    Component, ComponentError, ConsumeError, Host, Lifecycle, Processor, TraceConsumer,
};
use conflux_config::{
    Factory, FactoryError, ProcessorConfig, ProcessorFactory, ProcessorSettings,
};
use conflux_telemetry::TraceBatch;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Type tag of the noop processor
const TYPE_TAG: &str = "noop";

/// Configuration for the noop processor. Only the common settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoopProcessorConfig {
    /// Common processor settings
    #[serde(flatten)]
    pub settings: ProcessorSettings,
}

impl ProcessorConfig for NoopProcessorConfig {
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

/// Pass-through processor.
pub struct NoopProcessor {
    name: String,
    next: Arc<dyn TraceConsumer>,
    lifecycle: Lifecycle,
}

impl NoopProcessor {
    /// Create a noop processor forwarding to `next`
    pub fn new(config: &NoopProcessorConfig, next: Arc<dyn TraceConsumer>) -> Self {
        Self {
            name: if config.settings.name.is_empty() {
                TYPE_TAG.to_string()
            } else {
                config.settings.name.clone()
            },
            next,
            lifecycle: Lifecycle::new(),
        }
    }
}

#[async_trait]
impl Component for NoopProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        _host: Arc<dyn Host>,
        _cancel: CancellationToken,
    ) -> Result<(), ComponentError> {
        self.lifecycle.begin_start()?;
        self.lifecycle.start_succeeded();
        Ok(())
    }

    async fn stop(&self) -> Result<(), ComponentError> {
        self.lifecycle.begin_stop()?;
        self.lifecycle.stopped();
        Ok(())
    }
}

#[async_trait]
impl TraceConsumer for NoopProcessor {
    async fn consume_traces(&self, batch: Arc<TraceBatch>) -> Result<(), ConsumeError> {
        self.next.consume_traces(batch).await
    }
}

impl Processor for NoopProcessor {}

/// Factory for the noop processor.
pub struct NoopProcessorFactory;

impl Factory for NoopProcessorFactory {
    fn type_tag(&self) -> &'static str {
        TYPE_TAG
    }
}

impl ProcessorFactory for NoopProcessorFactory {
    fn create_default_config(&self) -> Box<dyn ProcessorConfig> {
        Box::new(NoopProcessorConfig::default())
    }

    fn unmarshal(
        &self,
        fragment: &toml::Value,
    ) -> Result<Box<dyn ProcessorConfig>, toml::de::Error> {
        Ok(Box::new(
            fragment.clone().try_into::<NoopProcessorConfig>()?,
        ))
    }

    fn create_processor(
        &self,
        config: &dyn ProcessorConfig,
        next: Arc<dyn TraceConsumer>,
    ) -> Result<Arc<dyn Processor>, FactoryError> {
        let config = config
            .as_any()
            .downcast_ref::<NoopProcessorConfig>()
            .ok_or_else(|| FactoryError::config_mismatch(TYPE_TAG, config.name()))?;
        Ok(Arc::new(NoopProcessor::new(config, next)))
    }
}

#[cfg(test)]
#[path = "noop_test.rs"]
mod tests;
